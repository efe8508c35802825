//! Route handlers. Each body is parsed as JSON; a malformed body is the only
//! client error, everything else answers 200 with a schema-valid payload.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Serialize;

use crate::entities::chat::{self, ChatRequest, ChatResponse};
use crate::entities::drug::{self, LookupRequest, LookupResponse};
use crate::entities::interaction::{self, InteractionRequest, InteractionResult};
use crate::entities::search::{self, SearchRequest, SearchResponse};
use crate::entities::similar::{self, SimilarRequest, SimilarResponse};
use crate::error::PharmaError;
use crate::state::AppState;

type Body<T> = Result<Json<T>, JsonRejection>;

fn parse<T>(body: Body<T>) -> Result<T, PharmaError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| PharmaError::InvalidArgument(rejection.body_text()))
}

pub(crate) async fn drug_lookup(
    State(state): State<Arc<AppState>>,
    body: Body<LookupRequest>,
) -> Result<Json<LookupResponse>, PharmaError> {
    let request = parse(body)?;
    Ok(Json(
        drug::lookup(&state, request.search_term(), request.language).await,
    ))
}

pub(crate) async fn drug_search(
    State(state): State<Arc<AppState>>,
    body: Body<SearchRequest>,
) -> Result<Json<SearchResponse>, PharmaError> {
    let request = parse(body)?;
    Ok(Json(search::search(&state.labels, &request.query).await))
}

pub(crate) async fn drug_interactions(
    State(state): State<Arc<AppState>>,
    body: Body<InteractionRequest>,
) -> Result<Json<InteractionResult>, PharmaError> {
    let request = parse(body)?;
    Ok(Json(
        interaction::check(&state.labels, &state.ai, &request.drugs, request.language).await,
    ))
}

pub(crate) async fn drug_chat(
    State(state): State<Arc<AppState>>,
    body: Body<ChatRequest>,
) -> Result<Json<ChatResponse>, PharmaError> {
    let request = parse(body)?;
    Ok(Json(chat::chat(&state.ai, &request).await))
}

pub(crate) async fn similar_drugs(
    State(state): State<Arc<AppState>>,
    body: Body<SimilarRequest>,
) -> Result<Json<SimilarResponse>, PharmaError> {
    let request = parse(body)?;
    Ok(Json(
        similar::similar(
            &state.labels,
            &request.drug_name,
            request.category.as_deref(),
            request.limit,
        )
        .await,
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Health {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    ai_guard_tripped: bool,
    providers: Vec<String>,
}

pub(crate) async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime().as_secs(),
        ai_guard_tripped: state.ai.guard_tripped(),
        providers: state
            .ai
            .provider_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}
