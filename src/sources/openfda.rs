use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::LabelSourceConfig;
use crate::error::PharmaError;
use crate::utils::serde::StringOrVec;

const OPENFDA_API: &str = "openfda";
const LABEL_PATH: &str = "drug/label.json";
const MAX_QUERY_LEN: usize = 256;

/// Search expression shapes used against `drug/label.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LabelQuery {
    /// Phrase match on brand OR generic name.
    Exact(String),
    /// Trailing-wildcard match on brand OR generic name.
    Prefix(String),
    /// Established pharmacologic class, e.g. `Nonsteroidal Anti-inflammatory Drug [EPC]`.
    PharmClass(String),
    /// Trailing-wildcard match on generic name only.
    GenericPrefix(String),
}

impl LabelQuery {
    fn value(&self) -> &str {
        match self {
            Self::Exact(v) | Self::Prefix(v) | Self::PharmClass(v) | Self::GenericPrefix(v) => {
                v.trim()
            }
        }
    }

    pub(crate) fn expression(&self) -> String {
        let raw = self.value();
        let escaped = OpenFdaClient::escape_query_value(raw);
        let multi_word = raw.chars().any(char::is_whitespace);
        match self {
            Self::Exact(_) => {
                format!("openfda.brand_name:\"{escaped}\" OR openfda.generic_name:\"{escaped}\"")
            }
            Self::Prefix(_) if multi_word => {
                format!("openfda.brand_name:\"{escaped}\" OR openfda.generic_name:\"{escaped}\"")
            }
            Self::Prefix(_) => {
                format!("openfda.brand_name:{escaped}* OR openfda.generic_name:{escaped}*")
            }
            Self::PharmClass(_) => format!("openfda.pharm_class_epc:\"{escaped}\""),
            Self::GenericPrefix(_) if multi_word => {
                format!("openfda.generic_name:\"{escaped}\"")
            }
            Self::GenericPrefix(_) => format!("openfda.generic_name:{escaped}*"),
        }
    }
}

pub struct OpenFdaClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: String,
    api_key: Option<String>,
}

impl OpenFdaClient {
    pub fn new(config: &LabelSourceConfig) -> Result<Self, PharmaError> {
        Ok(Self {
            client: crate::sources::label_http_client(config)?,
            base: config.base_url.clone(),
            api_key: config.api_key(),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(base: String) -> Result<Self, PharmaError> {
        let config = LabelSourceConfig {
            base_url: base,
            ipv4_only: false,
            ..LabelSourceConfig::default()
        };
        Ok(Self {
            client: crate::sources::label_http_client(&config)?,
            base: config.base_url,
            api_key: None,
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn escape_query_value(value: &str) -> String {
        crate::utils::query::escape_lucene_value(value)
    }

    /// Label search that never fails: every error (timeout, non-2xx,
    /// malformed JSON) is logged and degrades to "no records".
    pub async fn fetch_labels(&self, query: &LabelQuery, limit: usize) -> Vec<LabelRecord> {
        match self.search_labels(query, limit).await {
            Ok(records) => records,
            Err(err) => {
                warn!(query = %query.expression(), "Label search failed: {err}");
                Vec::new()
            }
        }
    }

    pub(crate) async fn search_labels(
        &self,
        query: &LabelQuery,
        limit: usize,
    ) -> Result<Vec<LabelRecord>, PharmaError> {
        let value = query.value();
        if value.is_empty() {
            return Err(PharmaError::InvalidArgument(
                "Drug name is required for a label search.".into(),
            ));
        }
        if value.len() > MAX_QUERY_LEN {
            return Err(PharmaError::InvalidArgument("Drug name is too long.".into()));
        }
        if limit == 0 || limit > 100 {
            return Err(PharmaError::InvalidArgument(
                "limit must be between 1 and 100".into(),
            ));
        }

        let search = query.expression();
        let limit = limit.to_string();
        let mut req = self
            .client
            .get(self.endpoint(LABEL_PATH))
            .query(&[("search", search.as_str()), ("limit", limit.as_str())]);
        if let Some(key) = self.api_key.as_deref() {
            req = req.query(&[("api_key", key)]);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let content_type = resp.headers().get(reqwest::header::CONTENT_TYPE).cloned();
        let bytes = crate::sources::read_limited_body(resp, OPENFDA_API).await?;

        // openFDA answers "no matches" with a 404 error document.
        if status.as_u16() == 404 {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(PharmaError::Api {
                api: OPENFDA_API.to_string(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }
        crate::sources::ensure_json_content_type(OPENFDA_API, content_type.as_ref(), &bytes)?;

        let parsed: OpenFdaResponse<LabelRecord> =
            serde_json::from_slice(&bytes).map_err(|source| PharmaError::ApiJson {
                api: OPENFDA_API.to_string(),
                source,
            })?;
        Ok(parsed.results)
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenFdaResponse<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// One structured product label. Read-only input to summarization and
/// translation; never mutated after fetch.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LabelRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub set_id: Option<String>,

    #[serde(default)]
    pub indications_and_usage: StringOrVec,
    #[serde(default)]
    pub purpose: StringOrVec,
    #[serde(default)]
    pub dosage_and_administration: StringOrVec,
    #[serde(default)]
    pub warnings: StringOrVec,
    #[serde(default)]
    pub warnings_and_cautions: StringOrVec,
    #[serde(default)]
    pub boxed_warning: StringOrVec,
    #[serde(default)]
    pub ask_doctor: StringOrVec,
    #[serde(default)]
    pub stop_use: StringOrVec,
    #[serde(default)]
    pub adverse_reactions: StringOrVec,
    #[serde(default)]
    pub contraindications: StringOrVec,
    #[serde(default)]
    pub do_not_use: StringOrVec,
    #[serde(default)]
    pub drug_interactions: StringOrVec,
    #[serde(default)]
    pub pregnancy: StringOrVec,
    #[serde(default)]
    pub pregnancy_or_breast_feeding: StringOrVec,
    #[serde(default)]
    pub nursing_mothers: StringOrVec,
    #[serde(default)]
    pub pediatric_use: StringOrVec,
    #[serde(default)]
    pub geriatric_use: StringOrVec,
    #[serde(default)]
    pub active_ingredient: StringOrVec,
    #[serde(default)]
    pub inactive_ingredient: StringOrVec,
    #[serde(default)]
    pub how_supplied: StringOrVec,
    #[serde(default)]
    pub storage_and_handling: StringOrVec,
    #[serde(default)]
    pub dosage_forms_and_strengths: StringOrVec,

    #[serde(default)]
    pub openfda: OpenFdaBlock,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OpenFdaBlock {
    #[serde(default)]
    pub brand_name: StringOrVec,
    #[serde(default)]
    pub generic_name: StringOrVec,
    #[serde(default)]
    pub manufacturer_name: StringOrVec,
    #[serde(default)]
    pub product_type: StringOrVec,
    #[serde(default)]
    pub route: StringOrVec,
    #[serde(default)]
    pub dosage_form: StringOrVec,
    #[serde(default)]
    pub pharm_class_epc: StringOrVec,
    #[serde(default)]
    pub pharm_class_pe: StringOrVec,
    #[serde(default)]
    pub pharm_class_moa: StringOrVec,
}
