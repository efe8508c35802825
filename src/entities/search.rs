use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::entities::localized::{Language, LocalizedText};
use crate::resolve::{self, Suggestion};
use crate::sources::openfda::{LabelQuery, LabelRecord, OpenFdaClient};
use crate::transform;
use crate::utils::text::normalize_name;

pub const SEARCH_LIMIT: usize = 20;

/// Lightweight search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub name: String,
    pub generic_name: String,
    pub category: String,
    pub dosage_form: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub language: Language,
}

/// Provenance when results came from a translated name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationInfo {
    pub original: String,
    pub translated: String,
    pub message: LocalizedText,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub drugs: Vec<Card>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_info: Option<TranslationInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<LocalizedText>,
}

pub(crate) fn dedupe_cards(records: &[LabelRecord]) -> Vec<Card> {
    let mut seen = HashSet::new();
    records
        .iter()
        .map(transform::label::to_card)
        .filter(|card| seen.insert(card.id.clone()))
        .collect()
}

fn translated_message(original: &str, translated: &str) -> LocalizedText {
    LocalizedText::new(
        format!("Showing results for \"{translated}\" (US name for \"{original}\")."),
        format!("عرض نتائج \"{translated}\" (الاسم الأمريكي لـ \"{original}\")."),
        format!("ئەنجامەکانی \"{translated}\" پیشان دەدرێن (ناوی ئەمریکی بۆ \"{original}\")."),
    )
}

fn no_results_message(query: &str) -> LocalizedText {
    LocalizedText::new(
        format!("No FDA label found for \"{query}\"."),
        format!("لم يتم العثور على نشرة FDA لـ \"{query}\"."),
        format!("هیچ نامیلکەیەکی FDA بۆ \"{query}\" نەدۆزرایەوە."),
    )
}

/// Wildcard label search with one retry under the US name and symptom
/// suggestions as the last resort.
pub async fn search(labels: &OpenFdaClient, query: &str) -> SearchResponse {
    let query = query.trim();
    if query.is_empty() {
        return SearchResponse::default();
    }

    let records = labels
        .fetch_labels(&LabelQuery::Prefix(query.to_string()), SEARCH_LIMIT)
        .await;
    if !records.is_empty() {
        return SearchResponse {
            drugs: dedupe_cards(&records),
            ..Default::default()
        };
    }

    if let Some(us_name) = resolve::resolve(query)
        && us_name != normalize_name(query)
    {
        info!(original = query, translated = us_name, "Retrying search under US name");
        let records = labels
            .fetch_labels(&LabelQuery::Prefix(us_name.to_string()), SEARCH_LIMIT)
            .await;
        if !records.is_empty() {
            return SearchResponse {
                drugs: dedupe_cards(&records),
                translation_info: Some(TranslationInfo {
                    original: query.to_string(),
                    translated: us_name.to_string(),
                    message: translated_message(query, us_name),
                }),
                ..Default::default()
            };
        }
    }

    let suggestions = resolve::suggest(query);
    debug!(query, suggestions = suggestions.len(), "Search found no labels");
    SearchResponse {
        drugs: Vec::new(),
        translation_info: None,
        suggestions,
        message: Some(no_results_message(query)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn label(id: &str, brand: &str, generic: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "openfda": {
                "brand_name": [brand],
                "generic_name": [generic],
                "pharm_class_epc": ["Analgesic [EPC]"],
                "route": ["ORAL"]
            }
        })
    }

    fn not_found() -> ResponseTemplate {
        ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": {"code": "NOT_FOUND", "message": "No matches found!"}
        }))
    }

    #[tokio::test]
    async fn direct_hits_map_to_deduped_cards() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [label("a", "Advil", "IBUPROFEN"), label("a", "Advil", "IBUPROFEN"), label("b", "Motrin", "IBUPROFEN")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let labels = OpenFdaClient::new_for_test(server.uri()).unwrap();
        let out = search(&labels, "ibuprofen").await;
        assert_eq!(out.drugs.len(), 2);
        assert_eq!(out.drugs[0].category, "Analgesic");
        assert!(out.translation_info.is_none());
    }

    #[tokio::test]
    async fn regional_name_is_retried_under_us_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .and(query_param(
                "search",
                "openfda.brand_name:panadol* OR openfda.generic_name:panadol*",
            ))
            .respond_with(not_found())
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .and(query_param(
                "search",
                "openfda.brand_name:tylenol* OR openfda.generic_name:tylenol*",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [label("t1", "Tylenol", "ACETAMINOPHEN")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let labels = OpenFdaClient::new_for_test(server.uri()).unwrap();
        let out = search(&labels, "panadol").await;
        assert_eq!(out.drugs.len(), 1);
        let info = out.translation_info.unwrap();
        assert_eq!(info.original, "panadol");
        assert_eq!(info.translated, "tylenol");
    }

    #[tokio::test]
    async fn empty_everywhere_returns_suggestions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .respond_with(not_found())
            .mount(&server)
            .await;

        let labels = OpenFdaClient::new_for_test(server.uri()).unwrap();
        let out = search(&labels, "fever medicine").await;
        assert!(out.drugs.is_empty());
        assert_eq!(out.suggestions.len(), 2);
        assert_eq!(out.suggestions[0].suggestion, "acetaminophen");
        assert!(out.message.is_some());
    }

    #[tokio::test]
    async fn blank_query_skips_network() {
        let labels = OpenFdaClient::new_for_test("http://127.0.0.1:9".into()).unwrap();
        let out = search(&labels, "   ").await;
        assert!(out.drugs.is_empty());
        assert!(out.message.is_none());
    }
}
