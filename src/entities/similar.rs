use std::collections::HashSet;
use std::sync::OnceLock;

use futures::future::join_all;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::entities::search::Card;
use crate::resolve;
use crate::sources::openfda::{LabelQuery, LabelRecord, OpenFdaClient};
use crate::transform;
use crate::utils::text::normalize_name;

pub const DEFAULT_LIMIT: usize = 8;
pub const MAX_LIMIT: usize = 50;
pub const MAX_ALTERNATIVES: usize = 4;
const MIN_SIMILAR: usize = 3;

const ALTERNATIVES: &[(&str, &[&str])] = &[
    // pain relievers
    ("acetaminophen", &["ibuprofen", "naproxen", "aspirin", "diclofenac"]),
    ("ibuprofen", &["acetaminophen", "naproxen", "aspirin", "diclofenac"]),
    ("naproxen", &["ibuprofen", "acetaminophen", "aspirin", "diclofenac"]),
    ("aspirin", &["acetaminophen", "ibuprofen", "naproxen", "clopidogrel"]),
    ("diclofenac", &["ibuprofen", "naproxen", "acetaminophen", "celecoxib"]),
    // antibiotics
    ("amoxicillin", &["penicillin", "erythromycin", "clarithromycin", "azithromycin"]),
    ("penicillin", &["amoxicillin", "erythromycin", "clarithromycin", "azithromycin"]),
    ("erythromycin", &["azithromycin", "clarithromycin", "amoxicillin", "penicillin"]),
    ("azithromycin", &["erythromycin", "clarithromycin", "amoxicillin", "doxycycline"]),
    ("clarithromycin", &["azithromycin", "erythromycin", "amoxicillin", "penicillin"]),
    ("doxycycline", &["azithromycin", "erythromycin", "minocycline", "tetracycline"]),
    ("ciprofloxacin", &["levofloxacin", "moxifloxacin", "ofloxacin", "norfloxacin"]),
    ("trimethoprim", &["sulfamethoxazole", "nitrofurantoin", "fosfomycin", "amoxicillin"]),
    // cardiovascular
    ("lisinopril", &["ramipril", "enalapril", "benazepril", "losartan"]),
    ("ramipril", &["lisinopril", "enalapril", "benazepril", "losartan"]),
    ("enalapril", &["lisinopril", "ramipril", "benazepril", "losartan"]),
    ("losartan", &["valsartan", "irbesartan", "candesartan", "lisinopril"]),
    ("valsartan", &["losartan", "irbesartan", "candesartan", "olmesartan"]),
    ("atenolol", &["metoprolol", "propranolol", "bisoprolol", "carvedilol"]),
    ("metoprolol", &["atenolol", "propranolol", "bisoprolol", "carvedilol"]),
    ("amlodipine", &["nifedipine", "diltiazem", "verapamil", "felodipine"]),
    ("simvastatin", &["atorvastatin", "rosuvastatin", "pravastatin", "lovastatin"]),
    ("atorvastatin", &["simvastatin", "rosuvastatin", "pravastatin", "lovastatin"]),
    // diabetes
    ("metformin", &["glipizide", "glyburide", "pioglitazone", "sitagliptin"]),
    ("glipizide", &["glyburide", "glimepiride", "metformin", "sitagliptin"]),
    ("glyburide", &["glipizide", "glimepiride", "metformin", "sitagliptin"]),
    ("glimepiride", &["glipizide", "glyburide", "metformin", "sitagliptin"]),
    // respiratory
    ("albuterol", &["levalbuterol", "pirbuterol", "terbutaline", "salmeterol"]),
    ("fluticasone", &["budesonide", "beclomethasone", "mometasone", "triamcinolone"]),
    ("beclomethasone", &["fluticasone", "budesonide", "mometasone", "triamcinolone"]),
    ("budesonide", &["fluticasone", "beclomethasone", "mometasone", "triamcinolone"]),
    // gastrointestinal
    ("omeprazole", &["esomeprazole", "lansoprazole", "pantoprazole", "rabeprazole"]),
    ("lansoprazole", &["omeprazole", "esomeprazole", "pantoprazole", "rabeprazole"]),
    ("esomeprazole", &["omeprazole", "lansoprazole", "pantoprazole", "rabeprazole"]),
    // mental health
    ("sertraline", &["fluoxetine", "paroxetine", "escitalopram", "citalopram"]),
    ("fluoxetine", &["sertraline", "paroxetine", "escitalopram", "citalopram"]),
    ("paroxetine", &["sertraline", "fluoxetine", "escitalopram", "citalopram"]),
    ("escitalopram", &["sertraline", "fluoxetine", "paroxetine", "citalopram"]),
    ("citalopram", &["sertraline", "fluoxetine", "paroxetine", "escitalopram"]),
    ("diazepam", &["lorazepam", "alprazolam", "clonazepam", "temazepam"]),
    ("lorazepam", &["diazepam", "alprazolam", "clonazepam", "temazepam"]),
    ("alprazolam", &["diazepam", "lorazepam", "clonazepam", "temazepam"]),
    ("amitriptyline", &["nortriptyline", "imipramine", "desipramine", "venlafaxine"]),
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarRequest {
    #[serde(default)]
    pub drug_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SimilarResponse {
    pub similar: Vec<Card>,
    pub alternatives: Vec<Card>,
}

fn dosage_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\d+(\.\d+)?\s*mg\b").expect("valid regex"))
}

/// Generic-name prefixes to try: first word, then the name without strengths.
fn name_patterns(name: &str) -> Vec<String> {
    let mut patterns: Vec<String> = Vec::new();
    let candidates = [
        name.split_whitespace().next().unwrap_or_default().to_string(),
        normalize_name(&dosage_re().replace_all(name, " ")),
    ];
    for candidate in candidates {
        if !candidate.is_empty() && !patterns.contains(&candidate) {
            patterns.push(candidate);
        }
    }
    patterns
}

fn alternatives_for(name: &str) -> &'static [&'static str] {
    let lookup = |key: &str| {
        ALTERNATIVES
            .iter()
            .find(|(drug, _)| *drug == key)
            .map(|(_, alts)| *alts)
    };
    lookup(name)
        .or_else(|| resolve::resolve(name).and_then(lookup))
        .unwrap_or(&[])
}

fn is_same_drug(record: &LabelRecord, name: &str) -> bool {
    transform::label::known_names(record)
        .iter()
        .any(|known| known == name)
}

/// Same-class drugs plus a static list of therapeutic alternatives. Every
/// upstream failure degrades to fewer cards.
pub async fn similar(
    labels: &OpenFdaClient,
    drug_name: &str,
    category: Option<&str>,
    limit: Option<usize>,
) -> SimilarResponse {
    let name = normalize_name(drug_name);
    if name.is_empty() {
        return SimilarResponse::default();
    }
    let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let mut seen = HashSet::new();
    let mut similar: Vec<Card> = Vec::new();

    if let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) {
        let records = labels
            .fetch_labels(&LabelQuery::PharmClass(category.to_string()), limit)
            .await;
        similar.extend(
            records
                .iter()
                .filter(|r| !is_same_drug(r, &name))
                .map(transform::label::to_card)
                .filter(|card| seen.insert(card.id.clone()))
                .take(limit),
        );
    }

    if similar.len() < MIN_SIMILAR {
        for pattern in name_patterns(&name) {
            if similar.len() >= limit {
                break;
            }
            let records = labels
                .fetch_labels(&LabelQuery::GenericPrefix(pattern), limit - similar.len())
                .await;
            similar.extend(
                records
                    .iter()
                    .filter(|r| !is_same_drug(r, &name))
                    .map(transform::label::to_card)
                    .filter(|card| seen.insert(card.id.clone())),
            );
        }
    }
    similar.truncate(limit);

    let lookups = alternatives_for(&name)
        .iter()
        .take(MAX_ALTERNATIVES)
        .map(|alt| async move {
            labels
                .fetch_labels(&LabelQuery::Exact((*alt).to_string()), 1)
                .await
        });
    let alternatives = join_all(lookups)
        .await
        .into_iter()
        .filter_map(|records| records.first().map(transform::label::to_card))
        .collect();

    SimilarResponse {
        similar,
        alternatives,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn label(id: &str, generic: &str) -> serde_json::Value {
        serde_json::json!({"id": id, "openfda": {"generic_name": [generic]}})
    }

    #[test]
    fn patterns_strip_strengths() {
        assert_eq!(name_patterns("ibuprofen 200mg"), vec!["ibuprofen".to_string()]);
        assert_eq!(
            name_patterns("amoxicillin clavulanate 500 mg"),
            vec!["amoxicillin".to_string(), "amoxicillin clavulanate".to_string()]
        );
    }

    #[test]
    fn alternatives_follow_regional_names() {
        assert_eq!(alternatives_for("ibuprofen").len(), 4);
        assert_eq!(alternatives_for("paracetamol")[0], "ibuprofen");
        assert!(alternatives_for("unknown").is_empty());
    }

    #[tokio::test]
    async fn category_results_exclude_the_drug_itself() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .and(query_param("search", "openfda.pharm_class_epc:\"Anticoagulant\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [label("w", "warfarin"), label("a", "apixaban"), label("r", "rivaroxaban"), label("d", "dabigatran")]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let labels = OpenFdaClient::new_for_test(server.uri()).unwrap();
        let out = similar(&labels, "Warfarin", Some("Anticoagulant"), Some(8)).await;
        let names: Vec<_> = out.similar.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["apixaban", "rivaroxaban", "dabigatran"]);
        assert!(out.alternatives.is_empty());
    }

    #[tokio::test]
    async fn alternatives_are_looked_up_individually() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [label("x", "naproxen")]
            })))
            .expect(4)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let labels = OpenFdaClient::new_for_test(server.uri()).unwrap();
        let out = similar(&labels, "ibuprofen", None, None).await;
        assert!(out.similar.is_empty());
        assert_eq!(out.alternatives.len(), 4);
    }

    #[tokio::test]
    async fn blank_name_returns_empty_lists() {
        let labels = OpenFdaClient::new_for_test("http://127.0.0.1:9".into()).unwrap();
        let out = similar(&labels, " ", Some("x"), None).await;
        assert!(out.similar.is_empty());
        assert!(out.alternatives.is_empty());
    }
}
