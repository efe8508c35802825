//! Shape-directed normalization of untrusted JSON (AI output, assembled
//! payloads).
//!
//! `sanitize` is pure and total: any input produces a value of the requested
//! shape, and feeding its output back in returns it unchanged. Unknown keys
//! are dropped, missing ones are filled with type-correct defaults, scalars
//! are broadcast where a localized object is expected, and known field-name
//! drift (e.g. `scientificName` for `genericName`) is reconciled through
//! aliases.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::entities::interaction::Severity;
use crate::entities::localized::Language;

#[derive(Debug, Clone, Copy)]
pub enum Shape {
    Text,
    TextList,
    LocalizedText,
    LocalizedList,
    Severity,
    Object(&'static [Field]),
    ArrayOf(&'static Shape),
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub shape: Shape,
}

impl Field {
    pub const fn new(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            aliases: &[],
            shape,
        }
    }

    pub const fn aliased(name: &'static str, aliases: &'static [&'static str], shape: Shape) -> Self {
        Self {
            name,
            aliases,
            shape,
        }
    }
}

pub const AI_SUMMARY: Shape = Shape::Object(&[
    Field::new("uses", Shape::LocalizedList),
    Field::aliased("sideEffects", &["side_effects"], Shape::LocalizedList),
    Field::new("warnings", Shape::LocalizedList),
    Field::new("dosage", Shape::LocalizedList),
    Field::new("contraindications", Shape::LocalizedList),
    Field::new("interactions", Shape::LocalizedList),
    Field::new("pregnancy", Shape::LocalizedList),
]);

pub const RAW_DETAILS: Shape = Shape::Object(&[
    Field::new("indications", Shape::Text),
    Field::new("dosage", Shape::Text),
    Field::new("warnings", Shape::Text),
    Field::new("boxedWarning", Shape::Text),
    Field::new("adverseReactions", Shape::Text),
    Field::new("contraindications", Shape::Text),
    Field::new("interactions", Shape::Text),
    Field::new("pregnancy", Shape::Text),
    Field::new("pediatric", Shape::Text),
    Field::new("geriatric", Shape::Text),
    Field::new(
        "ingredients",
        Shape::Object(&[
            Field::new("active", Shape::Text),
            Field::new("inactive", Shape::Text),
        ]),
    ),
    Field::new("route", Shape::Text),
    Field::new("supply", Shape::Text),
]);

pub const DRUG_SUMMARY: Shape = Shape::Object(&[
    Field::new("id", Shape::Text),
    Field::new("name", Shape::Text),
    Field::aliased(
        "genericName",
        &["scientificName", "generic_name"],
        Shape::Text,
    ),
    Field::new("brandName", Shape::Text),
    Field::new("category", Shape::Text),
    Field::aliased("manufacturer", &["manufacturerName"], Shape::Text),
    Field::new("route", Shape::Text),
    Field::new("aiSummary", AI_SUMMARY),
    Field::new("rawDetails", RAW_DETAILS),
]);

pub const INTERACTION: Shape = Shape::Object(&[
    Field::aliased("severity", &["level", "risk"], Shape::Severity),
    Field::aliased("title", &["name"], Shape::LocalizedText),
    Field::aliased(
        "description",
        &["details", "explanation"],
        Shape::LocalizedText,
    ),
    Field::aliased(
        "recommendations",
        &["recommendation", "advice"],
        Shape::LocalizedList,
    ),
]);

pub const INTERACTION_RESULT: Shape = Shape::Object(&[
    Field::new("interactions", Shape::ArrayOf(&INTERACTION)),
    Field::aliased(
        "overallRisk",
        &["overall_risk", "overallSeverity"],
        Shape::Severity,
    ),
    Field::new("summary", Shape::LocalizedText),
    Field::new("disclaimer", Shape::LocalizedText),
]);

pub fn sanitize(raw: &Value, shape: &Shape) -> Value {
    match shape {
        Shape::Text => Value::String(coerce_text(raw)),
        Shape::TextList => Value::Array(coerce_list(raw).into_iter().map(Value::String).collect()),
        Shape::LocalizedText => localized(raw, |v| Value::String(coerce_text(v)), |lang| {
            Value::String(lang.placeholder().to_string())
        }, || Value::String(String::new())),
        Shape::LocalizedList => localized(
            raw,
            |v| Value::Array(coerce_list(v).into_iter().map(Value::String).collect()),
            |lang| Value::Array(vec![Value::String(lang.placeholder().to_string())]),
            || Value::Array(Vec::new()),
        ),
        Shape::Severity => {
            Value::String(Severity::normalize(&coerce_text(raw)).as_str().to_string())
        }
        Shape::Object(fields) => {
            let empty = Map::new();
            let input = raw.as_object().unwrap_or(&empty);
            let mut out = Map::new();
            for field in fields.iter() {
                let value = lookup_field(input, field).unwrap_or(&Value::Null);
                out.insert(field.name.to_string(), sanitize(value, &field.shape));
            }
            Value::Object(out)
        }
        Shape::ArrayOf(inner) => match raw {
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| sanitize(item, inner)).collect())
            }
            Value::Object(_) => Value::Array(vec![sanitize(raw, inner)]),
            _ => Value::Array(Vec::new()),
        },
    }
}

/// Sanitizes then deserializes into the typed payload.
pub fn sanitize_into<T: DeserializeOwned>(raw: &Value, shape: &Shape) -> Option<T> {
    serde_json::from_value(sanitize(raw, shape)).ok()
}

/// Passes an assembled payload through the sanitizer. The typed value is
/// returned unchanged if it cannot round-trip.
pub fn conform<T: Serialize + DeserializeOwned>(value: T, shape: &Shape) -> T {
    match serde_json::to_value(&value) {
        Ok(raw) => sanitize_into(&raw, shape).unwrap_or(value),
        Err(_) => value,
    }
}

fn lookup_field<'a>(input: &'a Map<String, Value>, field: &Field) -> Option<&'a Value> {
    std::iter::once(field.name)
        .chain(field.aliases.iter().copied())
        .filter_map(|key| input.get(key))
        .find(|v| !v.is_null())
}

fn language_keys(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::En => &["en", "english", "EN"],
        Language::Ar => &["ar", "arabic", "AR"],
        Language::Ku => &["ku", "ckb", "kurdish", "sorani", "KU"],
    }
}

fn localized(
    raw: &Value,
    present: impl Fn(&Value) -> Value,
    missing: impl Fn(Language) -> Value,
    empty: impl Fn() -> Value,
) -> Value {
    let mut out = Map::new();
    match raw {
        Value::Object(map) => {
            for lang in Language::ALL {
                let value = language_keys(lang)
                    .iter()
                    .filter_map(|key| map.get(*key))
                    .find(|v| !v.is_null());
                let value = match value {
                    Some(v) => present(v),
                    None => missing(lang),
                };
                out.insert(lang.code().to_string(), value);
            }
        }
        Value::Null => {
            for lang in Language::ALL {
                out.insert(lang.code().to_string(), empty());
            }
        }
        scalar => {
            let value = present(scalar);
            for lang in Language::ALL {
                out.insert(lang.code().to_string(), value.clone());
            }
        }
    }
    Value::Object(out)
}

fn coerce_text(raw: &Value) -> String {
    match raw {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(coerce_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => language_keys(Language::En)
            .iter()
            .find_map(|key| map.get(*key))
            .map(coerce_text)
            .unwrap_or_default(),
    }
}

fn coerce_list(raw: &Value) -> Vec<String> {
    match raw {
        Value::Array(items) => items
            .iter()
            .map(coerce_text)
            .filter(|s| !s.is_empty())
            .collect(),
        other => {
            let text = coerce_text(other);
            if text.is_empty() { Vec::new() } else { vec![text] }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn assert_idempotent(raw: &Value, shape: &Shape) {
        let once = sanitize(raw, shape);
        let twice = sanitize(&once, shape);
        assert_eq!(once, twice, "sanitize must be idempotent for {raw}");
    }

    #[test]
    fn empty_object_gets_every_localized_key() {
        let out = sanitize(&json!({}), &INTERACTION_RESULT);
        assert_eq!(out["interactions"], json!([]));
        assert_eq!(out["overallRisk"], json!("unknown"));
        assert_eq!(out["summary"], json!({"en": "", "ar": "", "ku": ""}));
        assert_eq!(out["disclaimer"], json!({"en": "", "ar": "", "ku": ""}));
    }

    #[test]
    fn absent_list_fields_become_empty_arrays() {
        let out = sanitize(&json!({"uses": null}), &AI_SUMMARY);
        for key in ["uses", "sideEffects", "warnings", "pregnancy"] {
            assert_eq!(out[key], json!({"en": [], "ar": [], "ku": []}), "{key}");
        }
    }

    #[test]
    fn scalar_is_broadcast_into_every_language() {
        let out = sanitize(&json!({"title": "Bleeding risk"}), &INTERACTION);
        assert_eq!(
            out["title"],
            json!({"en": "Bleeding risk", "ar": "Bleeding risk", "ku": "Bleeding risk"})
        );

        let list = sanitize(&json!("Take with food"), &Shape::LocalizedList);
        assert_eq!(list["ku"], json!(["Take with food"]));
    }

    #[test]
    fn missing_language_keys_get_placeholders() {
        let out = sanitize(&json!({"en": "Headache"}), &Shape::LocalizedText);
        assert_eq!(out["en"], json!("Headache"));
        assert_eq!(out["ar"], json!("غير متوفر"));
        assert_eq!(out["ku"], json!("بەردەست نییە"));

        let list = sanitize(&json!({"en": ["Nausea"], "ar": []}), &Shape::LocalizedList);
        assert_eq!(list["ar"], json!([]));
        assert_eq!(list["ku"], json!(["بەردەست نییە"]));
    }

    #[test]
    fn generic_name_drift_is_reconciled() {
        let out = sanitize(
            &json!({"name": "Advil", "scientificName": "ibuprofen"}),
            &DRUG_SUMMARY,
        );
        assert_eq!(out["genericName"], json!("ibuprofen"));
        assert!(out.get("scientificName").is_none());
    }

    #[test]
    fn severity_vocabulary_is_normalized() {
        let out = sanitize(
            &json!({"interactions": [{"severity": "safe"}, {"severity": "Major"}], "overallRisk": "none"}),
            &INTERACTION_RESULT,
        );
        assert_eq!(out["interactions"][0]["severity"], json!("minor"));
        assert_eq!(out["interactions"][1]["severity"], json!("critical"));
        assert_eq!(out["overallRisk"], json!("minor"));
    }

    #[test]
    fn list_items_are_coerced_to_strings() {
        let out = sanitize(&json!({"en": ["a", 2, null, {"en": "b"}, "  "]}), &Shape::LocalizedList);
        assert_eq!(out["en"], json!(["a", "2", "b"]));
    }

    #[test]
    fn non_object_input_is_total() {
        for raw in [json!(null), json!(3), json!("text"), json!([1, 2]), json!(true)] {
            let out = sanitize(&raw, &DRUG_SUMMARY);
            assert!(out["aiSummary"]["uses"]["ku"].is_array());
            assert!(out["rawDetails"]["ingredients"]["active"].is_string());
            assert_idempotent(&raw, &DRUG_SUMMARY);
            assert_idempotent(&raw, &INTERACTION_RESULT);
        }
    }

    #[test]
    fn sanitize_is_idempotent_on_messy_payloads() {
        let messy = json!({
            "interactions": {"severity": "HIGH", "title": {"english": "X"}, "advice": "Avoid"},
            "overall_risk": "Moderate",
            "summary": ["one", "two"],
            "extra": {"dropped": true}
        });
        assert_idempotent(&messy, &INTERACTION_RESULT);
        let out = sanitize(&messy, &INTERACTION_RESULT);
        assert_eq!(out["interactions"][0]["recommendations"]["en"], json!(["Avoid"]));
        assert_eq!(out["summary"]["ar"], json!("one, two"));
        assert!(out.get("extra").is_none());
    }

    #[test]
    fn sanitize_into_produces_typed_payload() {
        use crate::entities::interaction::InteractionResult;
        let typed: InteractionResult =
            sanitize_into(&json!({"overallRisk": "critical"}), &INTERACTION_RESULT).unwrap();
        assert_eq!(typed.overall_risk, Severity::Critical);
        assert!(typed.interactions.is_empty());
    }
}
