use serde::Serialize;

use crate::error::PharmaError;

pub fn to_pretty<T: Serialize>(value: &T) -> Result<String, PharmaError> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::to_pretty;
    use crate::entities::interaction::Severity;
    use crate::entities::search::{Card, SearchResponse};

    #[test]
    fn search_response_omits_empty_optional_fields() {
        let response = SearchResponse {
            drugs: vec![Card {
                id: "a1".into(),
                name: "Advil".into(),
                generic_name: "IBUPROFEN".into(),
                category: "Nonsteroidal Anti-inflammatory Drug".into(),
                dosage_form: "Tablet".into(),
            }],
            ..Default::default()
        };
        let json = to_pretty(&response).expect("json");
        assert!(json.contains('\n'));
        assert!(json.contains("\"genericName\": \"IBUPROFEN\""));
        assert!(!json.contains("translationInfo"));
        assert!(!json.contains("suggestions"));
    }

    #[test]
    fn severity_renders_lowercase() {
        let json = to_pretty(&Severity::Critical).expect("json");
        assert_eq!(json, "\"critical\"");
    }
}
