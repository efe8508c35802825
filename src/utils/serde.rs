use serde::{Deserialize, Serialize};

/// openFDA encodes label sections as string arrays, but older records and
/// some mirrors send bare strings.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StringOrVec {
    #[default]
    None,
    Single(String),
    Multiple(Vec<String>),
}

impl StringOrVec {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::None => Vec::new(),
            Self::Single(value) => vec![value],
            Self::Multiple(values) => values,
        }
    }

    pub fn first(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Single(value) => Some(value.as_str()),
            Self::Multiple(values) => values.first().map(|value| value.as_str()),
        }
    }

    /// Joins all non-blank entries with a single space; `None` when nothing
    /// remains.
    pub fn joined(&self) -> Option<String> {
        let parts: Vec<&str> = match self {
            Self::None => Vec::new(),
            Self::Single(value) => vec![value.as_str()],
            Self::Multiple(values) => values.iter().map(String::as_str).collect(),
        };
        let joined = parts
            .into_iter()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() { None } else { Some(joined) }
    }
}

#[cfg(test)]
mod tests {
    use super::StringOrVec;

    #[test]
    fn string_or_vec_helpers_cover_all_shapes() {
        assert_eq!(StringOrVec::None.into_vec(), Vec::<String>::new());
        assert_eq!(StringOrVec::Single("X".into()).into_vec(), vec!["X"]);
        assert_eq!(
            StringOrVec::Multiple(vec!["A".into(), "B".into()]).into_vec(),
            vec!["A", "B"]
        );
        assert_eq!(StringOrVec::Single("A".into()).first(), Some("A"));
        assert_eq!(StringOrVec::Multiple(vec!["A".into()]).first(), Some("A"));
        assert_eq!(StringOrVec::None.first(), None);
    }

    #[test]
    fn joined_skips_blank_entries() {
        let v = StringOrVec::Multiple(vec![" WARNINGS ".into(), "".into(), "Reye's".into()]);
        assert_eq!(v.joined().as_deref(), Some("WARNINGS Reye's"));
        assert_eq!(StringOrVec::Multiple(vec!["  ".into()]).joined(), None);
        assert_eq!(StringOrVec::None.joined(), None);
    }

    #[test]
    fn deserializes_string_or_array() {
        let single: StringOrVec = serde_json::from_str("\"oral\"").unwrap();
        assert_eq!(single.first(), Some("oral"));
        let many: StringOrVec = serde_json::from_str("[\"a\",\"b\"]").unwrap();
        assert_eq!(many.into_vec().len(), 2);
    }
}
