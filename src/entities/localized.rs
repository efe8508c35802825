use serde::{Deserialize, Serialize};

/// The three UI languages. Unknown codes fall back to English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Language {
    #[default]
    En,
    Ar,
    Ku,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::Ar, Language::Ku];

    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "ar" | "ara" | "arabic" => Self::Ar,
            "ku" | "ckb" | "kur" | "kurdish" | "sorani" => Self::Ku,
            _ => Self::En,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ar => "ar",
            Self::Ku => "ku",
        }
    }

    /// Name used inside prompts.
    pub fn prompt_name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Ar => "Arabic",
            Self::Ku => "Sorani Kurdish (Central Kurdish, Arabic script)",
        }
    }

    /// Shown where a value is missing entirely.
    pub fn placeholder(self) -> &'static str {
        match self {
            Self::En => "N/A",
            Self::Ar => "غير متوفر",
            Self::Ku => "بەردەست نییە",
        }
    }
}

impl From<String> for Language {
    fn from(value: String) -> Self {
        Self::from_code(&value)
    }
}

/// A value carried in English, Arabic and Sorani Kurdish at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Localized<T> {
    pub en: T,
    pub ar: T,
    pub ku: T,
}

pub type LocalizedText = Localized<String>;
pub type LocalizedList = Localized<Vec<String>>;

impl<T> Localized<T> {
    pub fn new(en: T, ar: T, ku: T) -> Self {
        Self { en, ar, ku }
    }

    pub fn get(&self, language: Language) -> &T {
        match language {
            Language::En => &self.en,
            Language::Ar => &self.ar,
            Language::Ku => &self.ku,
        }
    }

    pub fn get_mut(&mut self, language: Language) -> &mut T {
        match language {
            Language::En => &mut self.en,
            Language::Ar => &mut self.ar,
            Language::Ku => &mut self.ku,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(Language, T) -> U) -> Localized<U> {
        Localized {
            en: f(Language::En, self.en),
            ar: f(Language::Ar, self.ar),
            ku: f(Language::Ku, self.ku),
        }
    }
}

impl<T: Clone> Localized<T> {
    pub fn broadcast(value: T) -> Self {
        Self {
            en: value.clone(),
            ar: value.clone(),
            ku: value,
        }
    }
}

impl LocalizedText {
    pub fn text(en: &str, ar: &str, ku: &str) -> Self {
        Self::new(en.to_string(), ar.to_string(), ku.to_string())
    }
}

impl LocalizedList {
    /// One bullet per language.
    pub fn single(en: &str, ar: &str, ku: &str) -> Self {
        Self::new(vec![en.to_string()], vec![ar.to_string()], vec![ku.to_string()])
    }
}
