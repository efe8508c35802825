use crate::entities::localized::Language;

// Letters used by Sorani but absent from standard Arabic.
const SORANI_LETTERS: [char; 6] = ['ە', 'ێ', 'ۆ', 'ڕ', 'ڵ', 'ڤ'];

fn is_arabic_block(c: char) -> bool {
    matches!(c, '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}' | '\u{FB50}'..='\u{FDFF}' | '\u{FE70}'..='\u{FEFF}')
}

/// Character-class scan of the user's message.
pub fn detect_language(text: &str) -> Language {
    if text.chars().any(|c| SORANI_LETTERS.contains(&c)) {
        return Language::Ku;
    }
    if text.chars().any(is_arabic_block) {
        return Language::Ar;
    }
    Language::En
}
