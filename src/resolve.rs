//! Regional (UK/Iraq) drug names mapped to the names the US label database
//! knows, plus symptom-based suggestions when nothing matches.

use serde::Serialize;

use crate::utils::text::normalize_name;

// Order matters: the substring scan returns the first hit.
const NAME_TABLE: &[(&str, &str)] = &[
    ("paracetamol", "acetaminophen"),
    ("co-codamol", "acetaminophen with codeine"),
    ("cocodamol", "acetaminophen with codeine"),
    ("ibuprofen", "ibuprofen"),
    ("naproxen", "naproxen"),
    ("diclofenac", "diclofenac"),
    ("amoxicillin", "amoxicillin"),
    ("penicillin", "penicillin"),
    ("erythromycin", "erythromycin"),
    ("clarithromycin", "clarithromycin"),
    ("doxycycline", "doxycycline"),
    ("metronidazole", "metronidazole"),
    ("ciprofloxacin", "ciprofloxacin"),
    ("trimethoprim", "trimethoprim"),
    ("atenolol", "atenolol"),
    ("bisoprolol", "bisoprolol"),
    ("ramipril", "ramipril"),
    ("lisinopril", "lisinopril"),
    ("amlodipine", "amlodipine"),
    ("simvastatin", "simvastatin"),
    ("atorvastatin", "atorvastatin"),
    ("metformin", "metformin"),
    ("gliclazide", "gliclazide"),
    ("glimepiride", "glimepiride"),
    ("salbutamol", "albuterol"),
    ("ventolin", "albuterol"),
    ("becotide", "beclomethasone"),
    ("beclozone", "beclomethasone"),
    ("flixotide", "fluticasone"),
    ("seretide", "fluticasone salmeterol"),
    ("omeprazole", "omeprazole"),
    ("lansoprazole", "lansoprazole"),
    ("gaviscon", "aluminum hydroxide magnesium hydroxide"),
    ("peptac", "aluminum hydroxide magnesium hydroxide"),
    ("diazepam", "diazepam"),
    ("lorazepam", "lorazepam"),
    ("temazepam", "temazepam"),
    ("amitriptyline", "amitriptyline"),
    ("sertraline", "sertraline"),
    ("citalopram", "citalopram"),
    ("fluoxetine", "fluoxetine"),
    ("panadol", "tylenol"),
    ("nurofen", "advil"),
    ("voltaire", "cataflam"),
    ("augmentin", "augmentin"),
    ("zantac", "zantac"),
    ("losec", "prilosec"),
    ("nexium", "nexium"),
    ("vitamin c", "ascorbic acid"),
    ("vitamin d", "cholecalciferol"),
    ("vitamin b12", "cyanocobalamin"),
    ("folic acid", "folic acid"),
    ("paracitamol", "acetaminophen"),
    ("acetaminophen", "acetaminophen"),
    ("tylenol", "acetaminophen"),
];

const SYMPTOM_TABLE: &[(&str, &[&str])] = &[
    ("pain", &["acetaminophen", "ibuprofen", "naproxen"]),
    ("headache", &["acetaminophen", "ibuprofen", "aspirin"]),
    ("fever", &["acetaminophen", "ibuprofen"]),
    ("inflammation", &["ibuprofen", "naproxen", "diclofenac"]),
    ("infection", &["amoxicillin", "penicillin", "erythromycin"]),
    ("blood pressure", &["lisinopril", "atenolol", "amlodipine"]),
    ("diabetes", &["metformin", "gliclazide"]),
    ("asthma", &["albuterol", "fluticasone"]),
    ("stomach", &["omeprazole", "lansoprazole"]),
    ("depression", &["sertraline", "fluoxetine", "citalopram"]),
    ("anxiety", &["diazepam", "lorazepam"]),
];

pub const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub original: String,
    pub suggestion: String,
    pub description: String,
}

/// Maps a regional name to its US equivalent: exact match first, then the
/// first table entry that contains or is contained in the query.
pub fn resolve(query: &str) -> Option<&'static str> {
    let normalized = normalize_name(query);
    if normalized.is_empty() {
        return None;
    }

    if let Some((_, us)) = NAME_TABLE.iter().find(|(regional, _)| *regional == normalized) {
        return Some(us);
    }

    NAME_TABLE
        .iter()
        .find(|(regional, _)| normalized.contains(regional) || regional.contains(normalized.as_str()))
        .map(|(_, us)| *us)
}

pub fn suggest(query: &str) -> Vec<Suggestion> {
    let normalized = normalize_name(query);
    let original = query.trim();

    if let Some(us) = resolve(query)
        && us != normalized
    {
        return vec![Suggestion {
            original: original.to_string(),
            suggestion: us.to_string(),
            description: format!("Commonly known as \"{us}\" in the US"),
        }];
    }

    SYMPTOM_TABLE
        .iter()
        .find(|(symptom, _)| normalized.contains(symptom))
        .map(|(symptom, drugs)| {
            drugs
                .iter()
                .take(MAX_SUGGESTIONS)
                .map(|drug| Suggestion {
                    original: original.to_string(),
                    suggestion: drug.to_string(),
                    description: format!("Common medication for {symptom}"),
                })
                .collect()
        })
        .unwrap_or_default()
}
