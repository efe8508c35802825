use std::sync::OnceLock;

use regex::Regex;

use crate::entities::search::Card;
use crate::sources::openfda::{LabelRecord, OpenFdaBlock};
use crate::utils::serde::StringOrVec;

pub const GENERAL_CATEGORY: &str = "General Medication";
pub const DEFAULT_DOSAGE_FORM: &str = "Oral";

/// Label text sections flattened to single strings. Prescription section
/// names win; OTC equivalents fill gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSections {
    pub indications: Option<String>,
    pub dosage: Option<String>,
    pub warnings: Option<String>,
    pub boxed_warning: Option<String>,
    pub adverse_reactions: Option<String>,
    pub contraindications: Option<String>,
    pub interactions: Option<String>,
    pub pregnancy: Option<String>,
    pub pediatric: Option<String>,
    pub geriatric: Option<String>,
    pub active_ingredients: Option<String>,
    pub inactive_ingredients: Option<String>,
    pub route: Option<String>,
    pub supply: Option<String>,
}

fn first_present(fields: &[&StringOrVec]) -> Option<String> {
    fields.iter().find_map(|f| f.joined())
}

pub fn sections(record: &LabelRecord) -> LabelSections {
    let warnings = first_present(&[&record.warnings, &record.warnings_and_cautions]).or_else(|| {
        let otc = [&record.ask_doctor, &record.stop_use]
            .iter()
            .filter_map(|f| f.joined())
            .collect::<Vec<_>>();
        (!otc.is_empty()).then(|| otc.join(" "))
    });

    LabelSections {
        indications: first_present(&[&record.indications_and_usage, &record.purpose]),
        dosage: first_present(&[
            &record.dosage_and_administration,
            &record.dosage_forms_and_strengths,
        ]),
        warnings,
        boxed_warning: record.boxed_warning.joined(),
        adverse_reactions: record.adverse_reactions.joined(),
        contraindications: first_present(&[&record.contraindications, &record.do_not_use]),
        interactions: record.drug_interactions.joined(),
        pregnancy: first_present(&[
            &record.pregnancy,
            &record.pregnancy_or_breast_feeding,
            &record.nursing_mothers,
        ]),
        pediatric: record.pediatric_use.joined(),
        geriatric: record.geriatric_use.joined(),
        active_ingredients: record.active_ingredient.joined(),
        inactive_ingredients: record.inactive_ingredient.joined(),
        route: joined_list(&record.openfda.route),
        supply: first_present(&[&record.how_supplied, &record.storage_and_handling]),
    }
}

fn joined_list(field: &StringOrVec) -> Option<String> {
    let values = field
        .clone()
        .into_vec()
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>();
    (!values.is_empty()).then(|| values.join(", "))
}

fn class_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\[[^\]]*\]\s*$").expect("valid regex"))
}

/// Drops the `[EPC]`, `[PE]`, `[MoA]` style suffix openFDA appends.
pub fn clean_class(value: &str) -> Option<String> {
    let cleaned = class_suffix_re().replace(value.trim(), "");
    let cleaned = cleaned.trim();
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

fn title_case_words(value: &str) -> String {
    value
        .split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            let Some(first) = chars.next() else {
                return String::new();
            };
            let first = first.to_uppercase().collect::<String>();
            let rest = chars.as_str().to_lowercase();
            format!("{first}{rest}")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Established class, then physiologic effect, then mechanism, then product
/// type.
pub fn best_category(openfda: &OpenFdaBlock) -> String {
    [
        &openfda.pharm_class_epc,
        &openfda.pharm_class_pe,
        &openfda.pharm_class_moa,
    ]
    .iter()
    .find_map(|f| f.first().and_then(clean_class))
    .or_else(|| {
        openfda
            .product_type
            .first()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(title_case_words)
    })
    .unwrap_or_else(|| GENERAL_CATEGORY.to_string())
}

pub fn brand_name(record: &LabelRecord) -> Option<String> {
    record
        .openfda
        .brand_name
        .first()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn generic_name(record: &LabelRecord) -> Option<String> {
    record
        .openfda
        .generic_name
        .first()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn manufacturer(record: &LabelRecord) -> Option<String> {
    record
        .openfda
        .manufacturer_name
        .first()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn display_name(record: &LabelRecord) -> String {
    brand_name(record)
        .or_else(|| generic_name(record))
        .unwrap_or_else(|| "Unknown".to_string())
}

pub fn record_id(record: &LabelRecord) -> String {
    record
        .id
        .clone()
        .or_else(|| record.set_id.clone())
        .unwrap_or_else(|| crate::utils::text::normalize_name(&display_name(record)).replace(' ', "-"))
}

/// Lowercased brand and generic names, for matching against user input.
pub fn known_names(record: &LabelRecord) -> Vec<String> {
    let mut names = Vec::new();
    for value in record
        .openfda
        .brand_name
        .clone()
        .into_vec()
        .into_iter()
        .chain(record.openfda.generic_name.clone().into_vec())
    {
        let lowered = value.trim().to_lowercase();
        if !lowered.is_empty() && !names.contains(&lowered) {
            names.push(lowered);
        }
    }
    names
}

pub fn to_card(record: &LabelRecord) -> Card {
    let dosage_form = record
        .openfda
        .dosage_form
        .first()
        .or_else(|| record.openfda.route.first())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(title_case_words)
        .unwrap_or_else(|| DEFAULT_DOSAGE_FORM.to_string());

    Card {
        id: record_id(record),
        name: display_name(record),
        generic_name: generic_name(record).unwrap_or_else(|| "N/A".to_string()),
        category: best_category(&record.openfda),
        dosage_form,
    }
}
