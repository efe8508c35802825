use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::ai::summarize::{SummaryTask, summarizable, unavailable_summary};
use crate::ai::AiGateway;
use crate::entities::localized::{Language, LocalizedList, LocalizedText};
use crate::resolve;
use crate::sanitize::{DRUG_SUMMARY, conform};
use crate::sources::openfda::{LabelQuery, LabelRecord, OpenFdaClient};
use crate::state::AppState;
use crate::transform::{self, label::LabelSections};
use crate::utils::text::normalize_name;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    #[serde(default)]
    pub drug_name: String,
    /// Scanned package code; takes precedence over `drugName` when present.
    #[serde(default)]
    pub qr_code: Option<String>,
    #[serde(default)]
    pub language: Language,
}

impl LookupRequest {
    pub fn search_term(&self) -> &str {
        self.qr_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .unwrap_or_else(|| self.drug_name.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSummary {
    pub uses: LocalizedList,
    pub side_effects: LocalizedList,
    pub warnings: LocalizedList,
    pub dosage: LocalizedList,
    pub contraindications: LocalizedList,
    pub interactions: LocalizedList,
    pub pregnancy: LocalizedList,
}

impl AiSummary {
    pub fn filled(value: LocalizedList) -> Self {
        Self {
            uses: value.clone(),
            side_effects: value.clone(),
            warnings: value.clone(),
            dosage: value.clone(),
            contraindications: value.clone(),
            interactions: value.clone(),
            pregnancy: value,
        }
    }

    fn slot(&mut self, task: SummaryTask) -> &mut LocalizedList {
        match task {
            SummaryTask::Uses => &mut self.uses,
            SummaryTask::SideEffects => &mut self.side_effects,
            SummaryTask::Warnings => &mut self.warnings,
            SummaryTask::Dosage => &mut self.dosage,
            SummaryTask::Contraindications => &mut self.contraindications,
            SummaryTask::Interactions => &mut self.interactions,
            SummaryTask::Pregnancy => &mut self.pregnancy,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredients {
    pub active: String,
    pub inactive: String,
}

/// Label sections as display text in the requested language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDetails {
    pub indications: String,
    pub dosage: String,
    pub warnings: String,
    pub boxed_warning: String,
    pub adverse_reactions: String,
    pub contraindications: String,
    pub interactions: String,
    pub pregnancy: String,
    pub pediatric: String,
    pub geriatric: String,
    pub ingredients: Ingredients,
    pub route: String,
    pub supply: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugSummary {
    pub id: String,
    pub name: String,
    pub generic_name: String,
    pub brand_name: String,
    pub category: String,
    pub manufacturer: String,
    pub route: String,
    pub ai_summary: AiSummary,
    pub raw_details: RawDetails,
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupResponse {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drug: Option<DrugSummary>,
}

impl LookupResponse {
    pub fn not_found() -> Self {
        Self {
            found: false,
            drug: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Placeholder {
    NoneListed,
    SeeLabel,
}

impl Placeholder {
    fn text(self) -> LocalizedText {
        match self {
            Self::NoneListed => LocalizedText::text("None listed.", "لا يوجد.", "هیچ تۆمار نەکراوە."),
            Self::SeeLabel => LocalizedText::text(
                "See label.",
                "راجع النشرة الدوائية.",
                "سەیری نامیلکەی دەرمانەکە بکە.",
            ),
        }
    }
}

/// Section text in the target language; placeholders are localized without AI.
async fn localized_section(
    ai: &AiGateway,
    text: Option<&str>,
    placeholder: Placeholder,
    language: Language,
    translate: bool,
) -> String {
    match text {
        Some(text) if translate => ai.translate(text, language).await,
        Some(text) => text.to_string(),
        None => placeholder.text().get(language).clone(),
    }
}

fn summary_input(sections: &LabelSections, task: SummaryTask) -> Option<String> {
    match task {
        SummaryTask::Uses => sections.indications.clone(),
        SummaryTask::SideEffects => sections.adverse_reactions.clone(),
        SummaryTask::Warnings => {
            let parts = [&sections.boxed_warning, &sections.warnings]
                .into_iter()
                .flatten()
                .cloned()
                .collect::<Vec<_>>();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        SummaryTask::Dosage => sections.dosage.clone(),
        SummaryTask::Contraindications => sections.contraindications.clone(),
        SummaryTask::Interactions => sections.interactions.clone(),
        SummaryTask::Pregnancy => sections.pregnancy.clone(),
    }
}

/// Summaries for all seven tasks, plus whether the page is fit to cache:
/// false when some section had text to summarize but no provider answered.
async fn summarize_all(ai: &AiGateway, sections: &LabelSections) -> (AiSummary, bool) {
    let inputs = SummaryTask::ALL.map(|task| (task, summary_input(sections, task)));
    let results = join_all(
        inputs
            .iter()
            .map(|(task, text)| ai.try_summarize(text.as_deref(), *task)),
    )
    .await;

    let attempted = inputs
        .iter()
        .any(|(_, text)| summarizable(text.as_deref()).is_some());
    let generated = results.iter().any(Option::is_some);

    let mut summary = AiSummary::filled(LocalizedList::default());
    for ((task, _), result) in inputs.iter().zip(results) {
        *summary.slot(*task) = result.unwrap_or_else(|| task.default_summary());
    }
    (summary, generated || !attempted)
}

async fn raw_details(
    ai: &AiGateway,
    sections: &LabelSections,
    language: Language,
    translate: bool,
) -> RawDetails {
    use Placeholder::{NoneListed, SeeLabel};

    // The seven long-form sections are translated; the rest stay as printed.
    let translated = [
        (sections.indications.as_deref(), SeeLabel),
        (sections.dosage.as_deref(), SeeLabel),
        (sections.warnings.as_deref(), SeeLabel),
        (sections.adverse_reactions.as_deref(), SeeLabel),
        (sections.contraindications.as_deref(), NoneListed),
        (sections.interactions.as_deref(), NoneListed),
        (sections.pregnancy.as_deref(), NoneListed),
    ];
    let mut out = join_all(
        translated
            .iter()
            .map(|(text, placeholder)| localized_section(ai, *text, *placeholder, language, translate)),
    )
    .await
    .into_iter();
    let mut next = || out.next().unwrap_or_default();

    let verbatim = |text: &Option<String>, placeholder: Placeholder| {
        text.clone()
            .unwrap_or_else(|| placeholder.text().get(language).clone())
    };

    RawDetails {
        indications: next(),
        dosage: next(),
        warnings: next(),
        adverse_reactions: next(),
        contraindications: next(),
        interactions: next(),
        pregnancy: next(),
        boxed_warning: verbatim(&sections.boxed_warning, NoneListed),
        pediatric: verbatim(&sections.pediatric, NoneListed),
        geriatric: verbatim(&sections.geriatric, NoneListed),
        ingredients: Ingredients {
            active: verbatim(&sections.active_ingredients, NoneListed),
            inactive: verbatim(&sections.inactive_ingredients, NoneListed),
        },
        route: verbatim(&sections.route, SeeLabel),
        supply: verbatim(&sections.supply, SeeLabel),
    }
}

async fn fetch_record(labels: &OpenFdaClient, name: &str) -> Option<LabelRecord> {
    let records = labels.fetch_labels(&LabelQuery::Exact(name.to_string()), 1).await;
    if let Some(record) = records.into_iter().next() {
        return Some(record);
    }
    let us_name = resolve::resolve(name).filter(|us| *us != normalize_name(name))?;
    info!(original = name, translated = us_name, "Retrying lookup under US name");
    labels
        .fetch_labels(&LabelQuery::Exact(us_name.to_string()), 1)
        .await
        .into_iter()
        .next()
}

/// Full drug page: label fetch, seven summaries and seven translations in
/// parallel, sanitized and cached per (name, language).
pub async fn lookup(state: &AppState, name: &str, language: Language) -> LookupResponse {
    let name = name.trim();
    if name.is_empty() {
        return LookupResponse::not_found();
    }

    let key = (normalize_name(name), language);
    if let Some(drug) = state.lookups.get(&key) {
        debug!(drug = name, language = language.code(), "Lookup cache hit");
        return LookupResponse {
            found: true,
            drug: Some(drug),
        };
    }

    let Some(record) = fetch_record(&state.labels, name).await else {
        return LookupResponse::not_found();
    };
    let sections = transform::label::sections(&record);

    let (ai_summary, raw_details, cacheable) = if state.ai.guard_tripped() {
        info!(drug = name, "AI guard tripped, serving raw label data");
        (
            AiSummary::filled(unavailable_summary()),
            raw_details(&state.ai, &sections, language, false).await,
            false,
        )
    } else {
        let ((ai_summary, cacheable), raw_details) = futures::join!(
            summarize_all(&state.ai, &sections),
            raw_details(&state.ai, &sections, language, true),
        );
        (ai_summary, raw_details, cacheable)
    };

    let drug = conform(
        DrugSummary {
            id: transform::label::record_id(&record),
            name: transform::label::display_name(&record),
            generic_name: transform::label::generic_name(&record).unwrap_or_default(),
            brand_name: transform::label::brand_name(&record).unwrap_or_default(),
            category: transform::label::best_category(&record.openfda),
            manufacturer: transform::label::manufacturer(&record).unwrap_or_default(),
            route: sections.route.clone().unwrap_or_default(),
            ai_summary,
            raw_details,
        },
        &DRUG_SUMMARY,
    );

    if cacheable {
        state.lookups.insert(key, drug.clone());
    } else {
        debug!(drug = name, "AI summaries unavailable, lookup not cached");
    }
    LookupResponse {
        found: true,
        drug: Some(drug),
    }
}
