use minijinja::context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{AiGateway, ChatMessage, CompletionRequest, parse_json_object, prompts};
use crate::entities::localized::{Language, LocalizedList};
use crate::error::PharmaError;
use crate::sanitize::{Shape, sanitize_into};
use crate::utils::text::truncate_chars;

/// Inputs shorter than this never reach a provider.
pub const MIN_INPUT_CHARS: usize = 5;
pub const MAX_INPUT_CHARS: usize = 3000;
pub const BULLETS_PER_LANGUAGE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SummaryTask {
    Uses,
    SideEffects,
    Warnings,
    Dosage,
    Contraindications,
    Interactions,
    Pregnancy,
}

impl SummaryTask {
    pub const ALL: [SummaryTask; 7] = [
        SummaryTask::Uses,
        SummaryTask::SideEffects,
        SummaryTask::Warnings,
        SummaryTask::Dosage,
        SummaryTask::Contraindications,
        SummaryTask::Interactions,
        SummaryTask::Pregnancy,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Uses => "medical uses (indications)",
            Self::SideEffects => "side effects (adverse reactions)",
            Self::Warnings => "most important warnings",
            Self::Dosage => "dosage and administration",
            Self::Contraindications => "contraindications",
            Self::Interactions => "drug interactions",
            Self::Pregnancy => "pregnancy and breastfeeding guidance",
        }
    }

    fn rules(self) -> &'static str {
        match self {
            Self::Uses => {
                "List the conditions or symptoms the drug treats. Ignore dosing, warnings and marketing text."
            }
            Self::SideEffects => {
                "List the most common side effects a patient may notice. Ignore usage instructions, \
                 dosing and statements about how the drug works."
            }
            Self::Warnings => {
                "Prefer boxed or bolded warnings first. Phrase each as a clear caution. Ignore side-effect frequency tables."
            }
            Self::Dosage => {
                "Give the usual adult dose with units and frequency, then the maximum daily dose if stated. \
                 Keep numbers and units exactly as written."
            }
            Self::Contraindications => {
                "List who must not take the drug (conditions, allergies, patient groups). Ignore general warnings."
            }
            Self::Interactions => {
                "Name the drugs or drug classes that interact and the consequence. Ignore food and lab-test notes unless nothing else is listed."
            }
            Self::Pregnancy => {
                "State the pregnancy guidance and trimester restrictions, then breastfeeding guidance if present."
            }
        }
    }

    /// Static message used when the section is missing or every provider fails.
    pub fn default_summary(self) -> LocalizedList {
        let en = match self {
            Self::Uses => "No specific uses listed.",
            Self::SideEffects => "No common side effects listed.",
            Self::Warnings => "No specific warnings listed.",
            Self::Dosage => "No dosage information listed.",
            Self::Contraindications => "No contraindications listed.",
            Self::Interactions => "No known interactions listed.",
            Self::Pregnancy => "Consult your doctor before use during pregnancy.",
        };
        LocalizedList::single(
            en,
            Language::Ar.placeholder(),
            Language::Ku.placeholder(),
        )
    }
}

/// Shown in every summary field when the request-level AI guard is tripped.
pub fn unavailable_summary() -> LocalizedList {
    LocalizedList::single(
        "AI summary unavailable, see raw data below.",
        "ملخص الذكاء الاصطناعي غير متوفر، راجع البيانات الأصلية أدناه.",
        "پوختەی زیرەکی دەستکرد بەردەست نییە، سەیری زانیارییەکانی خوارەوە بکە.",
    )
}

fn fit_bullets(mut summary: LocalizedList, default: &LocalizedList) -> LocalizedList {
    for lang in Language::ALL {
        let bullets = summary.get_mut(lang);
        bullets.truncate(BULLETS_PER_LANGUAGE);
        if bullets.is_empty() {
            bullets.clone_from(default.get(lang));
        }
    }
    summary
}

/// The trimmed section text, if it is long enough to be worth a provider call.
pub(crate) fn summarizable(text: Option<&str>) -> Option<&str> {
    text.map(str::trim)
        .filter(|t| t.chars().count() >= MIN_INPUT_CHARS)
}

impl AiGateway {
    /// Condenses one label section into three short bullets per language.
    pub async fn summarize(&self, text: Option<&str>, task: SummaryTask) -> LocalizedList {
        self.try_summarize(text, task)
            .await
            .unwrap_or_else(|| task.default_summary())
    }

    /// Like [`AiGateway::summarize`], but `None` when no provider produced the
    /// summary (short input, prompt failure or every provider failing).
    pub(crate) async fn try_summarize(
        &self,
        text: Option<&str>,
        task: SummaryTask,
    ) -> Option<LocalizedList> {
        let default = task.default_summary();
        let text = summarizable(text)?;

        let system = match prompts::render(
            prompts::SUMMARIZE,
            context! {
                task => task.label(),
                rules => task.rules(),
                bullets => BULLETS_PER_LANGUAGE,
            },
        ) {
            Ok(prompt) => prompt,
            Err(err) => {
                warn!(mode = "summarize", error = %err, "Prompt rendering failed");
                return None;
            }
        };

        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(system),
                ChatMessage::user(truncate_chars(text, MAX_INPUT_CHARS)),
            ],
            temperature: 0.1,
            max_tokens: Some(800),
            json_output: true,
        };

        self.try_in_order("summarize", &request, |content| {
            let value = parse_json_object(content)?;
            let summary: LocalizedList = sanitize_into(&value, &Shape::LocalizedList)
                .ok_or_else(|| PharmaError::Internal("summary did not match shape".into()))?;
            Ok(fit_bullets(summary, &default))
        })
        .await
    }
}
