use minijinja::context;
use tracing::{debug, warn};

use super::summarize::MIN_INPUT_CHARS;
use super::{AiGateway, ChatMessage, CompletionRequest, prompts};
use crate::entities::localized::Language;
use crate::error::PharmaError;
use crate::utils::text::truncate_chars;

pub const MAX_INPUT_CHARS: usize = 1500;

impl AiGateway {
    /// Full-text translation of a label section. English targets, empty and
    /// very short inputs are returned unchanged, as is the input when every
    /// provider fails.
    pub async fn translate(&self, text: &str, target: Language) -> String {
        let trimmed = text.trim();
        if target == Language::En || trimmed.chars().count() < MIN_INPUT_CHARS {
            return text.to_string();
        }

        let input = truncate_chars(trimmed, MAX_INPUT_CHARS);
        let key = (target, input.to_string());
        if let Some(hit) = self.translations().get(&key) {
            debug!(language = target.code(), "Translation cache hit");
            return hit;
        }

        let system = match prompts::render(
            prompts::TRANSLATE,
            context! { language => target.prompt_name() },
        ) {
            Ok(prompt) => prompt,
            Err(err) => {
                warn!(mode = "translate", error = %err, "Prompt rendering failed");
                return text.to_string();
            }
        };

        let request = CompletionRequest {
            messages: vec![ChatMessage::system(system), ChatMessage::user(input)],
            temperature: 0.1,
            max_tokens: Some(2000),
            json_output: false,
        };

        let translated = self
            .try_in_order("translate", &request, |content| {
                let content = content.trim();
                if content.is_empty() {
                    return Err(PharmaError::Internal("empty translation".into()));
                }
                Ok(content.to_string())
            })
            .await;

        match translated {
            Some(out) => {
                self.translations().insert(key, out.clone());
                out
            }
            None => text.to_string(),
        }
    }
}
