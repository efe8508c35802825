use minijinja::context;
use tracing::warn;

use super::language::detect_language;
use super::{AiGateway, ChatMessage, CompletionRequest, prompts};
use crate::entities::localized::Language;
use crate::utils::text::truncate_chars;

pub const CONTEXT_BUDGET_CHARS: usize = 6000;

pub fn apology(language: Language) -> &'static str {
    match language {
        Language::En => "Sorry, I am having trouble connecting to the server.",
        Language::Ar => "عذراً، أواجه مشكلة في الاتصال بالخادم.",
        Language::Ku => "ببورە، کێشەم هەیە لە پەیوەندیکردن بە سێرڤەرەوە.",
    }
}

impl AiGateway {
    /// Single-turn answer grounded in the supplied label context, in the
    /// language of the question.
    pub async fn chat(&self, drug_name: &str, label_context: &serde_json::Value, message: &str) -> String {
        let language = detect_language(message);
        let context_json = serde_json::to_string(label_context).unwrap_or_default();

        let system = match prompts::render(
            prompts::CHAT,
            context! {
                drug_name => drug_name,
                context => truncate_chars(&context_json, CONTEXT_BUDGET_CHARS),
                language => language.prompt_name(),
            },
        ) {
            Ok(prompt) => prompt,
            Err(err) => {
                warn!(mode = "chat", error = %err, "Prompt rendering failed");
                return apology(language).to_string();
            }
        };

        let request = CompletionRequest {
            messages: vec![ChatMessage::system(system), ChatMessage::user(message)],
            temperature: 0.3,
            max_tokens: Some(300),
            json_output: false,
        };

        self.try_in_order("chat", &request, |content| Ok(content.trim().to_string()))
            .await
            .filter(|reply| !reply.is_empty())
            .unwrap_or_else(|| apology(language).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::{ScriptedProvider, gateway};

    #[tokio::test]
    async fn returns_provider_text_verbatim() {
        let gw = gateway(vec![ScriptedProvider::ok("a", "Take it with food.")]);
        let reply = gw
            .chat("Advil", &serde_json::json!({"dosage": "200 mg"}), "How do I take it?")
            .await;
        assert_eq!(reply, "Take it with food.");
    }

    #[tokio::test]
    async fn total_failure_apologizes_in_question_language() {
        let gw = gateway(vec![ScriptedProvider::failing("a"), ScriptedProvider::failing("b")]);
        let reply = gw.chat("Advil", &serde_json::json!({}), "ئایا ئەم دەرمانە مەترسیدارە؟").await;
        assert_eq!(reply, apology(Language::Ku));

        let reply = gw.chat("Advil", &serde_json::json!({}), "Is it safe?").await;
        assert_eq!(reply, apology(Language::En));
    }
}
