use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ai::AiGateway;
use crate::ai::chat::apology;
use crate::ai::language::detect_language;
use crate::utils::text::truncate_chars;

pub const MAX_MESSAGE_CHARS: usize = 1000;
pub const INVALID_QUESTION: &str = "I need a valid question.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub drug_name: String,
    /// Label data the answer must be grounded in; usually the lookup's `rawDetails`.
    #[serde(default)]
    pub context: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Stateless single-turn answer. Conversation history stays with the caller.
pub async fn chat(ai: &AiGateway, request: &ChatRequest) -> ChatResponse {
    let message = request.message.trim();
    if message.is_empty() {
        return ChatResponse {
            reply: INVALID_QUESTION.to_string(),
        };
    }
    let message = truncate_chars(message, MAX_MESSAGE_CHARS);

    if ai.guard_tripped() {
        info!(drug = %request.drug_name, "AI guard tripped, chat unavailable");
        return ChatResponse {
            reply: apology(detect_language(message)).to_string(),
        };
    }

    let drug_name = match request.drug_name.trim() {
        "" => "this medication",
        name => name,
    };
    ChatResponse {
        reply: ai.chat(drug_name, &request.context, message).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::{ScriptedProvider, gateway};
    use crate::entities::localized::Language;

    fn request(message: &str) -> ChatRequest {
        ChatRequest {
            message: message.into(),
            drug_name: "Advil".into(),
            context: serde_json::json!({"dosage": "200 mg every 4 hours"}),
        }
    }

    #[tokio::test]
    async fn blank_message_is_rejected_without_ai() {
        let provider = ScriptedProvider::ok("a", "unused");
        let ai = gateway(vec![provider.clone()]);
        let out = chat(&ai, &request("   ")).await;
        assert_eq!(out.reply, INVALID_QUESTION);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn answers_from_first_healthy_provider() {
        let ai = gateway(vec![
            ScriptedProvider::failing("a"),
            ScriptedProvider::ok("b", "Take one tablet every 4 hours."),
        ]);
        let out = chat(&ai, &request("How often can I take it?")).await;
        assert_eq!(out.reply, "Take one tablet every 4 hours.");
    }

    #[tokio::test]
    async fn tripped_guard_apologizes_in_question_language() {
        let provider = ScriptedProvider::ok("a", "unused");
        let ai = gateway(vec![provider.clone()]);
        for _ in 0..ai.failures().threshold() {
            ai.failures().record_failure("a");
        }
        let out = chat(&ai, &request("هل هذا الدواء آمن؟")).await;
        assert_eq!(out.reply, apology(Language::Ar));
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn request_accepts_missing_context() {
        let req: ChatRequest =
            serde_json::from_value(serde_json::json!({"message": "hi", "drugName": "x"})).unwrap();
        assert!(req.context.is_null());
    }
}
