//! Provider-agnostic access to hosted chat-completion models.
//!
//! Every AI job (chat, summarize, translate, interaction analysis) goes
//! through [`AiGateway::try_in_order`]: providers are tried in their
//! configured priority, each call bounded by a timeout, and the first
//! response that parses wins. Callers supply their own static fallback for
//! the case where every provider fails.

pub mod chat;
pub mod failures;
pub mod language;
pub mod prompts;
pub mod summarize;
pub mod translate;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::config::{AiConfig, CacheConfig};
use crate::entities::localized::Language;
use crate::error::PharmaError;
use crate::sources::chat_completion::ChatCompletionClient;

pub use failures::FailureCounter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    /// Ask the provider for a JSON object response.
    pub json_output: bool,
}

#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, PharmaError>;
}

pub struct AiGateway {
    providers: Vec<Arc<dyn ChatProvider>>,
    failures: FailureCounter,
    translations: TtlCache<(Language, String), String>,
    call_timeout: Duration,
}

impl AiGateway {
    pub fn new(
        providers: Vec<Arc<dyn ChatProvider>>,
        failures: FailureCounter,
        translations: TtlCache<(Language, String), String>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            providers,
            failures,
            translations,
            call_timeout,
        }
    }

    pub fn from_config(ai: &AiConfig, cache: &CacheConfig) -> Result<Self, PharmaError> {
        let client = crate::sources::ai_http_client(ai.timeout())?;
        let providers = ai
            .providers
            .iter()
            .filter(|p| {
                let keyed = p.api_key().is_some();
                if !keyed {
                    warn!(provider = %p.name, env_var = %p.api_key_env, "No API key set, provider left out of the chain");
                }
                keyed
            })
            .map(|p| Arc::new(ChatCompletionClient::new(p, client.clone())) as Arc<dyn ChatProvider>)
            .collect();
        Ok(Self::new(
            providers,
            FailureCounter::new(ai.failure_threshold, ai.failure_cooldown()),
            TtlCache::new(cache.translation_ttl()),
            ai.timeout(),
        ))
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn failures(&self) -> &FailureCounter {
        &self.failures
    }

    /// Request-level guard: true while no provider in the chain is usable,
    /// either because every one is over its failure threshold or because
    /// none is configured. Checked once per request, not per call.
    pub fn guard_tripped(&self) -> bool {
        self.failures.all_open(self.providers.iter().map(|p| p.name()))
    }

    pub(crate) fn translations(&self) -> &TtlCache<(Language, String), String> {
        &self.translations
    }

    /// Tries each provider once, in order, until one returns content that
    /// `parse` accepts. Providers over their failure threshold are skipped.
    /// Returns `None` when every provider failed or was skipped.
    pub async fn try_in_order<T>(
        &self,
        mode: &'static str,
        request: &CompletionRequest,
        mut parse: impl FnMut(&str) -> Result<T, PharmaError>,
    ) -> Option<T> {
        for provider in &self.providers {
            let name = provider.name();
            if self.failures.is_open(name) {
                debug!(provider = name, mode, "Provider over failure threshold, skipping");
                continue;
            }
            let outcome = match tokio::time::timeout(self.call_timeout, provider.complete(request)).await {
                Ok(Ok(content)) => parse(&content),
                Ok(Err(err)) => Err(err),
                Err(_) => Err(PharmaError::Timeout {
                    api: name.to_string(),
                    secs: self.call_timeout.as_secs(),
                }),
            };
            match outcome {
                Ok(value) => {
                    self.failures.record_success(name);
                    debug!(provider = name, mode, "AI call succeeded");
                    return Some(value);
                }
                // Configuration, not an outage: never counts toward the threshold.
                Err(err @ PharmaError::ApiKeyRequired { .. }) => {
                    warn!(provider = name, mode, error = %err, "AI provider skipped");
                }
                Err(err) => {
                    let failures = self.failures.record_failure(name);
                    warn!(provider = name, mode, failures, error = %err, "AI provider failed, falling through");
                }
            }
        }
        None
    }
}

/// Extracts the JSON object from a model reply, tolerating markdown fences
/// and leading prose.
pub(crate) fn parse_json_object(content: &str) -> Result<serde_json::Value, PharmaError> {
    let trimmed = content.trim();
    let body = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => &trimmed[start..=end],
        _ => trimmed,
    };
    let value: serde_json::Value = serde_json::from_str(body)?;
    if !value.is_object() {
        return Err(PharmaError::Api {
            api: "ai".into(),
            message: "Expected a JSON object".into(),
        });
    }
    Ok(value)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// In-process provider returning scripted replies and counting calls.
    pub struct ScriptedProvider {
        name: String,
        replies: Mutex<VecDeque<Result<String, String>>>,
        fallback: Result<String, String>,
        text_reply: Option<String>,
        inputs: Mutex<Vec<String>>,
        pub calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl ScriptedProvider {
        pub fn ok(name: &str, reply: &str) -> Arc<Self> {
            Arc::new(Self::with(name, Ok(reply.to_string())))
        }

        pub fn failing(name: &str) -> Arc<Self> {
            Arc::new(Self::with(name, Err("provider down".to_string())))
        }

        pub fn slow(name: &str, delay: Duration) -> Arc<Self> {
            let mut p = Self::with(name, Ok("{}".to_string()));
            p.delay = Some(delay);
            Arc::new(p)
        }

        pub fn sequence(name: &str, replies: Vec<Result<&str, &str>>) -> Arc<Self> {
            let p = Self::with(name, Err("script exhausted".to_string()));
            *p.replies.lock().unwrap() = replies
                .into_iter()
                .map(|r| r.map(str::to_string).map_err(str::to_string))
                .collect();
            Arc::new(p)
        }

        /// Answers JSON requests with `json_reply` and plain-text requests
        /// (translations) with `text_reply`.
        pub fn by_format(name: &str, json_reply: &str, text_reply: &str) -> Arc<Self> {
            let mut p = Self::with(name, Ok(json_reply.to_string()));
            p.text_reply = Some(text_reply.to_string());
            Arc::new(p)
        }

        fn with(name: &str, fallback: Result<String, String>) -> Self {
            Self {
                name: name.to_string(),
                replies: Mutex::new(VecDeque::new()),
                fallback,
                text_reply: None,
                inputs: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Content of the last message of every request received.
        pub fn inputs(&self) -> Vec<String> {
            self.inputs.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ChatProvider for ScriptedProvider {
        fn name(&self) -> &str {
            &self.name
        }

        async fn complete(&self, request: &CompletionRequest) -> Result<String, PharmaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(last) = request.messages.last() {
                self.inputs.lock().unwrap().push(last.content.clone());
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if !request.json_output
                && let Some(reply) = &self.text_reply
            {
                return Ok(reply.clone());
            }
            let next = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());
            next.map_err(|message| PharmaError::Api {
                api: self.name.clone(),
                message,
            })
        }
    }

    pub fn gateway(providers: Vec<Arc<ScriptedProvider>>) -> AiGateway {
        AiGateway::new(
            providers
                .into_iter()
                .map(|p| p as Arc<dyn ChatProvider>)
                .collect(),
            FailureCounter::new(5, Duration::from_secs(120)),
            TtlCache::new(Duration::from_secs(120)),
            Duration::from_millis(500),
        )
    }
}
