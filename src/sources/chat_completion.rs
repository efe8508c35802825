use serde::{Deserialize, Serialize};

use crate::ai::{ChatProvider, CompletionRequest};
use crate::config::ProviderConfig;
use crate::error::PharmaError;

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionClient {
    client: reqwest::Client,
    name: String,
    base: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl ChatCompletionClient {
    pub fn new(config: &ProviderConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            name: config.name.clone(),
            base: config.base_url.clone(),
            model: config.model.clone(),
            api_key: config.api_key(),
            api_key_env: config.api_key_env.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(name: &str, base: String, api_key: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            name: name.to_string(),
            base,
            model: "test-model".to_string(),
            api_key: api_key.map(str::to_string),
            api_key_env: "TEST_API_KEY".to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn models_url(&self) -> String {
        self.endpoint("models")
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait::async_trait]
impl ChatProvider for ChatCompletionClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, PharmaError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(PharmaError::ApiKeyRequired {
                api: self.name.clone(),
                env_var: self.api_key_env.clone(),
            });
        };

        let body = ChatCompletionBody {
            model: &self.model,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_output.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let resp = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let bytes = crate::sources::read_limited_body(resp, &self.name).await?;

        if !status.is_success() {
            let excerpt = crate::sources::body_excerpt(&bytes);
            return Err(PharmaError::Api {
                api: self.name.clone(),
                message: format!("HTTP {status}: {excerpt}"),
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_slice(&bytes).map_err(|source| PharmaError::ApiJson {
                api: self.name.clone(),
                source,
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| PharmaError::Api {
                api: self.name.clone(),
                message: "Response contained no message content".into(),
            })
    }
}
