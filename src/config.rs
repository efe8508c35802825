use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PharmaError;

/// Service configuration.
///
/// Loaded from an optional `pharmaref.{toml,yaml,json}` file, then overridden
/// by `PHARMAREF__*` environment variables (e.g. `PHARMAREF__AI__TIMEOUT_SECS`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Ceiling for a whole inbound request, including every fan-out call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub enable_cors: bool,

    #[serde(default)]
    pub label: LabelSourceConfig,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LabelSourceConfig {
    #[serde(default = "default_label_base")]
    pub base_url: String,
    #[serde(default = "default_label_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_label_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub ipv4_only: bool,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiConfig {
    /// Bound applied to every individual provider call.
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Failures older than this no longer count toward the threshold.
    #[serde(default = "default_failure_cooldown_secs")]
    pub failure_cooldown_secs: u64,
    /// Ordered best-quality-first.
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_lookup_ttl_secs")]
    pub lookup_ttl_secs: u64,
    #[serde(default = "default_translation_ttl_secs")]
    pub translation_ttl_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            request_timeout_secs: default_request_timeout_secs(),
            enable_cors: default_true(),
            label: LabelSourceConfig::default(),
            ai: AiConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for LabelSourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_label_base(),
            api_key_env: default_label_key_env(),
            timeout_secs: default_label_timeout_secs(),
            ipv4_only: default_true(),
            accept_invalid_certs: false,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_ai_timeout_secs(),
            failure_threshold: default_failure_threshold(),
            failure_cooldown_secs: default_failure_cooldown_secs(),
            providers: default_providers(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            lookup_ttl_secs: default_lookup_ttl_secs(),
            translation_ttl_secs: default_translation_ttl_secs(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, PharmaError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("pharmaref").required(false))
            .add_source(config::Environment::with_prefix("PHARMAREF").separator("__"));

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, PharmaError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|err| PharmaError::InvalidArgument(format!("Invalid bind address: {err}")))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl LabelSourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn api_key(&self) -> Option<String> {
        read_key(&self.api_key_env)
    }
}

impl AiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn failure_cooldown(&self) -> Duration {
        Duration::from_secs(self.failure_cooldown_secs)
    }
}

impl ProviderConfig {
    pub fn api_key(&self) -> Option<String> {
        read_key(&self.api_key_env)
    }
}

impl CacheConfig {
    pub fn lookup_ttl(&self) -> Duration {
        Duration::from_secs(self.lookup_ttl_secs)
    }

    pub fn translation_ttl(&self) -> Duration {
        Duration::from_secs(self.translation_ttl_secs)
    }
}

fn read_key(env_var: &str) -> Option<String> {
    std::env::var(env_var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_label_base() -> String {
    "https://api.fda.gov".to_string()
}

fn default_label_key_env() -> String {
    "OPENFDA_API_KEY".to_string()
}

fn default_label_timeout_secs() -> u64 {
    15
}

fn default_ai_timeout_secs() -> u64 {
    20
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_failure_cooldown_secs() -> u64 {
    120
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            name: "groq".to_string(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
        },
        ProviderConfig {
            name: "openrouter".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "meta-llama/llama-3.3-70b-instruct".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
        },
    ]
}

fn default_lookup_ttl_secs() -> u64 {
    300
}

fn default_translation_ttl_secs() -> u64 {
    120
}
