use std::time::{Duration, Instant};

use crate::ai::AiGateway;
use crate::cache::TtlCache;
use crate::config::AppConfig;
use crate::entities::drug::DrugSummary;
use crate::entities::localized::Language;
use crate::error::PharmaError;
use crate::sources::openfda::OpenFdaClient;

/// Everything a request handler needs, built once at startup and shared
/// behind an `Arc`.
pub struct AppState {
    pub labels: OpenFdaClient,
    pub ai: AiGateway,
    /// Assembled lookup pages keyed by normalized name and language.
    pub lookups: TtlCache<(String, Language), DrugSummary>,
    pub started: Instant,
}

impl AppState {
    pub fn new(labels: OpenFdaClient, ai: AiGateway, lookup_ttl: Duration) -> Self {
        Self {
            labels,
            ai,
            lookups: TtlCache::new(lookup_ttl),
            started: Instant::now(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, PharmaError> {
        Ok(Self::new(
            OpenFdaClient::new(&config.label)?,
            AiGateway::from_config(&config.ai, &config.cache)?,
            config.cache.lookup_ttl(),
        ))
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}
