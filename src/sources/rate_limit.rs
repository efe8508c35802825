use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use http::Extensions;
use reqwest::Url;
use reqwest_middleware::{Middleware, Next};
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

// openFDA allows 240 requests per minute per IP without a key.
const OPENFDA_MIN_INTERVAL: Duration = Duration::from_millis(250);
const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Clone, Debug)]
pub(crate) struct RateLimitPolicy {
    pub key: &'static str,
    pub prefix: String,
    pub min_interval: Duration,
}

/// Spaces outbound requests per upstream prefix.
#[derive(Debug)]
pub(crate) struct RateLimiter {
    policies: Vec<RateLimitPolicy>,
    default_min_interval: Duration,
    last_seen: Mutex<HashMap<String, Instant>>,
}

impl RateLimiter {
    pub(crate) fn for_label_source(base_url: &str) -> Self {
        let policies = vec![RateLimitPolicy {
            key: "openfda",
            prefix: base_url.trim_end_matches('/').to_string(),
            min_interval: OPENFDA_MIN_INTERVAL,
        }];
        Self::new(policies, DEFAULT_MIN_INTERVAL)
    }

    pub(crate) fn new(policies: Vec<RateLimitPolicy>, default_min_interval: Duration) -> Self {
        Self {
            policies,
            default_min_interval,
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    fn resolve_key_and_interval(&self, url: &Url) -> (String, Duration) {
        let full = url.as_str();

        if let Some(policy) = self
            .policies
            .iter()
            .filter(|p| !p.prefix.is_empty() && full.starts_with(p.prefix.as_str()))
            .max_by_key(|p| p.prefix.len())
        {
            return (format!("policy:{}", policy.key), policy.min_interval);
        }

        let origin = format!(
            "{}://{}",
            url.scheme(),
            url.host_str().unwrap_or("unknown-host")
        );
        (format!("default:{origin}"), self.default_min_interval)
    }

    pub(crate) async fn wait_for_url(&self, url: &Url) {
        let (key, min_interval) = self.resolve_key_and_interval(url);
        loop {
            let now = Instant::now();
            let mut map = self.last_seen.lock().await;
            let wait_until = map.get(&key).map(|last| *last + min_interval);

            match wait_until {
                Some(target) if target > now => {
                    drop(map);
                    sleep_until(target).await;
                }
                _ => {
                    map.insert(key, now);
                    return;
                }
            }
        }
    }

    #[cfg(test)]
    fn resolve_key_for_str(&self, raw: &str) -> Option<String> {
        let url = Url::parse(raw).ok()?;
        Some(self.resolve_key_and_interval(&url).0)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct RateLimitMiddleware {
    limiter: Arc<RateLimiter>,
}

impl RateLimitMiddleware {
    pub(crate) fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait::async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle(
        &self,
        req: reqwest::Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        self.limiter.wait_for_url(req.url()).await;
        next.run(req, extensions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn openfda_policy_spaces_consecutive_calls() {
        let limiter = RateLimiter::for_label_source("https://api.fda.gov");
        let url = Url::parse("https://api.fda.gov/drug/label.json?search=x").unwrap();

        let start = Instant::now();
        limiter.wait_for_url(&url).await;
        limiter.wait_for_url(&url).await;

        assert!(
            start.elapsed() >= Duration::from_millis(200),
            "second label call should wait for the openFDA interval"
        );
    }

    #[tokio::test]
    async fn unknown_origins_use_short_default_interval() {
        let limiter = RateLimiter::new(Vec::new(), Duration::from_millis(80));
        let url = Url::parse("https://unknown.example.org/path").unwrap();

        let start = Instant::now();
        limiter.wait_for_url(&url).await;
        limiter.wait_for_url(&url).await;

        assert!(start.elapsed() >= Duration::from_millis(65));
    }

    #[test]
    fn label_base_resolves_to_openfda_policy() {
        let limiter = RateLimiter::for_label_source("https://api.fda.gov/");
        let key = limiter
            .resolve_key_for_str("https://api.fda.gov/drug/label.json")
            .unwrap();
        assert_eq!(key, "policy:openfda");

        let other = limiter
            .resolve_key_for_str("https://api.groq.com/openai/v1/chat/completions")
            .unwrap();
        assert_eq!(other, "default:https://api.groq.com");
    }
}
