use std::time::{Duration, Instant};

use futures::future::join_all;

use crate::ai::ChatProvider;
use crate::config::AppConfig;
use crate::error::PharmaError;
use crate::sources::chat_completion::ChatCompletionClient;

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthRow {
    pub api: String,
    pub status: String,
    pub latency: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub healthy: usize,
    pub total: usize,
    pub rows: Vec<HealthRow>,
}

impl HealthReport {
    pub fn all_healthy(&self) -> bool {
        self.healthy == self.total
    }

    pub fn to_table(&self) -> String {
        let mut out = String::new();
        out.push_str("# pharmaref upstream check\n\n");
        out.push_str("| Upstream | Status | Latency |\n");
        out.push_str("|----------|--------|---------|\n");
        for row in &self.rows {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                row.api, row.status, row.latency
            ));
        }
        out.push_str(&format!(
            "\nStatus: {}/{} upstreams reachable\n",
            self.healthy, self.total
        ));
        out
    }
}

fn row(api: &str, status: &str, latency: String) -> HealthRow {
    HealthRow {
        api: api.to_string(),
        status: status.to_string(),
        latency,
    }
}

async fn check_one(
    client: &reqwest::Client,
    api: &str,
    url: &str,
    bearer: Option<&str>,
) -> HealthRow {
    let start = Instant::now();
    let mut request = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json");
    if let Some(key) = bearer {
        request = request.bearer_auth(key);
    }

    match request.send().await {
        Ok(resp) => {
            let status = resp.status();
            let elapsed = start.elapsed().as_millis();
            if status.is_success() {
                row(api, "ok", format!("{elapsed}ms"))
            } else {
                row(api, "error", format!("{elapsed}ms (HTTP {})", status.as_u16()))
            }
        }
        Err(err) => {
            let reason = if err.is_timeout() {
                "timeout"
            } else if err.is_connect() {
                "connect"
            } else {
                "error"
            };
            row(api, "error", reason.into())
        }
    }
}

fn health_http_client() -> Result<reqwest::Client, PharmaError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .user_agent(concat!("pharmaref/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(PharmaError::HttpClientInit)
}

/// Checks the label database and every configured AI provider. A provider
/// without its API key is reported without a request.
///
/// # Errors
///
/// Returns an error when the health-check HTTP client cannot be created.
pub async fn check(config: &AppConfig) -> Result<HealthReport, PharmaError> {
    let client = health_http_client()?;
    let label_url = format!(
        "{}/drug/label.json?limit=1",
        config.label.base_url.trim_end_matches('/')
    );
    let providers = config
        .ai
        .providers
        .iter()
        .map(|p| ChatCompletionClient::new(p, client.clone()))
        .collect::<Vec<_>>();

    let label_check = check_one(&client, "openFDA labels", &label_url, None);
    let provider_checks = providers.iter().map(|provider| {
        let client = &client;
        async move {
            match provider.api_key() {
                Some(key) => check_one(client, provider.name(), &provider.models_url(), Some(key)).await,
                None => row(provider.name(), "error", "no API key".into()),
            }
        }
    });
    let (label, provider_rows) = tokio::join!(label_check, join_all(provider_checks));

    let mut rows = vec![label];
    rows.extend(provider_rows);
    let healthy = rows.iter().filter(|r| r.status == "ok").count();
    Ok(HealthReport {
        healthy,
        total: rows.len(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn reports_label_and_provider_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/drug/label.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .and(header("authorization", "Bearer sk-health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        // SAFETY: test-only env var with a name no other test reads.
        unsafe { std::env::set_var("PHARMAREF_HEALTH_TEST_KEY", "sk-health") };
        let mut config = AppConfig::default();
        config.label.base_url = server.uri();
        config.ai.providers = vec![
            ProviderConfig {
                name: "keyed".into(),
                base_url: format!("{}/v1", server.uri()),
                model: "m".into(),
                api_key_env: "PHARMAREF_HEALTH_TEST_KEY".into(),
            },
            ProviderConfig {
                name: "keyless".into(),
                base_url: format!("{}/v1", server.uri()),
                model: "m".into(),
                api_key_env: "PHARMAREF_HEALTH_TEST_MISSING_KEY".into(),
            },
        ];

        let report = check(&config).await.unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.healthy, 2);
        assert!(!report.all_healthy());
        assert_eq!(report.rows[2].latency, "no API key");
        assert!(report.to_table().contains("2/3 upstreams reachable"));
    }
}
