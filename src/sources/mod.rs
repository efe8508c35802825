//! Upstream clients (openFDA labels, chat-completion providers) and shared
//! HTTP plumbing.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderValue;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use tracing::warn;

use crate::config::LabelSourceConfig;
use crate::error::PharmaError;

pub(crate) mod chat_completion;
pub(crate) mod openfda;
pub(crate) mod rate_limit;

const ERROR_BODY_MAX_BYTES: usize = 2048;
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

const USER_AGENT: &str = concat!("pharmaref/", env!("CARGO_PKG_VERSION"));

/// Builds the label-source client: bounded timeout, one retry on transient
/// errors, and per-origin request spacing.
pub(crate) fn label_http_client(
    config: &LabelSourceConfig,
) -> Result<ClientWithMiddleware, PharmaError> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.timeout())
        .connect_timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT);
    if config.ipv4_only {
        builder = builder.local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }
    if config.accept_invalid_certs {
        warn!("Label source TLS certificate validation is disabled");
        builder = builder.danger_accept_invalid_certs(true);
    }
    let base_client = builder.build().map_err(PharmaError::HttpClientInit)?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(1);
    let limiter = Arc::new(rate_limit::RateLimiter::for_label_source(&config.base_url));

    Ok(ClientBuilder::new(base_client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .with(rate_limit::RateLimitMiddleware::new(limiter))
        .build())
}

/// Client for chat-completion providers.
///
/// No retry middleware: a failing provider falls through to the next one
/// instead of being retried.
pub(crate) fn ai_http_client(timeout: Duration) -> Result<reqwest::Client, PharmaError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT)
        .build()
        .map_err(PharmaError::HttpClientInit)
}

pub(crate) fn body_excerpt(bytes: &[u8]) -> String {
    let full = String::from_utf8_lossy(bytes);

    let truncated: &str = if full.len() > ERROR_BODY_MAX_BYTES {
        let mut end = ERROR_BODY_MAX_BYTES;
        while end > 0 && !full.is_char_boundary(end) {
            end -= 1;
        }
        &full[..end]
    } else {
        full.as_ref()
    };

    let mut s = truncated.trim().replace(['\n', '\r', '\t'], " ");
    if full.len() > ERROR_BODY_MAX_BYTES {
        s.push_str(" …");
    }
    s
}

pub(crate) fn ensure_json_content_type(
    api: &str,
    content_type: Option<&HeaderValue>,
    body: &[u8],
) -> Result<(), PharmaError> {
    let Some(content_type) = content_type else {
        return Ok(());
    };

    let raw = match content_type.to_str() {
        Ok(v) => v.trim(),
        Err(_) => {
            warn!(
                source = api,
                "Response content-type header was not valid UTF-8; attempting JSON parse"
            );
            return Ok(());
        }
    };
    if raw.is_empty() {
        return Ok(());
    }

    let media_type = raw
        .split(';')
        .next()
        .map(str::trim)
        .unwrap_or_default()
        .to_ascii_lowercase();
    if matches!(media_type.as_str(), "text/html" | "application/xhtml+xml") {
        return Err(PharmaError::Api {
            api: api.to_string(),
            message: format!(
                "Unexpected HTML response (content-type: {raw}): {}",
                body_excerpt(body)
            ),
        });
    }

    Ok(())
}

pub(crate) async fn read_limited_body(
    mut resp: reqwest::Response,
    api: &str,
) -> Result<Vec<u8>, PharmaError> {
    let mut body: Vec<u8> = Vec::new();

    while let Some(chunk) = resp.chunk().await? {
        let next_len = body.len().saturating_add(chunk.len());
        if next_len > DEFAULT_MAX_BODY_BYTES {
            return Err(PharmaError::Api {
                api: api.to_string(),
                message: format!("Response body exceeded {DEFAULT_MAX_BODY_BYTES} bytes"),
            });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_json_content_type_rejects_html() {
        let err = ensure_json_content_type(
            "openfda",
            Some(&HeaderValue::from_static("text/html; charset=utf-8")),
            b"<html><body>gateway timeout</body></html>",
        )
        .expect_err("html should be rejected");
        let msg = err.to_string();
        assert!(msg.contains("openfda"));
        assert!(msg.contains("HTML"));
    }

    #[test]
    fn ensure_json_content_type_accepts_json() {
        let ok = ensure_json_content_type(
            "openfda",
            Some(&HeaderValue::from_static("application/json; charset=utf-8")),
            b"{\"results\":[]}",
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn body_excerpt_flattens_and_truncates() {
        let long = "x\n".repeat(ERROR_BODY_MAX_BYTES);
        let excerpt = body_excerpt(long.as_bytes());
        assert!(!excerpt.contains('\n'));
        assert!(excerpt.ends_with('…'));
    }

    #[test]
    fn label_client_builds_with_default_config() {
        let client = label_http_client(&LabelSourceConfig::default());
        assert!(client.is_ok());
    }
}
