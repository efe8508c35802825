use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum PharmaError {
    #[error("HTTP client initialization failed: {0}")]
    HttpClientInit(reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP middleware error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    #[error("API error from {api}: {message}")]
    Api { api: String, message: String },

    #[error("API JSON error from {api}: {source}")]
    ApiJson {
        api: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("API key required: {api} requires the {env_var} environment variable.")]
    ApiKeyRequired { api: String, env_var: String },

    #[error("{api} did not answer within {secs}s")]
    Timeout { api: String, secs: u64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PharmaError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::HttpClientInit(_) => "HTTP_CLIENT_INIT",
            Self::Http(_) | Self::HttpMiddleware(_) => "UPSTREAM_UNAVAILABLE",
            Self::Api { .. } | Self::ApiJson { .. } => "UPSTREAM_ERROR",
            Self::ApiKeyRequired { .. } => "API_KEY_REQUIRED",
            Self::Timeout { .. } => "UPSTREAM_TIMEOUT",
            Self::InvalidArgument(_) => "BAD_REQUEST",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Template(_) => "TEMPLATE_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Io(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for PharmaError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::PharmaError;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn api_key_required_display_includes_env_var() {
        let err = PharmaError::ApiKeyRequired {
            api: "groq".to_string(),
            env_var: "GROQ_API_KEY".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("groq"));
        assert!(msg.contains("GROQ_API_KEY"));
    }

    #[test]
    fn api_error_display_includes_api_name() {
        let err = PharmaError::Api {
            api: "openfda".to_string(),
            message: "HTTP 500".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("openfda"));
        assert!(msg.contains("HTTP 500"));
    }

    #[test]
    fn invalid_argument_maps_to_bad_request() {
        let resp = PharmaError::InvalidArgument("body is not JSON".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unexpected_faults_map_to_internal_error() {
        let resp = PharmaError::Internal("boom".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
