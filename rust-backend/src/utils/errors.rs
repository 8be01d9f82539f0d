// src/utils/errors.rs

use std::{error::Error, fmt};

use actix_web::{http::StatusCode, HttpResponse, ResponseError};

use crate::utils::types::ErrorBody;

/// Errors coming from external API calls (HTTP, JSON).
#[derive(Debug)]
pub enum ApiError {
    Http(reqwest::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Http(e) => write!(f, "HTTP error: {}", e),
            ApiError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ApiError::Http(e) => Some(e),
            ApiError::Json(e) => Some(e),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self { ApiError::Http(err) }
}
impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self { ApiError::Json(err) }
}

/// Failures of the kline fetcher.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    /// Provider answered with a non-OK status; carries its raw status and body.
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("transport: {0}")]
    Transport(#[from] ApiError),
    #[error("malformed kline payload: {0}")]
    Malformed(String),
}

/// Weight loading and forward-pass failures.
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing tensor `{0}`")]
    MissingTensor(String),
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

/// Everything a `/inference` request can end with, besides a price.
///
/// The `Display` text is what lands in the `"error"` field of the response.
#[derive(thiserror::Error, Debug)]
pub enum InferenceError {
    #[error("Model is not available")]
    ModelUnavailable,
    #[error("Unsupported token")]
    UnsupportedToken(String),
    #[error("Failed to retrieve data from Binance API")]
    UpstreamFetchFailure { status: u16, body: String },
    #[error("Inference failed")]
    ShapeMismatch(String),
}

impl From<FetchError> for InferenceError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Upstream { status, body } => {
                InferenceError::UpstreamFetchFailure { status, body }
            }
            other => InferenceError::UpstreamFetchFailure {
                status: StatusCode::BAD_GATEWAY.as_u16(),
                body: other.to_string(),
            },
        }
    }
}

impl From<ModelError> for InferenceError {
    fn from(err: ModelError) -> Self { InferenceError::ShapeMismatch(err.to_string()) }
}

impl ResponseError for InferenceError {
    fn status_code(&self) -> StatusCode {
        match self {
            InferenceError::ModelUnavailable      => StatusCode::INTERNAL_SERVER_ERROR,
            InferenceError::UnsupportedToken(_)   => StatusCode::BAD_REQUEST,
            InferenceError::UpstreamFetchFailure { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            InferenceError::ShapeMismatch(_)      => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let details = match self {
            InferenceError::UpstreamFetchFailure { body, .. } => Some(body.clone()),
            InferenceError::ShapeMismatch(msg) => Some(msg.clone()),
            _ => None,
        };
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_is_mirrored() {
        let e = InferenceError::UpstreamFetchFailure { status: 503, body: "rate limited".into() };
        assert_eq!(e.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn nonsense_upstream_status_becomes_bad_gateway() {
        let e = InferenceError::UpstreamFetchFailure { status: 42, body: String::new() };
        assert_eq!(e.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn malformed_payload_maps_to_bad_gateway() {
        let e: InferenceError = FetchError::Malformed("row 3".into()).into();
        match e {
            InferenceError::UpstreamFetchFailure { status, body } => {
                assert_eq!(status, 502);
                assert!(body.contains("row 3"));
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn caller_facing_messages() {
        assert_eq!(InferenceError::ModelUnavailable.to_string(), "Model is not available");
        assert_eq!(InferenceError::UnsupportedToken("DOGE".into()).to_string(), "Unsupported token");
    }
}
