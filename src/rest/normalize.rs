//! Uniform handling of REST responses.
//!
//! Every resource call ends in one of three outcomes: `None` (transport
//! failure or non-200 status, both logged), structured JSON, or the raw body
//! text when a 200 answer is not JSON (some mutation endpoints confirm with
//! plain text).

use serde_json::Value;
use tracing::{debug, error};

use crate::error::NetworkError;
use crate::traits::{HttpError, Response};

/// Successful REST result.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Json(Value),
    Text(String),
}

impl ApiResponse {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiResponse::Json(value) => Some(value),
            ApiResponse::Text(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            ApiResponse::Json(value) => Some(value),
            ApiResponse::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ApiResponse::Text(text) => Some(text),
            ApiResponse::Json(_) => None,
        }
    }
}

impl std::fmt::Display for ApiResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiResponse::Json(value) => write!(f, "{}", value),
            ApiResponse::Text(text) => f.write_str(text),
        }
    }
}

/// Normalize the outcome of a request to `path`.
///
/// `path` is only used for logging and should include the query string.
pub fn check_result(path: &str, result: Result<Response, HttpError>) -> Option<ApiResponse> {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            let err = NetworkError::from(&e);
            error!(
                code = err.error_code(),
                "Request to {} failed (timeout/transport): {}", path, err
            );
            return None;
        }
    };

    let body = response.text_lossy();
    if !response.is_ok() {
        let err = NetworkError::HttpStatus {
            status: response.status,
            path: path.to_string(),
            body,
        };
        error!(code = err.error_code(), "Request failed: {}", err);
        return None;
    }

    debug!("Request: {}", path);
    debug!("Response: {}", body);
    match serde_json::from_str::<Value>(&body) {
        Ok(value) => Some(ApiResponse::Json(value)),
        Err(_) => Some(ApiResponse::Text(body)),
    }
}
