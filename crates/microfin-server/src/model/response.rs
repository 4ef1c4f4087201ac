//! HTTP response types for the microfin server
//!
//! Successful calls are wrapped in `Result<T>`; every denial and failure is
//! rendered as an `ErrorResult`.

use actix_web::{HttpResponse, HttpResponseBuilder, http::StatusCode};
use serde::{Deserialize, Serialize};

use microfin_auth::{AdminError, AuthError};

/// Generic result wrapper for API responses
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Result<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
}

impl<T> Result<T> {
    pub fn new(code: i32, message: String, data: T) -> Self {
        Result::<T> {
            code,
            message,
            data,
        }
    }

    pub fn success(data: T) -> Result<T> {
        Result::<T> {
            code: microfin_common::error::SUCCESS.code,
            message: microfin_common::error::SUCCESS.message.to_string(),
            data,
        }
    }

    pub fn http_success(data: impl Serialize) -> HttpResponse {
        HttpResponse::Ok().json(Result::success(data))
    }

    pub fn http_created(data: impl Serialize) -> HttpResponse {
        HttpResponse::Created().json(Result::success(data))
    }
}

/// Error result for API error responses
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResult {
    pub timestamp: String,
    pub status: u16,
    pub error: String,
    /// Stable reason code, e.g. `MISSING_PERMISSION`
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_permissions: Option<Vec<String>>,
}

impl ErrorResult {
    pub fn new(status: u16, code: &str, message: String, path: &str) -> Self {
        ErrorResult {
            timestamp: chrono::Utc::now().to_rfc3339(),
            status,
            error: StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or_default()
                .to_string(),
            code: code.to_string(),
            message,
            path: path.to_string(),
            required_permissions: None,
        }
    }

    pub fn from_auth_error(err: &AuthError, path: &str) -> Self {
        let mut result = ErrorResult::new(err.status(), err.code(), err.to_string(), path);
        result.required_permissions = err.satisfying_permissions().map(|slugs| slugs.to_vec());
        result
    }

    pub fn from_admin_error(err: &AdminError, path: &str) -> Self {
        ErrorResult::new(err.status(), err.code(), err.to_string(), path)
    }

    pub fn http_response(&self) -> HttpResponse {
        HttpResponseBuilder::new(
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        )
        .json(self)
    }
}
