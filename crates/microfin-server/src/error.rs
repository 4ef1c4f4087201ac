// Error handling for the HTTP layer
// Maps typed domain errors carried inside anyhow::Error to JSON error responses

use std::fmt::{Display, Formatter};

use actix_web::HttpResponse;
use actix_web::http::StatusCode;

use microfin_auth::{AdminError, AuthError};
use microfin_common::MicrofinError;

use crate::model::response::ErrorResult;

/// Client-facing message for unclassified failures; details go to the log only
const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

// Local wrapper for application errors to implement actix-web error handling
// (Cannot impl foreign trait for foreign type due to orphan rules)
#[derive(Debug)]
pub struct AppError {
    inner: anyhow::Error,
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError { inner: value }
    }
}

impl From<AdminError> for AppError {
    fn from(value: AdminError) -> Self {
        AppError {
            inner: value.into(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(value: AuthError) -> Self {
        AppError {
            inner: value.into(),
        }
    }
}

impl AppError {
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    pub fn downcast_ref<E: std::error::Error + Send + Sync + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// Error body for this error, `path` empty when the request is unknown
    pub fn to_error_result(&self, path: &str) -> ErrorResult {
        if let Some(e) = self.downcast_ref::<AuthError>() {
            return ErrorResult::from_auth_error(e, path);
        }
        if let Some(e) = self.downcast_ref::<AdminError>() {
            return ErrorResult::from_admin_error(e, path);
        }
        if let Some(e) = self.downcast_ref::<MicrofinError>() {
            let (status, code) = match e {
                MicrofinError::InvalidRouteKey(_) => (400, "INVALID_ROUTE_KEY"),
                MicrofinError::ConfigError(_) => (500, "CONFIG_ERROR"),
            };
            return ErrorResult::new(status, code, e.to_string(), path);
        }

        ErrorResult::new(500, "SERVER_ERROR", INTERNAL_ERROR_MESSAGE.to_string(), path)
    }
}

impl actix_web::error::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.to_error_result("").status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let result = self.to_error_result("");
        if result.status >= 500 {
            tracing::error!("request failed: {:#}", self.inner);
        }
        result.http_response()
    }
}
