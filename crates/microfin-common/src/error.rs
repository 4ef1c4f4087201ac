//! Error types and error codes for Microfin
//!
//! This module defines:
//! - `MicrofinError`: Application-specific error enum
//! - `ErrorCode`: Structured codes for the success envelope

use serde::{Deserialize, Serialize};

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum MicrofinError {
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("invalid route key: {0}")]
    InvalidRouteKey(String),
}

/// Error code structure for API responses
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

pub const SUCCESS: ErrorCode<'static> = ErrorCode {
    code: 0,
    message: "success",
};
