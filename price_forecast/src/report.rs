//! Plain success/failure records for the presentation layer

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Serialisable outcome of an operation; check `success` before reading
/// `payload`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome<T> {
    pub success: bool,
    /// Error message on failure
    pub error: Option<String>,
    /// Error kind on failure, e.g. `InsufficientDataError`
    pub error_kind: Option<String>,
    pub payload: Option<T>,
}

impl<T> Outcome<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            success: true,
            error: None,
            error_kind: None,
            payload: Some(payload),
        }
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(payload) => Outcome::ok(payload),
            Err(err) => Self {
                success: false,
                error: Some(err.to_string()),
                error_kind: Some(err.kind().to_string()),
                payload: None,
            },
        }
    }
}
