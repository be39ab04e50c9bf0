//! Unified application error model.
//! Every caller-facing operation returns `AppResult<T>`; the variants follow the
//! failure classes the access-control core distinguishes (bad credentials,
//! dead session, denied action, invalid input, persistence failure).

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::storage::StoreError;

/// Message shown for every failed login, whatever actually went wrong.
pub const INVALID_CREDENTIALS_MSG: &str = "Invalid username or password.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    Authentication { code: String, message: String },
    SessionExpired { code: String, message: String },
    Authorization { code: String, message: String },
    Validation { code: String, message: String },
    Store { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Authentication { code, .. }
            | AppError::SessionExpired { code, .. }
            | AppError::Authorization { code, .. }
            | AppError::Validation { code, .. }
            | AppError::Store { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Authentication { message, .. }
            | AppError::SessionExpired { message, .. }
            | AppError::Authorization { message, .. }
            | AppError::Validation { message, .. }
            | AppError::Store { message, .. } => message.as_str(),
        }
    }

    /// Login failure. Always the same code and text so callers cannot tell
    /// an unknown username from a wrong password.
    pub fn invalid_credentials() -> Self {
        AppError::Authentication { code: "invalid_credentials".into(), message: INVALID_CREDENTIALS_MSG.into() }
    }
    pub fn session_expired() -> Self {
        AppError::SessionExpired { code: "session_expired".into(), message: "Session expired after inactivity. Please log in again.".into() }
    }
    pub fn session_invalid() -> Self {
        AppError::SessionExpired { code: "session_invalid".into(), message: "No active session. Please log in.".into() }
    }
    pub fn access_denied() -> Self {
        AppError::Authorization { code: "access_denied".into(), message: "Access denied for your role.".into() }
    }
    pub fn validation<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Validation { code: code.into(), message: msg.into() } }
    pub fn store<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Store { code: code.into(), message: msg.into() } }

    pub fn is_validation(&self) -> bool { matches!(self, AppError::Validation { .. }) }
    pub fn is_authorization(&self) -> bool { matches!(self, AppError::Authorization { .. }) }
    pub fn is_session_expired(&self) -> bool { matches!(self, AppError::SessionExpired { .. }) }
    pub fn is_authentication(&self) -> bool { matches!(self, AppError::Authentication { .. }) }

    /// Process exit code used by the binaries.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Authentication { .. } => 2,
            AppError::SessionExpired { .. } => 3,
            AppError::Authorization { .. } => 4,
            AppError::Validation { .. } => 5,
            AppError::Store { .. } => 6,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            // unique-field collisions are input problems, not storage failures
            StoreError::Conflict { field, .. } => {
                AppError::validation(format!("{}_taken", field), format!("This {} is already registered.", field))
            }
            other => {
                tracing::error!(target: "crmdesk::store", error = %other, "record store failure");
                AppError::store("store_error", "A technical error occurred. Please try again later.")
            }
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
