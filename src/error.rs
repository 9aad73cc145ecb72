//! Console error taxonomy
//!
//! - local validation (empty path/query): raised before any network call
//! - transport/HTTP errors: surfaced verbatim, never retried
//! - 401 anywhere: [`ConsoleError::LoginRequired`], handled as a redirect
//! - domain validation errors from the registry: itemized, recoverable

use policy_registry_client::ClientError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConsoleError>;

#[derive(Debug, Error)]
pub enum ConsoleError {
    /// Input rejected locally, no request was sent
    #[error("{0}")]
    LocalValidation(String),

    /// Missing or rejected credential
    #[error("login required")]
    LoginRequired,

    /// The registry's validator rejected the draft
    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationFailed(Vec<String>),

    /// The query service answered with `success: false`
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("no policy form is open")]
    FormClosed,

    #[error(transparent)]
    Client(ClientError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsoleError {
    pub fn is_login_required(&self) -> bool {
        matches!(self, Self::LoginRequired)
    }
}

/// 401 is never an inline error; everything else keeps its text.
impl From<ClientError> for ConsoleError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Unauthorized => ConsoleError::LoginRequired,
            other => ConsoleError::Client(other),
        }
    }
}
