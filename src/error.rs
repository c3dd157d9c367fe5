// src/error.rs
use thiserror::Error;

/// Application level error type used throughout the crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    /// Transport failure, timeout or unexpected server status. Retryable.
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// The bearer credential was rejected; re-authenticate before retrying
    #[error("Authentication expired: {0}")]
    AuthExpired(String),

    /// Custom date range rejected locally, never reaches the network
    #[error("Validation error: {0}")]
    Validation(String),

    /// The server answered with a payload we could not interpret
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O related failure
    #[error("Io error: {0}")]
    Io(String),

    /// Error while parsing YAML configuration files
    #[error("YAML error: {0}")]
    Yaml(String),
}

/// Coarse classification surfaced to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NetworkFailure,
    AuthExpired,
    ValidationError,
    MalformedResponse,
    Config,
}

impl HistoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HistoryError::NetworkFailure(_) => ErrorKind::NetworkFailure,
            HistoryError::AuthExpired(_) => ErrorKind::AuthExpired,
            HistoryError::Validation(_) => ErrorKind::ValidationError,
            HistoryError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            HistoryError::Config(_) | HistoryError::Io(_) | HistoryError::Yaml(_) => {
                ErrorKind::Config
            }
        }
    }

    /// Whether a plain retry can succeed without outside intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HistoryError::NetworkFailure(_))
    }
}

impl From<std::io::Error> for HistoryError {
    fn from(err: std::io::Error) -> Self {
        HistoryError::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for HistoryError {
    fn from(err: serde_yaml::Error) -> Self {
        HistoryError::Yaml(err.to_string())
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(err: serde_json::Error) -> Self {
        HistoryError::MalformedResponse(err.to_string())
    }
}

/// Convenient alias over [`Result`] using [`HistoryError`]
pub type Result<T> = std::result::Result<T, HistoryError>;
