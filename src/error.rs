//! Error handling for ServerSage

use crate::panel_client::PanelError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Panel API failure (rate limit, gateway timeout, hard failure, network)
    #[error(transparent)]
    Panel(#[from] PanelError),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Config store error
    #[error("Store error: {0}")]
    Store(String),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// SQLx database error
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl Error {
    /// Panel failure behind this error, if any
    pub fn as_panel(&self) -> Option<&PanelError> {
        match self {
            Error::Panel(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the failure is a temporary block worth retrying later
    pub fn is_transient(&self) -> bool {
        self.as_panel().is_some_and(PanelError::is_transient)
    }
}
