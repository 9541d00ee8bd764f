use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("{0}")]
    Port(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Operation already in flight: {0}")]
    Busy(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DashError {
    /// Shorthand for a Data Access Port failure.
    pub fn port(message: impl Into<String>) -> Self {
        DashError::Port(message.into())
    }

    /// Plain string stored in UI-facing `error` fields.
    pub fn message(&self) -> String {
        let text = self.to_string();
        if text.trim().is_empty() {
            "Unexpected error".to_string()
        } else {
            text
        }
    }
}

pub type Result<T> = std::result::Result<T, DashError>;
