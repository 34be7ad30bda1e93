//! Error types for plugin authors

use thiserror::Error;

/// Errors that plugin hooks can return
#[derive(Error, Debug)]
pub enum PluginError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The hook declined the transition without a more specific cause
    #[error("Hook declined: {0}")]
    Declined(String),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(String),
}

impl PluginError {
    /// Create a custom error with a message
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Signal that a hook refuses the transition
    pub fn declined(message: impl Into<String>) -> Self {
        Self::Declined(message.into())
    }
}

impl From<serde_json::Error> for PluginError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
