//! Error types for plugin authors

use thiserror::Error;

/// Errors that plugins can return from handlers and factories
#[derive(Error, Debug)]
pub enum PluginError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Custom error with message
    #[error("{0}")]
    Custom(String),

    /// Event payload did not have the expected shape
    #[error("Unexpected payload for event {event_type}: {message}")]
    UnexpectedPayload { event_type: String, message: String },
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
}
