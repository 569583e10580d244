//! Application error type

use thiserror::Error;

/// Failure cases the rest of the crate branches on. Everything else is
/// carried as `anyhow::Error` with context attached at the call site.
#[derive(Error, Debug)]
pub enum WayfarerError {
    /// Bad or missing configuration, detected at load time
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller-supplied input rejected at the boundary
    #[error("Invalid input: {0}")]
    Validation(String),

    /// An external service answered with an unusable response
    #[error("External API error: {0}")]
    Api(String),

    /// The trip database rejected a read or write
    #[error("Trip storage error: {0}")]
    Store(String),
}

impl WayfarerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn api(message: impl Into<String>) -> Self {
        Self::Api(message.into())
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }
}
