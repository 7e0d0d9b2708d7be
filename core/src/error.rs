//! Error types for the Gophish API client.
//!
//! # Design
//! Only operations that "fail loudly" return `Err`: lookups, import helpers,
//! the campaign by-id helpers and any transport failure. Validation problems
//! and server-rejected writes are not errors at this level; `save` and
//! `destroy` return `Ok(false)` and leave messages in the resource's
//! [`Errors`](crate::validation::Errors) collection instead.

use thiserror::Error;

/// Errors returned by client and resource operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A lookup returned something other than 200.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The server returned an unexpected status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// A request payload or attribute snapshot could not be serialized.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// Target CSV could not be parsed.
    #[error("CSV parse failed: {0}")]
    Csv(#[from] csv::Error),

    /// The resource was destroyed and can no longer change.
    #[error("resource has been destroyed and is frozen")]
    Frozen,

    /// The operation needs a server-assigned id.
    #[error("resource has not been persisted")]
    NotPersisted,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}
