//! Error types for sofablend-server.

use thiserror::Error;

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors raised by the stream server and client.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("unable to listen on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// A message body is not valid UTF-8.
    #[error("message is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// A message could not be decoded or applied.
    #[error(transparent)]
    Payload(#[from] sofablend_io::Error),

    /// A message could not be encoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The shared scene lock was poisoned by a panicking writer.
    #[error("live scene lock poisoned")]
    Poisoned,

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
