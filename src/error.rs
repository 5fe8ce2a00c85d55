//! Error types for epp-server.

use thiserror::Error;

use crate::protocol::wire::FramingError;

/// Main error type for server setup and connection handling.
#[derive(Debug, Error)]
pub enum EppError {
    /// I/O error on the listener or a connection stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire framing violation (truncated header, bad length).
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// XML handling error while building or serializing a frame.
    #[error("XML error: {0}")]
    Xml(#[from] minidom::Error),

    /// TLS configuration or handshake error.
    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    /// Invalid server configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias using EppError.
pub type Result<T> = std::result::Result<T, EppError>;
