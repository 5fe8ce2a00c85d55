//! Server configuration.
//!
//! Options mirror the classic EPP server knobs: network binding, TLS
//! material, optional client-certificate CA bundle, and the idle timeout
//! bounding each frame read. The struct deserializes from any serde format
//! an embedder prefers; the TLS file keys keep their conventional
//! `SSL_key_file` / `SSL_cert_file` spelling.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Transport to accept connections over.
///
/// `ssl` is the production transport (RFC 5734). `tcp` skips TLS and is
/// only sensible for local testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Proto {
    #[default]
    Ssl,
    Tcp,
}

/// Configuration for [`Server`](crate::server::Server).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Transport protocol.
    pub proto: Proto,
    /// PEM file with the server's private key. Required when `proto` is
    /// `ssl`.
    #[serde(rename = "SSL_key_file")]
    pub ssl_key_file: Option<PathBuf>,
    /// PEM file with the server's certificate chain. Required when `proto`
    /// is `ssl`.
    #[serde(rename = "SSL_cert_file")]
    pub ssl_cert_file: Option<PathBuf>,
    /// PEM CA bundle for validating client certificates. When absent,
    /// client certificates are not requested.
    pub client_ca_file: Option<PathBuf>,
    /// Seconds a session may sit idle between frames before the server
    /// closes it.
    pub timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 7000,
            proto: Proto::default(),
            ssl_key_file: None,
            ssl_cert_file: None,
            client_ca_file: None,
            timeout: 300,
        }
    }
}

impl ServerConfig {
    /// `host:port` bind address.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The idle timeout as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}
