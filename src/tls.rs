//! TLS acceptor construction.
//!
//! Loads PEM material named in the configuration and builds a
//! [`TlsAcceptor`]. When a client-CA bundle is configured, client
//! certificates are required and validated against it; a peer failing
//! validation is rejected during the handshake, before any EPP frame is
//! exchanged.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::RootCertStore;
use tokio_rustls::TlsAcceptor;

use crate::config::ServerConfig;
use crate::error::{EppError, Result};

/// Build the acceptor for a server configured with `proto = ssl`.
pub fn build_acceptor(config: &ServerConfig) -> Result<TlsAcceptor> {
    let cert_path = config.ssl_cert_file.as_deref().ok_or_else(|| {
        EppError::Config("SSL_cert_file is required when proto is ssl".to_string())
    })?;
    let key_path = config.ssl_key_file.as_deref().ok_or_else(|| {
        EppError::Config("SSL_key_file is required when proto is ssl".to_string())
    })?;

    let certs = load_certs(cert_path)?;
    let key = load_key(key_path)?;

    let builder = rustls::ServerConfig::builder();
    let tls_config = match config.client_ca_file.as_deref() {
        Some(ca_path) => {
            let mut roots = RootCertStore::empty();
            for cert in load_certs(ca_path)? {
                roots.add(cert)?;
            }
            let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
                .build()
                .map_err(|e| EppError::Config(format!("client CA bundle unusable: {e}")))?;
            builder
                .with_client_cert_verifier(verifier)
                .with_single_cert(certs, key)?
        }
        None => builder.with_no_client_auth().with_single_cert(certs, key)?,
    };

    Ok(TlsAcceptor::from(Arc::new(tls_config)))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(File::open(path)?);
    let certs = rustls_pemfile::certs(&mut reader).collect::<std::io::Result<Vec<_>>>()?;
    if certs.is_empty() {
        return Err(EppError::Config(format!(
            "no certificates found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let mut reader = BufReader::new(File::open(path)?);
    rustls_pemfile::private_key(&mut reader)?.ok_or_else(|| {
        EppError::Config(format!("no private key found in {}", path.display()))
    })
}
