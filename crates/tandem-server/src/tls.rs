//! Transport security material.
//!
//! A single [`TlsMaterial`] secures both listeners. The gateway's loopback
//! client trusts either an explicit CA bundle or, failing that, the served
//! certificate chain itself.

use std::path::PathBuf;
use std::sync::Arc;

use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use tokio_rustls::rustls;
use tokio_rustls::TlsAcceptor;
use tonic::transport::{Certificate, ClientTlsConfig};

use crate::error::ServerError;

#[derive(Debug, Clone)]
enum Source {
    Pem { cert: Vec<u8>, key: Vec<u8> },
    Files { cert: PathBuf, key: PathBuf },
}

/// Certificate chain and private key for both endpoints.
///
/// Files are not read until the server starts, so building parameters
/// performs no I/O.
#[derive(Debug, Clone)]
pub struct TlsMaterial {
    source: Source,
    ca_pem: Option<Vec<u8>>,
}

impl TlsMaterial {
    /// Uses in-memory PEM: a certificate chain (leaf first) and a private key.
    pub fn from_pem(cert_chain: impl Into<Vec<u8>>, private_key: impl Into<Vec<u8>>) -> Self {
        Self {
            source: Source::Pem {
                cert: cert_chain.into(),
                key: private_key.into(),
            },
            ca_pem: None,
        }
    }

    /// Uses PEM files read at start.
    pub fn from_files(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::Files {
                cert: cert_path.into(),
                key: key_path.into(),
            },
            ca_pem: None,
        }
    }

    /// Trust this CA bundle on the loopback connection instead of the chain.
    #[must_use]
    pub fn with_ca_pem(mut self, ca_pem: impl Into<Vec<u8>>) -> Self {
        self.ca_pem = Some(ca_pem.into());
        self
    }

    pub(crate) fn resolve(&self, server_name: &str) -> Result<ResolvedTls, ServerError> {
        let (cert_pem, key_pem) = match &self.source {
            Source::Pem { cert, key } => (cert.clone(), key.clone()),
            Source::Files { cert, key } => (read(cert)?, read(key)?),
        };

        let certs = CertificateDer::pem_slice_iter(&cert_pem)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ServerError::Tls(format!("certificate chain: {e}")))?;
        if certs.is_empty() {
            return Err(ServerError::Tls(
                "certificate chain contains no certificates".to_string(),
            ));
        }
        let key = PrivateKeyDer::from_pem_slice(&key_pem)
            .map_err(|e| ServerError::Tls(format!("private key: {e}")))?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut config = rustls::ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| ServerError::Tls(e.to_string()))?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| ServerError::Tls(e.to_string()))?;
        config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

        let trust = self.ca_pem.clone().unwrap_or(cert_pem);
        let client = ClientTlsConfig::new()
            .ca_certificate(Certificate::from_pem(trust))
            .domain_name(server_name);

        Ok(ResolvedTls {
            acceptor: TlsAcceptor::from(Arc::new(config)),
            client,
        })
    }
}

fn read(path: &PathBuf) -> Result<Vec<u8>, ServerError> {
    std::fs::read(path).map_err(|source| ServerError::TlsFile {
        path: path.clone(),
        source,
    })
}

/// TLS state built at start: the server-side acceptor and the matching
/// client settings for the loopback connection.
#[derive(Clone)]
pub(crate) struct ResolvedTls {
    pub(crate) acceptor: TlsAcceptor,
    pub(crate) client: ClientTlsConfig,
}

impl std::fmt::Debug for ResolvedTls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedTls").finish_non_exhaustive()
    }
}
