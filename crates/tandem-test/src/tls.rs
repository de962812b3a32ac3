//! TLS test material.
//!
//! `testdata/` holds a test CA and a P-256 leaf certificate for `localhost`
//! and `127.0.0.1`, signed by that CA.

use tandem_server::TlsMaterial;

/// PEM of the CA that signed [`SERVER_CERT_PEM`].
pub const CA_CERT_PEM: &[u8] = include_bytes!("../testdata/ca.crt");

/// PEM leaf certificate for `localhost`.
pub const SERVER_CERT_PEM: &[u8] = include_bytes!("../testdata/server.crt");

/// PEM PKCS#8 key of [`SERVER_CERT_PEM`].
pub const SERVER_KEY_PEM: &[u8] = include_bytes!("../testdata/server.key");

/// Name the leaf certificate is issued for.
pub const SERVER_NAME: &str = "localhost";

/// Server material whose loopback client trusts the test CA.
#[must_use]
pub fn server_tls() -> TlsMaterial {
    TlsMaterial::from_pem(SERVER_CERT_PEM, SERVER_KEY_PEM).with_ca_pem(CA_CERT_PEM)
}

/// A `reqwest` client that trusts the test CA.
pub fn https_client() -> reqwest::Result<reqwest::Client> {
    let ca = reqwest::Certificate::from_pem(CA_CERT_PEM)?;
    reqwest::Client::builder()
        .add_root_certificate(ca)
        .use_rustls_tls()
        .timeout(std::time::Duration::from_secs(10))
        .build()
}

/// Client TLS settings for a tonic channel that trusts the test CA.
#[must_use]
pub fn grpc_client_tls() -> tonic::transport::ClientTlsConfig {
    tonic::transport::ClientTlsConfig::new()
        .ca_certificate(tonic::transport::Certificate::from_pem(CA_CERT_PEM))
        .domain_name(SERVER_NAME)
}
