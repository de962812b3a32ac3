//! Configuration section types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tandem_server::{
    DEFAULT_HEALTH_PATH, DEFAULT_MAX_BODY_BYTES, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_SHUTDOWN_GRACE_SECS, DEFAULT_STARTUP_TIMEOUT_SECS, DEFAULT_TLS_SERVER_NAME,
};
use tandem_telemetry::LogFormat;

/// Default gRPC port.
pub const DEFAULT_RPC_PORT: u16 = 50504;

/// Default gateway port.
pub const DEFAULT_GATEWAY_PORT: u16 = 51504;

/// `[server]`: listeners and runtime limits.
///
/// Ports of `0` ask the OS for an ephemeral port.
///
/// ```toml
/// [server]
/// rpc_port = 50504
/// gateway_port = 51504
/// bind_addr = "0.0.0.0"
/// shutdown_grace_ms = 10000
/// health_path = "/healthz"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// gRPC listener port.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// JSON/HTTP gateway listener port.
    #[serde(default = "default_gateway_port")]
    pub gateway_port: u16,

    /// Interface both listeners bind to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Drain period per sub-server on stop, in milliseconds.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    /// Readiness wait per sub-server on start, in milliseconds.
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,

    /// Deadline for gateway calls that carry none, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Largest accepted gateway request body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Whether the gateway serves a health route.
    #[serde(default = "default_true")]
    pub health_check: bool,

    /// Path of the health route.
    #[serde(default = "default_health_path")]
    pub health_path: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            rpc_port: default_rpc_port(),
            gateway_port: default_gateway_port(),
            bind_addr: default_bind_addr(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            startup_timeout_ms: default_startup_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            max_body_bytes: default_max_body_bytes(),
            health_check: true,
            health_path: default_health_path(),
        }
    }
}

fn default_rpc_port() -> u16 {
    DEFAULT_RPC_PORT
}

fn default_gateway_port() -> u16 {
    DEFAULT_GATEWAY_PORT
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_shutdown_grace_ms() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_SECS * 1000
}

fn default_startup_timeout_ms() -> u64 {
    DEFAULT_STARTUP_TIMEOUT_SECS * 1000
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS * 1000
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_health_path() -> String {
    DEFAULT_HEALTH_PATH.to_string()
}

fn default_true() -> bool {
    true
}

/// `[tls]`: certificate files for both transports.
///
/// TLS is enabled when both `cert_path` and `key_path` are set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TlsSection {
    /// PEM certificate chain, leaf first.
    #[serde(default)]
    pub cert_path: Option<PathBuf>,

    /// PEM private key.
    #[serde(default)]
    pub key_path: Option<PathBuf>,

    /// PEM CA bundle the gateway's loopback client trusts. Defaults to the
    /// certificate chain itself.
    #[serde(default)]
    pub ca_path: Option<PathBuf>,

    /// Name the loopback client expects on the certificate.
    #[serde(default = "default_server_name")]
    pub server_name: String,
}

impl Default for TlsSection {
    fn default() -> Self {
        Self {
            cert_path: None,
            key_path: None,
            ca_path: None,
            server_name: default_server_name(),
        }
    }
}

impl TlsSection {
    /// Returns `true` when certificate and key are both configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.cert_path.is_some() && self.key_path.is_some()
    }
}

fn default_server_name() -> String {
    DEFAULT_TLS_SERVER_NAME.to_string()
}

/// `[logging]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Whether a subscriber is installed at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `EnvFilter` directives, e.g. `info,tandem_server=debug`.
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format: `json`, `pretty` or `compact`.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
