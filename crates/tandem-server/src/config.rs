//! Runtime knobs for a [`Server`](crate::Server).
//!
//! # Example
//!
//! ```rust
//! use tandem_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .shutdown_grace(Duration::from_secs(3))
//!     .max_body_bytes(64 * 1024)
//!     .build();
//!
//! assert_eq!(config.shutdown_grace(), Duration::from_secs(3));
//! assert_eq!(config.health_path(), Some("/healthz"));
//! ```

use std::time::Duration;

/// Default grace period granted to each sub-server on stop, in seconds.
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;

/// Default bound on how long each sub-server may take to become ready.
pub const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 5;

/// Default deadline attached to gateway calls without a `grpc-timeout`.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default gateway request body limit (4 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Default health route on the gateway listener.
pub const DEFAULT_HEALTH_PATH: &str = "/healthz";

/// Default TLS server name the loopback client verifies.
pub const DEFAULT_TLS_SERVER_NAME: &str = "localhost";

/// Server runtime configuration.
///
/// Use [`ServerConfig::builder()`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// How long each sub-server may drain before it is forced closed.
    shutdown_grace: Duration,

    /// How long each sub-server may take to report ready during start.
    startup_timeout: Duration,

    /// Deadline applied to translated calls that carry none.
    request_timeout: Duration,

    /// Largest accepted gateway request body.
    max_body_bytes: usize,

    /// Health route, or `None` when the health check is disabled.
    health_path: Option<String>,

    /// Name the loopback TLS client expects on the certificate.
    tls_server_name: String,
}

impl ServerConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the per-sub-server drain grace period.
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace
    }

    /// Returns the readiness timeout used during start.
    #[must_use]
    pub fn startup_timeout(&self) -> Duration {
        self.startup_timeout
    }

    /// Returns the default gateway request deadline.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the gateway body size limit in bytes.
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Returns the health route, if enabled.
    #[must_use]
    pub fn health_path(&self) -> Option<&str> {
        self.health_path.as_deref()
    }

    /// Returns the TLS server name used by the loopback client.
    #[must_use]
    pub fn tls_server_name(&self) -> &str {
        &self.tls_server_name
    }

    pub(crate) fn set_health_path(&mut self, path: Option<String>) {
        self.health_path = path;
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    shutdown_grace: Duration,
    startup_timeout: Duration,
    request_timeout: Duration,
    max_body_bytes: usize,
    health_path: Option<String>,
    tls_server_name: String,
}

impl ServerConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
            startup_timeout: Duration::from_secs(DEFAULT_STARTUP_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            health_path: Some(DEFAULT_HEALTH_PATH.to_string()),
            tls_server_name: DEFAULT_TLS_SERVER_NAME.to_string(),
        }
    }

    /// Sets the drain grace period granted to each sub-server on stop.
    ///
    /// In-flight work still running when it elapses is cut off.
    #[must_use]
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Sets how long start waits for each sub-server to accept connections.
    #[must_use]
    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Sets the deadline for gateway calls that do not send `grpc-timeout`.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the largest gateway request body accepted, in bytes.
    #[must_use]
    pub fn max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    /// Sets the health route path.
    #[must_use]
    pub fn health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = Some(path.into());
        self
    }

    /// Disables the health route.
    #[must_use]
    pub fn without_health_check(mut self) -> Self {
        self.health_path = None;
        self
    }

    /// Sets the server name the loopback client verifies under TLS.
    #[must_use]
    pub fn tls_server_name(mut self, name: impl Into<String>) -> Self {
        self.tls_server_name = name.into();
        self
    }

    /// Builds the [`ServerConfig`].
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            shutdown_grace: self.shutdown_grace,
            startup_timeout: self.startup_timeout,
            request_timeout: self.request_timeout,
            max_body_bytes: self.max_body_bytes,
            health_path: self.health_path,
            tls_server_name: self.tls_server_name,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(
            config.shutdown_grace(),
            Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS)
        );
        assert_eq!(
            config.startup_timeout(),
            Duration::from_secs(DEFAULT_STARTUP_TIMEOUT_SECS)
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_body_bytes(), 4 * 1024 * 1024);
        assert_eq!(config.health_path(), Some("/healthz"));
        assert_eq!(config.tls_server_name(), "localhost");
    }

    #[test]
    fn test_builder_chaining() {
        let config = ServerConfig::builder()
            .shutdown_grace(Duration::from_millis(250))
            .startup_timeout(Duration::from_secs(1))
            .request_timeout(Duration::from_secs(2))
            .max_body_bytes(1024)
            .health_path("/livez")
            .tls_server_name("frontend.internal")
            .build();

        assert_eq!(config.shutdown_grace(), Duration::from_millis(250));
        assert_eq!(config.startup_timeout(), Duration::from_secs(1));
        assert_eq!(config.request_timeout(), Duration::from_secs(2));
        assert_eq!(config.max_body_bytes(), 1024);
        assert_eq!(config.health_path(), Some("/livez"));
        assert_eq!(config.tls_server_name(), "frontend.internal");
    }

    #[test]
    fn test_without_health_check() {
        let config = ServerConfig::builder().without_health_check().build();
        assert!(config.health_path().is_none());
    }
}
