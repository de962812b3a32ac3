//! The root [`HarnessConfig`] and its conversions into runtime types.

use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tandem_server::{ServerConfig, TlsMaterial};
use tandem_telemetry::{create_env_filter, LogConfig};

use crate::{ConfigError, LoggingSection, ServerSection, TlsSection};

/// Process-level configuration of a Tandem server.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to layer it from defaults, a
/// file and the environment.
///
/// # Example
///
/// ```
/// use tandem_config::HarnessConfig;
///
/// let config = HarnessConfig::default();
/// assert_eq!(config.server.rpc_port, 50504);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Listeners and runtime limits.
    #[serde(default)]
    pub server: ServerSection,

    /// Transport security.
    #[serde(default)]
    pub tls: TlsSection,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl HarnessConfig {
    /// Checks values that deserialize fine but cannot be served.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;

        let server = &self.server;
        if server.rpc_port != 0 && server.rpc_port == server.gateway_port {
            return Err(ConfigError::invalid_value(
                "server.gateway_port",
                format!("must differ from server.rpc_port ({})", server.rpc_port),
            ));
        }
        for (field, value) in [
            ("server.shutdown_grace_ms", server.shutdown_grace_ms),
            ("server.startup_timeout_ms", server.startup_timeout_ms),
            ("server.request_timeout_ms", server.request_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid_value(field, "must be greater than 0"));
            }
        }
        if server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than 0",
            ));
        }
        if server.health_check && !server.health_path.starts_with('/') {
            return Err(ConfigError::invalid_value(
                "server.health_path",
                format!("'{}' must start with '/'", server.health_path),
            ));
        }

        if self.tls.cert_path.is_some() != self.tls.key_path.is_some() {
            return Err(ConfigError::invalid_value(
                "tls",
                "cert_path and key_path must be set together",
            ));
        }
        if self.tls.is_enabled() && self.tls.server_name.is_empty() {
            return Err(ConfigError::invalid_value("tls.server_name", "must not be empty"));
        }

        if self.logging.enabled {
            create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }
        Ok(())
    }

    /// The interface both listeners bind to.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `server.bind_addr` is not an
    /// IP address.
    pub fn bind_addr(&self) -> Result<IpAddr, ConfigError> {
        self.server.bind_addr.parse().map_err(|_| {
            ConfigError::invalid_value(
                "server.bind_addr",
                format!("'{}' is not an IP address", self.server.bind_addr),
            )
        })
    }

    /// Address for the RPC listener.
    pub fn rpc_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(SocketAddr::new(self.bind_addr()?, self.server.rpc_port))
    }

    /// Address for the gateway listener.
    pub fn gateway_addr(&self) -> Result<SocketAddr, ConfigError> {
        Ok(SocketAddr::new(self.bind_addr()?, self.server.gateway_port))
    }

    /// Runtime knobs for [`tandem_server::Server`].
    #[must_use]
    pub fn server_config(&self) -> ServerConfig {
        let server = &self.server;
        let mut builder = ServerConfig::builder()
            .shutdown_grace(Duration::from_millis(server.shutdown_grace_ms))
            .startup_timeout(Duration::from_millis(server.startup_timeout_ms))
            .request_timeout(Duration::from_millis(server.request_timeout_ms))
            .max_body_bytes(server.max_body_bytes)
            .tls_server_name(self.tls.server_name.clone());
        builder = if server.health_check {
            builder.health_path(server.health_path.clone())
        } else {
            builder.without_health_check()
        };
        builder.build()
    }

    /// TLS material, when `[tls]` is enabled.
    ///
    /// Certificate and key are read when the server starts; a CA bundle is
    /// read here.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if `tls.ca_path` cannot be read.
    pub fn tls_material(&self) -> Result<Option<TlsMaterial>, ConfigError> {
        let (Some(cert), Some(key)) = (&self.tls.cert_path, &self.tls.key_path) else {
            return Ok(None);
        };
        let mut material = TlsMaterial::from_files(cert.clone(), key.clone());
        if let Some(ca_path) = &self.tls.ca_path {
            let ca = fs::read(ca_path).map_err(|e| ConfigError::read_error(ca_path, e))?;
            material = material.with_ca_pem(ca);
        }
        Ok(Some(material))
    }

    /// Logging setup for [`tandem_telemetry::init_logging`].
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::production()
            .with_level(self.logging.level.clone())
            .with_format(self.logging.format);
        config.enabled = self.logging.enabled;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tandem_telemetry::LogFormat;

    #[test]
    fn test_default_is_valid() {
        let config = HarnessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.rpc_addr().unwrap(),
            "0.0.0.0:50504".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(config.gateway_addr().unwrap().port(), 51504);
    }

    #[test]
    fn test_same_ports_rejected() {
        let mut config = HarnessConfig::default();
        config.server.gateway_port = config.server.rpc_port;
        assert!(config.validate().is_err());

        config.server.rpc_port = 0;
        config.server.gateway_port = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_bind_addr_rejected() {
        let mut config = HarnessConfig::default();
        config.server.bind_addr = "localhost:80".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.bind_addr"));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut config = HarnessConfig::default();
        config.server.request_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.request_timeout_ms"));
    }

    #[test]
    fn test_relative_health_path_rejected_only_when_enabled() {
        let mut config = HarnessConfig::default();
        config.server.health_path = "healthz".to_string();
        assert!(config.validate().is_err());
        config.server.health_check = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_half_configured_tls_rejected() {
        let mut config = HarnessConfig::default();
        config.tls.cert_path = Some("server.crt".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tls"));
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = HarnessConfig::default();
        config.logging.level = "tandem_server=loudest".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_server_config_conversion() {
        let mut config = HarnessConfig::default();
        config.server.shutdown_grace_ms = 2500;
        config.server.max_body_bytes = 1024;
        config.server.health_path = "/livez".to_string();

        let server = config.server_config();
        assert_eq!(server.shutdown_grace(), Duration::from_millis(2500));
        assert_eq!(server.max_body_bytes(), 1024);
        assert_eq!(server.health_path(), Some("/livez"));
        assert_eq!(server.tls_server_name(), "localhost");

        config.server.health_check = false;
        assert_eq!(config.server_config().health_path(), None);
    }

    #[test]
    fn test_tls_material_only_when_enabled() {
        let config = HarnessConfig::default();
        assert!(config.tls_material().unwrap().is_none());

        let mut ca = tempfile::NamedTempFile::new().unwrap();
        ca.write_all(b"-----BEGIN CERTIFICATE-----\n").unwrap();

        let mut config = HarnessConfig::default();
        config.tls.cert_path = Some("server.crt".into());
        config.tls.key_path = Some("server.key".into());
        config.tls.ca_path = Some(ca.path().to_path_buf());
        assert!(config.tls_material().unwrap().is_some());

        config.tls.ca_path = Some("/nonexistent/ca.crt".into());
        assert!(matches!(
            config.tls_material(),
            Err(ConfigError::ReadError { .. })
        ));
    }

    #[test]
    fn test_log_config_conversion() {
        let mut config = HarnessConfig::default();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Compact;
        config.logging.enabled = false;

        let log = config.log_config();
        assert_eq!(log.level, "debug");
        assert_eq!(log.format, LogFormat::Compact);
        assert!(!log.enabled);
    }
}
