//! Server-wide error type.
//!
//! Only provisioning and start-up failures surface as [`ServerError`].
//! Per-request failures are answered on the wire and never reach this type,
//! and stop reports degraded outcomes through
//! [`ShutdownReport`](crate::ShutdownReport) instead of failing.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Identifies one of the two serve loops a [`Server`](crate::Server) runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubServer {
    /// The binary RPC (gRPC) server.
    Rpc,
    /// The JSON/HTTP gateway proxy.
    Gateway,
}

impl SubServer {
    /// Short lowercase name used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rpc => "rpc",
            Self::Gateway => "gateway",
        }
    }
}

impl fmt::Display for SubServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while provisioning or starting a server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The OS refused to bind a listener.
    #[error("failed to bind listener on {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A listener could not be handed to the runtime.
    #[error("{server} listener is unusable: {source}")]
    Listener {
        /// Which sub-server owns the listener.
        server: SubServer,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Parameters failed validation before anything was started.
    #[error("invalid server parameters: {0}")]
    InvalidParams(String),

    /// TLS material could not be read.
    #[error("failed to read TLS material from {path}: {source}")]
    TlsFile {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TLS material was read but is unusable.
    #[error("invalid TLS material: {0}")]
    Tls(String),

    /// A gateway registration callback rejected its routes.
    #[error("gateway registration failed: {0}")]
    Registration(String),

    /// A route could not be inserted into the gateway table.
    #[error(transparent)]
    Route(#[from] tandem_router::RouteError),

    /// A sub-server failed before reporting ready.
    #[error("{server} server failed to start: {reason}")]
    Startup {
        /// Which sub-server failed.
        server: SubServer,
        /// Failure description.
        reason: String,
    },

    /// A sub-server did not report ready in time.
    #[error("{server} server was not ready within {timeout:?}")]
    StartupTimeout {
        /// Which sub-server timed out.
        server: SubServer,
        /// The configured startup timeout.
        timeout: Duration,
    },

    /// The gateway could not open its loopback connection to the RPC server.
    #[error("gateway could not connect to rpc endpoint {addr}: {source}")]
    Loopback {
        /// RPC endpoint address.
        addr: SocketAddr,
        /// Transport error from the client.
        #[source]
        source: tonic::transport::Error,
    },

    /// Start was called on a running server.
    #[error("server is already running")]
    AlreadyRunning,

    /// Start was called on a server that has been stopped.
    #[error("server has been stopped and cannot be restarted")]
    NotRestartable,
}

impl ServerError {
    /// Coarse classification for log fields and metrics labels.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Bind { .. } | Self::Listener { .. } => "provisioning",
            Self::InvalidParams(_) | Self::Route(_) | Self::Registration(_) => "configuration",
            Self::TlsFile { .. } | Self::Tls(_) => "tls",
            Self::Startup { .. } | Self::StartupTimeout { .. } | Self::Loopback { .. } => {
                "startup"
            }
            Self::AlreadyRunning | Self::NotRestartable => "lifecycle",
        }
    }

    /// The sub-server the error belongs to, if it is specific to one.
    #[must_use]
    pub const fn sub_server(&self) -> Option<SubServer> {
        match self {
            Self::Listener { server, .. }
            | Self::Startup { server, .. }
            | Self::StartupTimeout { server, .. } => Some(*server),
            Self::Loopback { .. } | Self::Registration(_) | Self::Route(_) => {
                Some(SubServer::Gateway)
            }
            _ => None,
        }
    }

    /// Creates a registration error from any displayable cause.
    pub fn registration(reason: impl fmt::Display) -> Self {
        Self::Registration(reason.to_string())
    }

    pub(crate) fn startup(server: SubServer, reason: impl fmt::Display) -> Self {
        Self::Startup {
            server,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_display() {
        let err = ServerError::Bind {
            addr: "0.0.0.0:80".parse().unwrap(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().starts_with("failed to bind listener on 0.0.0.0:80"));
        assert_eq!(err.category(), "provisioning");
        assert!(err.sub_server().is_none());
    }

    #[test]
    fn test_startup_errors_name_the_sub_server() {
        let err = ServerError::startup(SubServer::Rpc, "accept loop exited");
        assert_eq!(err.to_string(), "rpc server failed to start: accept loop exited");
        assert_eq!(err.sub_server(), Some(SubServer::Rpc));

        let err = ServerError::StartupTimeout {
            server: SubServer::Gateway,
            timeout: Duration::from_secs(5),
        };
        assert!(err.to_string().contains("gateway server was not ready"));
        assert_eq!(err.category(), "startup");
    }

    #[test]
    fn test_route_error_is_transparent() {
        let route = tandem_router::RouteError::NotAbsolute {
            pattern: "v1/tickets".to_string(),
        };
        let expected = route.to_string();
        let err = ServerError::from(route);
        assert_eq!(err.to_string(), expected);
        assert_eq!(err.category(), "configuration");
        assert_eq!(err.sub_server(), Some(SubServer::Gateway));
    }

    #[test]
    fn test_lifecycle_errors() {
        assert_eq!(ServerError::AlreadyRunning.category(), "lifecycle");
        assert_eq!(
            ServerError::NotRestartable.to_string(),
            "server has been stopped and cannot be restarted"
        );
    }
}
