//! # Tandem
//!
//! **gRPC services, also served as JSON over HTTP**
//!
//! Tandem hosts a set of gRPC services on one listener and a JSON/HTTP
//! gateway on another. Every gateway route translates to a unary call
//! against the co-hosted gRPC server, so both transports see the same
//! handlers, errors and metadata.
//!
//! - **One lifecycle**: both servers start together, become ready together
//!   and drain together within a grace period
//! - **Transport security**: one certificate serves both listeners, and the
//!   gateway's loopback client trusts it
//! - **Gateway conventions**: `grpc-metadata-*` forwarding, `grpc-timeout`
//!   deadlines, status-to-HTTP mapping and a health endpoint
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tandem::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_env_prefix("TANDEM").load()?;
//!     tandem::telemetry::init_logging(&config.log_config())?;
//!
//!     let mut params = ServerParams::from_listeners(
//!         acquire_on(config.rpc_addr()?)?,
//!         acquire_on(config.gateway_addr()?)?,
//!     );
//!     params.add_handler(
//!         |rpc| rpc.add_service(FrontendServiceServer::new(frontend.clone())),
//!         |mux, endpoint| register_frontend_routes(mux, endpoint),
//!     );
//!
//!     let mut server = Server::new();
//!     server.start(params).await?;
//!     server.serve_until(ShutdownSignal::with_os_signals()).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! HTTP client ─→ gateway listener ─→ GatewayMux ─→ loopback channel ─┐
//!                                                                     ↓
//! gRPC client ─────────────────────→ rpc listener ─→ RpcRegistry ─→ services
//! ```

#![doc(html_root_url = "https://docs.rs/tandem/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use tandem_core as core;

// Re-export router types
pub use tandem_router as router;

// Re-export logging setup
pub use tandem_telemetry as telemetry;

// Re-export configuration loading
pub use tandem_config as config;

// Re-export server types
pub use tandem_server as server;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use tandem::prelude::*;
/// ```
pub mod prelude {
    pub use tandem_core::{ErrorEnvelope, RequestId, RpcCode};

    pub use tandem_config::{ConfigLoader, HarnessConfig};

    pub use tandem_server::{
        acquire, acquire_on, GatewayError, GatewayMux, RpcEndpoint, RpcRegistry, Server,
        ServerConfig, ServerError, ServerParams, ServiceRegistration, ShutdownReport,
        ShutdownSignal, StopOutcome, TlsMaterial,
    };
}
