//! # Tandem Server
//!
//! A dual-protocol server harness: every registered service is served over
//! gRPC on one listener and as JSON over HTTP on a second listener, from one
//! implementation.
//!
//! - [`listener`] - acquires listeners, with OS-assigned ports queryable
//!   before start
//! - [`ServerParams`] - listeners, service registrations, TLS material and
//!   raw HTTP handlers
//! - [`rpc`] - the gRPC server (tonic), with per-request deadlines and panic
//!   isolation
//! - [`gateway`] - the JSON/HTTP gateway translating routes into unary RPCs
//!   over a loopback channel
//! - [`Server`] - starts and stops both as one unit
//!
//! ## Example
//!
//! ```rust,ignore
//! use tandem_server::{listener, Server, ServerParams, ShutdownSignal};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tandem_server::ServerError> {
//!     let mut params = ServerParams::from_listeners(listener::acquire(50504)?, listener::acquire(51504)?);
//!     params.add_handler(
//!         move |rpc| {
//!             rpc.add_service(FrontendServiceServer::new(frontend.clone()));
//!         },
//!         register_frontend_routes,
//!     );
//!
//!     let mut server = Server::new();
//!     server.start(params).await?;
//!     server.serve_until(ShutdownSignal::with_os_signals()).await;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/tandem-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod deadline;
mod error;
pub mod gateway;
mod health;
mod lifecycle;
pub mod listener;
mod panic;
mod params;
pub mod rpc;
mod serve;
mod shutdown;
mod tls;

pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_HEALTH_PATH, DEFAULT_MAX_BODY_BYTES,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SHUTDOWN_GRACE_SECS, DEFAULT_STARTUP_TIMEOUT_SECS,
    DEFAULT_TLS_SERVER_NAME,
};
pub use deadline::{format_grpc_timeout, parse_grpc_timeout, GRPC_TIMEOUT_HEADER};
pub use error::{ServerError, SubServer};
pub use gateway::{GatewayError, GatewayMux, HttpHandler, HttpResponse, RpcEndpoint};
pub use health::{HealthCheck, DRAINING_BODY, HEALTHY_BODY};
pub use lifecycle::{LifecycleState, Server, ShutdownReport, StopOutcome};
pub use listener::{acquire, acquire_on, resolved_port, Listener};
pub use params::{ServerParams, ServiceRegistration};
pub use rpc::RpcRegistry;
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
pub use tls::TlsMaterial;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
