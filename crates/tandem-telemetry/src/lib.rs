//! Structured logging for Tandem servers.
//!
//! The server crates only ever emit `tracing` events; installing a
//! subscriber is left to the binary. This crate is that one place:
//!
//! - **Logging**: JSON (production) or human-readable (development) output
//!   through `tracing-subscriber`, filtered by an `EnvFilter`
//! - **Field names**: the structured field vocabulary shared by the RPC
//!   server and the gateway
//! - **Request macros**: one-line helpers for the per-request events
//!
//! # Example
//!
//! ```rust,ignore
//! use tandem_telemetry::{init_logging, LogConfig, LogFormat};
//!
//! let config = LogConfig {
//!     format: LogFormat::Pretty,
//!     ..LogConfig::development()
//! };
//! init_logging(&config)?;
//!
//! tracing::info!(rpc_port = 50051, "matchmaking frontend starting");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
