//! Layered configuration for Tandem servers.
//!
//! A [`HarnessConfig`] describes one process: listener ports, runtime limits,
//! TLS files and logging. [`ConfigLoader`] builds it from defaults, a TOML or
//! JSON file and environment variables, in that order, and rejects unknown
//! keys.
//!
//! # Example
//!
//! ```no_run
//! use tandem_config::ConfigLoader;
//!
//! # fn main() -> Result<(), tandem_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("tandem.toml")?
//!     .with_env_prefix("TANDEM")
//!     .load()?;
//!
//! println!("rpc on {}, gateway on {}", config.rpc_addr()?, config.gateway_addr()?);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! rpc_port = 50504
//! gateway_port = 51504
//! bind_addr = "0.0.0.0"
//! shutdown_grace_ms = 10000
//! startup_timeout_ms = 5000
//! request_timeout_ms = 30000
//! max_body_bytes = 4194304
//! health_check = true
//! health_path = "/healthz"
//!
//! [tls]
//! cert_path = "/etc/tandem/tls.crt"
//! key_path = "/etc/tandem/tls.key"
//! server_name = "localhost"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Every key can be overridden as `PREFIX__SECTION__KEY`, for example
//! `TANDEM__SERVER__RPC_PORT=9000` or `TANDEM__LOGGING__FORMAT=pretty`.

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::HarnessConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
