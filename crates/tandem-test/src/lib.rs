//! # Tandem Test
//!
//! Fixtures for exercising Tandem servers end to end:
//!
//! - [`proto`] - the compiled `matchmaking.v1` schema (`FrontendService`,
//!   `DiagnosticsService`) with serde derives for gateway translation
//! - [`FakeFrontend`] / [`FakeDiagnostics`] - in-memory service
//!   implementations
//! - [`FrontendRegistration`] / [`DiagnosticsRegistration`] - ready-made
//!   [`ServiceRegistration`](tandem_server::ServiceRegistration)s binding the
//!   `/v1/...` routes
//! - [`TestServer`] - a started server on loopback ephemeral ports with an
//!   HTTP client and gRPC clients
//! - [`tls`] - a test CA and a `localhost` certificate
//!
//! ## Example
//!
//! ```rust,ignore
//! use tandem_test::TestServer;
//!
//! #[tokio::test]
//! async fn creates_a_ticket() {
//!     let mut server = TestServer::start().await.unwrap();
//!     let mut client = server.frontend_client().await.unwrap();
//!     client.create_ticket(CreateTicketRequest::default()).await.unwrap();
//!     server.stop().await;
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/tandem-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod diagnostics;
mod error;
mod frontend;
mod harness;
pub mod proto;
mod registration;
mod response;
pub mod tls;

pub use diagnostics::{FakeDiagnostics, SERVED_BY_KEY, SERVED_BY_VALUE};
pub use error::TestError;
pub use frontend::FakeFrontend;
pub use harness::{TestServer, TestServerBuilder};
pub use registration::{
    register_diagnostics_routes, register_frontend_routes, DiagnosticsRegistration,
    FrontendRegistration,
};
pub use response::GatewayResponse;
