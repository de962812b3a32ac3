//! Radix tree route table for the Tandem gateway.
//!
//! The gateway resolves every inbound `METHOD /path` to the fully qualified
//! RPC method it translates to (for example
//! `/matchmaking.v1.FrontendService/CreateTicket`). Routes are stored in a
//! radix tree keyed by path segment, so lookup cost is proportional to the
//! number of segments rather than the number of routes.
//!
//! # Features
//!
//! - **Path Parameters**: `/v1/tickets/{ticket_id}` binds `ticket_id`
//! - **Wildcards**: `/v1/files/*path` binds the remaining path
//! - **Method Dispatch**: one path, several methods, each with its own target
//! - **405 Support**: a path match without a method match reports the allowed methods
//!
//! # Example
//!
//! ```rust
//! use tandem_router::{Router, MethodRouter, Resolution};
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.insert(
//!     "/v1/frontendservice/tickets",
//!     MethodRouter::new().post("/matchmaking.v1.FrontendService/CreateTicket"),
//! ).unwrap();
//! router.insert(
//!     "/v1/frontendservice/tickets/{ticket_id}",
//!     MethodRouter::new()
//!         .get("/matchmaking.v1.FrontendService/GetTicket")
//!         .delete("/matchmaking.v1.FrontendService/DeleteTicket"),
//! ).unwrap();
//!
//! let Resolution::Matched(m) = router.resolve(&Method::GET, "/v1/frontendservice/tickets/t-1") else {
//!     panic!("expected a match");
//! };
//! assert_eq!(m.target, "/matchmaking.v1.FrontendService/GetTicket");
//! assert_eq!(m.params.get("ticket_id"), Some("t-1"));
//! ```

#![doc(html_root_url = "https://docs.rs/tandem-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod method_router;
mod node;
mod params;
mod router;

pub use error::RouteError;
pub use method_router::MethodRouter;
pub use params::Params;
pub use router::{Resolution, Router};

/// A matched route with its target and extracted parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    /// The RPC method the route translates to.
    pub target: &'a str,
    /// Extracted path parameters.
    pub params: Params,
}

impl<'a> RouteMatch<'a> {
    /// Creates a new route match.
    #[must_use]
    pub fn new(target: &'a str, params: Params) -> Self {
        Self { target, params }
    }
}
