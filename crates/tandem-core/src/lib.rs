//! # Tandem Core
//!
//! Shared vocabulary for the Tandem server harness.
//!
//! This crate provides the types both transports agree on:
//!
//! - [`RequestId`] - UUID v7 request identifier, propagated from HTTP into RPC metadata
//! - [`RpcCode`] - RPC status codes and their deterministic HTTP status mapping
//! - [`ErrorEnvelope`] - JSON error body returned by the gateway

#![doc(html_root_url = "https://docs.rs/tandem-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;

pub use context::{RequestId, REQUEST_ID_HEADER};
pub use error::{ErrorEnvelope, RpcCode};
