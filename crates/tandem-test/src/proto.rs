//! Generated `matchmaking.v1` messages and services.
//!
//! Messages carry serde derives so the gateway can translate them. Fields
//! holding their default value are left out of JSON output.

#![allow(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]

/// `matchmaking.v1`.
pub mod v1 {
    tonic::include_proto!("matchmaking.v1");
}

/// `skip_serializing_if` predicate for generated fields.
pub fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Fully qualified RPC method names, as bound on the gateway.
pub mod methods {
    /// `FrontendService/CreateTicket`.
    pub const CREATE_TICKET: &str = "/matchmaking.v1.FrontendService/CreateTicket";
    /// `FrontendService/GetTicket`.
    pub const GET_TICKET: &str = "/matchmaking.v1.FrontendService/GetTicket";
    /// `FrontendService/DeleteTicket`.
    pub const DELETE_TICKET: &str = "/matchmaking.v1.FrontendService/DeleteTicket";
    /// `DiagnosticsService/Echo`.
    pub const ECHO: &str = "/matchmaking.v1.DiagnosticsService/Echo";
    /// `DiagnosticsService/Sleep`.
    pub const SLEEP: &str = "/matchmaking.v1.DiagnosticsService/Sleep";
    /// `DiagnosticsService/Panic`.
    pub const PANIC: &str = "/matchmaking.v1.DiagnosticsService/Panic";
}
