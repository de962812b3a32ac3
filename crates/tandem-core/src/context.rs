//! Request identity shared across the HTTP to RPC hop.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header (and RPC metadata key) carrying the request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A unique identifier for each request, using UUID v7.
///
/// The gateway reuses an inbound `x-request-id` when it parses as a UUID and
/// mints a fresh one otherwise. The same value is forwarded to the RPC server
/// as metadata and echoed on the HTTP response.
///
/// # Example
///
/// ```
/// use tandem_core::RequestId;
///
/// let id = RequestId::new();
/// let parsed = RequestId::parse(&id.to_string());
/// assert_eq!(parsed, Some(id));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new time-ordered request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses a request ID from a header value.
    ///
    /// Returns `None` if the value is not a UUID.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }

    /// Returns the inbound ID if it parses, otherwise a fresh one.
    #[must_use]
    pub fn from_header_or_new(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or_default()
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
