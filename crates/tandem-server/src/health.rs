//! The gateway's health route.
//!
//! Answers without touching any registered service: `200 ok` while the
//! server is serving, `503 shutting down` once stop has begun draining.
//!
//! ```rust
//! use tandem_server::HealthCheck;
//!
//! let health = HealthCheck::new();
//! assert!(health.is_serving());
//!
//! health.set_draining();
//! assert!(!health.is_serving());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use http::header::{ALLOW, CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderValue, Method, Response, StatusCode};
use http_body_util::Full;

use crate::gateway::HttpResponse;

/// Body returned while serving.
pub const HEALTHY_BODY: &str = "ok";

/// Body returned while draining.
pub const DRAINING_BODY: &str = "shutting down";

/// Shared serving/draining flag behind the health route.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    serving: Arc<AtomicBool>,
}

impl HealthCheck {
    /// A check that reports serving.
    #[must_use]
    pub fn new() -> Self {
        Self {
            serving: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flips the check to draining. Irreversible.
    pub fn set_draining(&self) {
        if self.serving.swap(false, Ordering::SeqCst) {
            tracing::debug!("health check now reports draining");
        }
    }

    /// Returns `true` until [`set_draining`](Self::set_draining) is called.
    #[must_use]
    pub fn is_serving(&self) -> bool {
        self.serving.load(Ordering::SeqCst)
    }

    /// Builds the response for a request with `method`.
    #[must_use]
    pub fn respond(&self, method: &Method) -> HttpResponse {
        if method != Method::GET && method != Method::HEAD {
            return plain(StatusCode::METHOD_NOT_ALLOWED, "", Some("GET, HEAD"));
        }

        let (status, body) = if self.is_serving() {
            (StatusCode::OK, HEALTHY_BODY)
        } else {
            (StatusCode::SERVICE_UNAVAILABLE, DRAINING_BODY)
        };

        let body = if method == Method::HEAD { "" } else { body };
        plain(status, body, None)
    }
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self::new()
    }
}

fn plain(status: StatusCode, body: &'static str, allow: Option<&'static str>) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    if let Some(allow) = allow {
        headers.insert(ALLOW, HeaderValue::from_static(allow));
    }
    response
}
