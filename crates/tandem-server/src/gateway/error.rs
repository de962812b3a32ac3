//! Per-request gateway failures.

use bytes::Bytes;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderValue, Response, StatusCode};
use http_body_util::Full;
use tandem_core::{ErrorEnvelope, RequestId, RpcCode, REQUEST_ID_HEADER};
use thiserror::Error;
use tonic::Status;

use super::translate::metadata_to_headers;
use super::HttpResponse;

/// Why a single gateway request failed.
///
/// Never escapes the request it belongs to: each variant becomes an HTTP
/// status plus an [`ErrorEnvelope`] body.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No route matches the path.
    #[error("no route for {path}")]
    NotFound {
        /// Requested path.
        path: String,
    },

    /// The path matched but the method is not bound on it.
    #[error("method {method} not allowed")]
    MethodNotAllowed {
        /// Requested method.
        method: String,
        /// Value for the `Allow` header.
        allow: String,
    },

    /// The body exceeded the configured limit.
    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The body could not be read from the connection.
    #[error("failed to read request body: {0}")]
    Body(String),

    /// The body, query or path parameters did not form a valid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The call did not finish before its deadline.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The RPC returned a non-OK status.
    #[error("rpc failed: {}", .0.message())]
    Rpc(Status),

    /// The RPC response could not be rendered as JSON.
    #[error("failed to encode response: {0}")]
    Encode(String),

    /// A handler panicked while serving the request.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// The RPC code this failure is reported as.
    #[must_use]
    pub fn rpc_code(&self) -> RpcCode {
        match self {
            Self::NotFound { .. } => RpcCode::NotFound,
            Self::MethodNotAllowed { .. } => RpcCode::Unimplemented,
            Self::PayloadTooLarge { .. } => RpcCode::ResourceExhausted,
            Self::Body(_) | Self::InvalidRequest(_) => RpcCode::InvalidArgument,
            Self::DeadlineExceeded => RpcCode::DeadlineExceeded,
            Self::Rpc(status) => RpcCode::from_i32(status.code() as i32),
            Self::Encode(_) | Self::Internal(_) => RpcCode::Internal,
        }
    }

    /// The HTTP status this failure is answered with.
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            other => other.rpc_code().http_status(),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Rpc(status) => status.message().to_string(),
            other => other.to_string(),
        }
    }

    /// Renders the JSON error response.
    #[must_use]
    pub fn into_response(self, request_id: &RequestId) -> HttpResponse {
        let envelope =
            ErrorEnvelope::new(self.rpc_code(), self.message()).with_request_id(request_id);
        let mut response = Response::new(Full::new(Bytes::from(envelope.to_json())));
        *response.status_mut() = self.http_status();

        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
        match &self {
            Self::MethodNotAllowed { allow, .. } => {
                if let Ok(value) = HeaderValue::from_str(allow) {
                    headers.insert(ALLOW, value);
                }
            }
            Self::Rpc(status) => metadata_to_headers(status.metadata(), headers),
            _ => {}
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn envelope_of(response: HttpResponse) -> ErrorEnvelope {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_envelope() {
        let id = RequestId::new();
        let response = GatewayError::NotFound {
            path: "/v1/nothing".to_string(),
        }
        .into_response(&id);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()[REQUEST_ID_HEADER], id.to_string().as_str());

        let envelope = envelope_of(response).await;
        assert_eq!(envelope.code, 5);
        assert_eq!(envelope.status, "NOT_FOUND");
        assert_eq!(envelope.request_id, Some(id.to_string()));
    }

    #[test]
    fn test_method_not_allowed_sets_allow() {
        let response = GatewayError::MethodNotAllowed {
            method: "PUT".to_string(),
            allow: "GET, DELETE".to_string(),
        }
        .into_response(&RequestId::new());
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET, DELETE");
    }

    #[tokio::test]
    async fn test_rpc_status_mapping() {
        let cases = [
            (Status::not_found("ticket t-1 not found"), StatusCode::NOT_FOUND),
            (Status::invalid_argument("bad"), StatusCode::BAD_REQUEST),
            (Status::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
            (Status::unavailable("down"), StatusCode::SERVICE_UNAVAILABLE),
            (Status::permission_denied("no"), StatusCode::FORBIDDEN),
        ];
        for (status, expected) in cases {
            let err = GatewayError::Rpc(status);
            assert_eq!(err.http_status(), expected);
        }

        let response = GatewayError::Rpc(Status::not_found("ticket t-1 not found"))
            .into_response(&RequestId::new());
        let envelope = envelope_of(response).await;
        assert_eq!(envelope.message, "ticket t-1 not found");
    }

    #[test]
    fn test_local_failures() {
        assert_eq!(
            GatewayError::PayloadTooLarge { limit: 10 }.http_status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            GatewayError::InvalidRequest("expected value".to_string()).http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::DeadlineExceeded.http_status(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_rpc_error_metadata_becomes_headers() {
        let mut status = Status::unavailable("try later");
        status
            .metadata_mut()
            .insert("retry-after-ms", "250".parse().unwrap());
        let response = GatewayError::Rpc(status).into_response(&RequestId::new());
        assert_eq!(response.headers()["grpc-metadata-retry-after-ms"], "250");
    }
}
