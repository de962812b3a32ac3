//! Fixture errors.

use thiserror::Error;

/// Errors raised while driving a test server.
#[derive(Debug, Error)]
pub enum TestError {
    /// The server failed to start or a listener could not be acquired.
    #[error("server error: {0}")]
    Server(#[from] tandem_server::ServerError),

    /// The HTTP client failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A gRPC channel could not be opened.
    #[error("grpc transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// A body was not the expected JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The body was not UTF-8.
    #[error("body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
