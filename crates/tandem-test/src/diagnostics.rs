//! `DiagnosticsService`: probes for deadlines, draining and panics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tonic::metadata::{KeyAndValueRef, MetadataValue};
use tonic::{Code, Request, Response, Status};

use crate::proto::v1::diagnostics_service_server::DiagnosticsService;
use crate::proto::v1::{
    EchoRequest, EchoResponse, PanicRequest, PanicResponse, SleepRequest, SleepResponse,
};

/// Response metadata set on every `Echo`.
pub const SERVED_BY_KEY: &str = "x-served-by";

/// Value of [`SERVED_BY_KEY`].
pub const SERVED_BY_VALUE: &str = "diagnostics";

/// The `DiagnosticsService` fixture.
#[derive(Debug, Clone, Default)]
pub struct FakeDiagnostics {
    sleeps_started: Arc<AtomicUsize>,
    sleeps_completed: Arc<AtomicUsize>,
}

impl FakeDiagnostics {
    /// Creates the fixture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `Sleep` calls that have begun.
    #[must_use]
    pub fn sleeps_started(&self) -> usize {
        self.sleeps_started.load(Ordering::SeqCst)
    }

    /// `Sleep` calls that ran to completion.
    #[must_use]
    pub fn sleeps_completed(&self) -> usize {
        self.sleeps_completed.load(Ordering::SeqCst)
    }
}

#[tonic::async_trait]
impl DiagnosticsService for FakeDiagnostics {
    async fn echo(&self, request: Request<EchoRequest>) -> Result<Response<EchoResponse>, Status> {
        let metadata: HashMap<String, String> = request
            .metadata()
            .iter()
            .filter_map(|entry| match entry {
                KeyAndValueRef::Ascii(key, value) => value
                    .to_str()
                    .ok()
                    .map(|value| (key.as_str().to_string(), value.to_string())),
                KeyAndValueRef::Binary(..) => None,
            })
            .collect();
        let message = request.into_inner();

        if message.fail_code != 0 {
            let mut status = Status::new(Code::from(message.fail_code), message.message);
            status
                .metadata_mut()
                .insert(SERVED_BY_KEY, MetadataValue::from_static(SERVED_BY_VALUE));
            return Err(status);
        }

        let mut response = Response::new(EchoResponse {
            message: message.message,
            metadata,
        });
        response
            .metadata_mut()
            .insert(SERVED_BY_KEY, MetadataValue::from_static(SERVED_BY_VALUE));
        Ok(response)
    }

    async fn sleep(
        &self,
        request: Request<SleepRequest>,
    ) -> Result<Response<SleepResponse>, Status> {
        let millis = request.into_inner().millis;
        self.sleeps_started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(millis)).await;
        self.sleeps_completed.fetch_add(1, Ordering::SeqCst);
        Ok(Response::new(SleepResponse {
            slept_millis: millis,
        }))
    }

    async fn panic(&self, request: Request<PanicRequest>) -> Result<Response<PanicResponse>, Status> {
        let message = request.into_inner().message;
        panic!("diagnostics panic: {message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_returns_message_and_metadata() {
        let diagnostics = FakeDiagnostics::new();
        let mut request = Request::new(EchoRequest {
            message: "hello".to_string(),
            fail_code: 0,
        });
        request
            .metadata_mut()
            .insert("tenant", MetadataValue::from_static("eu-1"));

        let response = diagnostics.echo(request).await.unwrap();
        assert_eq!(
            response.metadata().get(SERVED_BY_KEY).unwrap().to_str().unwrap(),
            SERVED_BY_VALUE
        );
        let echo = response.into_inner();
        assert_eq!(echo.message, "hello");
        assert_eq!(echo.metadata["tenant"], "eu-1");
    }

    #[tokio::test]
    async fn test_echo_fail_code_becomes_status() {
        let diagnostics = FakeDiagnostics::new();
        let status = diagnostics
            .echo(Request::new(EchoRequest {
                message: "gone".to_string(),
                fail_code: Code::NotFound as i32,
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
        assert_eq!(status.message(), "gone");
    }

    #[tokio::test]
    async fn test_sleep_counts() {
        let diagnostics = FakeDiagnostics::new();
        let response = diagnostics
            .sleep(Request::new(SleepRequest { millis: 5 }))
            .await
            .unwrap();
        assert_eq!(response.into_inner().slept_millis, 5);
        assert_eq!(diagnostics.sleeps_started(), 1);
        assert_eq!(diagnostics.sleeps_completed(), 1);
    }
}
