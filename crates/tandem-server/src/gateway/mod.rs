//! The JSON/HTTP gateway.
//!
//! Each request is matched against the [`GatewayMux`] route table, its body,
//! query string and path parameters are merged into one JSON message, and the
//! message is forwarded as a unary RPC over the loopback [`RpcEndpoint`].
//! The RPC response comes back as `200 application/json`; any failure is
//! answered with an [`ErrorEnvelope`](tandem_core::ErrorEnvelope).
//!
//! Requests for the health path and for exact-path HTTP handlers are served
//! directly and never reach the RPC server.

mod error;
mod mux;
pub(crate) mod translate;

use std::collections::HashMap;
use std::convert::Infallible;
use std::error::Error as StdError;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use http::header::CONTENT_LENGTH;
use http::{HeaderMap, Method, Request, Response};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use tandem_core::{RequestId, REQUEST_ID_HEADER};
use tandem_router::Resolution;
use tokio::sync::oneshot;
use tonic::{Code, Status, TimeoutExpired};

pub use error::GatewayError;
pub use mux::{GatewayMux, RpcEndpoint};
pub use translate::METADATA_HEADER_PREFIX;

use crate::deadline::{parse_grpc_timeout, GRPC_TIMEOUT_HEADER};
use crate::error::{ServerError, SubServer};
use crate::health::HealthCheck;
use crate::listener::Listener;
use crate::panic::panic_message;
use crate::serve::{self, ServeHandle};
use crate::tls::ResolvedTls;
use mux::CallInput;
use translate::{forward_metadata, json_response, merge_input, set_request_id};

/// Response type produced by the gateway.
pub type HttpResponse = Response<Full<Bytes>>;

/// A plain HTTP handler mounted on an exact path.
///
/// The request body is collected (within the body limit) before the handler
/// runs.
pub type HttpHandler =
    Arc<dyn Fn(Request<Bytes>) -> BoxFuture<'static, HttpResponse> + Send + Sync>;

/// Wraps an async function as an [`HttpHandler`].
pub fn http_handler<F, Fut>(handler: F) -> HttpHandler
where
    F: Fn(Request<Bytes>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    Arc::new(move |req: Request<Bytes>| -> BoxFuture<'static, HttpResponse> {
        Box::pin(handler(req))
    })
}

/// Everything the gateway needs to answer requests.
pub(crate) struct GatewayState {
    pub(crate) mux: GatewayMux,
    pub(crate) http_handlers: HashMap<String, HttpHandler>,
    pub(crate) health: Option<(String, HealthCheck)>,
    pub(crate) max_body_bytes: usize,
    pub(crate) request_timeout: Duration,
}

impl GatewayState {
    async fn handle(&self, req: Request<Incoming>, request_id: RequestId) -> HttpResponse {
        let path = req.uri().path();

        if let Some((health_path, health)) = &self.health {
            if health_path == path {
                let mut response = health.respond(req.method());
                set_request_id(response.headers_mut(), &request_id);
                return response;
            }
        }

        if let Some(handler) = self.http_handlers.get(path) {
            return self.serve_http(handler, req, request_id).await;
        }

        match self.translate(req, request_id).await {
            Ok(response) => response,
            Err(e) => {
                tandem_telemetry::log_request_error!(request_id, e.rpc_code().as_str(), e);
                e.into_response(&request_id)
            }
        }
    }

    async fn serve_http(
        &self,
        handler: &HttpHandler,
        req: Request<Incoming>,
        request_id: RequestId,
    ) -> HttpResponse {
        let (parts, body) = req.into_parts();
        let body = match read_body(body, &parts.headers, self.max_body_bytes).await {
            Ok(body) => body,
            Err(e) => return e.into_response(&request_id),
        };

        let mut response = handler(Request::from_parts(parts, body)).await;
        if !response.headers().contains_key(REQUEST_ID_HEADER) {
            set_request_id(response.headers_mut(), &request_id);
        }
        response
    }

    async fn translate(
        &self,
        req: Request<Incoming>,
        request_id: RequestId,
    ) -> Result<HttpResponse, GatewayError> {
        let started = Instant::now();
        let (parts, body) = req.into_parts();
        let path = parts.uri.path();

        let (rpc_method, params) = match self.mux.resolve(&parts.method, path) {
            Resolution::Matched(route) => (route.target.to_string(), route.params),
            Resolution::MethodNotAllowed { allowed } => {
                return Err(GatewayError::MethodNotAllowed {
                    method: parts.method.to_string(),
                    allow: allowed
                        .iter()
                        .map(Method::as_str)
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
            Resolution::NotFound => {
                return Err(GatewayError::NotFound {
                    path: path.to_string(),
                });
            }
        };

        let translator = self.mux.translator(&rpc_method).ok_or_else(|| {
            GatewayError::Internal(format!("no handler bound for {rpc_method}"))
        })?;

        let body = read_body(body, &parts.headers, self.max_body_bytes).await?;
        let message = merge_input(&parts.method, &body, parts.uri.query(), &params)?;
        let metadata = forward_metadata(&parts.headers, &request_id);
        let timeout = parts
            .headers
            .get(GRPC_TIMEOUT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_grpc_timeout)
            .unwrap_or(self.request_timeout);

        tandem_telemetry::log_request_start!(request_id, parts.method, path, rpc_method);

        let deadline = tokio::time::Instant::now() + timeout;
        let call = translator(CallInput {
            message,
            metadata,
            timeout,
        });
        let output = match tokio::time::timeout_at(deadline, call).await {
            Err(_) => return Err(GatewayError::DeadlineExceeded),
            Ok(Err(GatewayError::Rpc(status))) if is_expired_call(&status, deadline) => {
                return Err(GatewayError::DeadlineExceeded);
            }
            Ok(result) => result?,
        };

        let response = json_response(output.body, &output.metadata, &request_id);
        tandem_telemetry::log_request_complete!(
            request_id,
            response.status().as_u16(),
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
        );
        Ok(response)
    }
}

// The loopback channel enforces the same deadline and reports expiry as
// `CANCELLED`; the caller still sees a deadline failure.
fn is_expired_call(status: &Status, deadline: tokio::time::Instant) -> bool {
    if status.code() != Code::Cancelled {
        return false;
    }
    let timed_out = StdError::source(status)
        .is_some_and(|source| source.downcast_ref::<TimeoutExpired>().is_some());
    timed_out || tokio::time::Instant::now() >= deadline
}

/// Collects a request body, enforcing `limit`.
async fn read_body<B>(body: B, headers: &HeaderMap, limit: usize) -> Result<Bytes, GatewayError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(GatewayError::PayloadTooLarge { limit });
    }

    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(GatewayError::PayloadTooLarge { limit })
        }
        Err(e) => Err(GatewayError::Body(e.to_string())),
    }
}

#[derive(Clone)]
struct GatewayService {
    state: Arc<GatewayState>,
}

impl hyper::service::Service<Request<Incoming>> for GatewayService {
    type Response = HttpResponse;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<HttpResponse, Infallible>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let state = Arc::clone(&self.state);
        Box::pin(async move {
            let request_id = RequestId::from_header_or_new(
                req.headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok()),
            );
            let path = req.uri().path().to_string();

            let response = match AssertUnwindSafe(state.handle(req, request_id))
                .catch_unwind()
                .await
            {
                Ok(response) => response,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(
                        request_id = %request_id,
                        http.path = %path,
                        panic = %message,
                        "gateway handler panicked"
                    );
                    GatewayError::Internal(message).into_response(&request_id)
                }
            };
            Ok(response)
        })
    }
}

/// Starts the gateway serve loop.
pub(crate) fn spawn(
    listener: Listener,
    state: GatewayState,
    tls: Option<&ResolvedTls>,
) -> Result<(ServeHandle, oneshot::Receiver<()>), ServerError> {
    tracing::info!(
        routes = state.mux.route_count(),
        http_handlers = state.http_handlers.len(),
        health = state.health.as_ref().map(|(path, _)| path.as_str()),
        "starting gateway server"
    );
    let service = GatewayService {
        state: Arc::new(state),
    };
    serve::spawn(
        SubServer::Gateway,
        listener,
        service,
        tls.map(|t| t.acceptor.clone()),
    )
}
