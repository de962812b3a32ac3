//! The binary RPC server.
//!
//! Registered tonic services are collected into one [`RpcRegistry`] and
//! served by the shared accept loop. Every call runs under its
//! `grpc-timeout` deadline and a panic in a handler is answered with
//! `INTERNAL` to that caller only.

use std::convert::Infallible;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::time::Instant;

use futures_util::FutureExt;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Request, Response};
use hyper::body::Incoming;
use tonic::body::Body;
use tonic::codegen::Service;
use tonic::server::NamedService;
use tonic::service::{Routes, RoutesBuilder};
use tonic::Status;

use crate::deadline::{parse_grpc_timeout, GRPC_TIMEOUT_HEADER};
use crate::error::{ServerError, SubServer};
use crate::listener::Listener;
use crate::panic::panic_message;
use crate::serve::{self, ServeHandle};
use crate::tls::ResolvedTls;

/// Collects the tonic services hosted by the RPC server.
///
/// Handed to every RPC-side registration callback:
///
/// ```rust,ignore
/// params.add_handler(
///     |rpc| { rpc.add_service(FrontendServiceServer::new(frontend.clone())); },
///     |gateway, endpoint| register_frontend_routes(gateway, endpoint),
/// );
/// ```
#[derive(Default)]
pub struct RpcRegistry {
    builder: RoutesBuilder,
    services: Vec<&'static str>,
}

impl RpcRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hosts a generated tonic server (e.g. `FooServer::new(impl)`).
    pub fn add_service<S>(&mut self, service: S) -> &mut Self
    where
        S: Service<Request<Body>, Response = Response<Body>, Error = Infallible>
            + NamedService
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        tracing::debug!(service = S::NAME, "rpc service registered");
        self.services.push(S::NAME);
        self.builder.add_service(service);
        self
    }

    /// Fully qualified names of the hosted services, in registration order.
    #[must_use]
    pub fn service_names(&self) -> &[&'static str] {
        &self.services
    }

    /// Number of hosted services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns true if no service is hosted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    fn into_routes(self) -> Routes {
        self.builder.routes()
    }
}

impl std::fmt::Debug for RpcRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcRegistry")
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}

/// Starts the RPC serve loop.
pub(crate) fn spawn(
    listener: Listener,
    registry: RpcRegistry,
    tls: Option<&ResolvedTls>,
) -> Result<(ServeHandle, tokio::sync::oneshot::Receiver<()>), ServerError> {
    tracing::info!(services = ?registry.service_names(), "starting rpc server");
    let service = RpcService {
        routes: registry.into_routes(),
    };
    serve::spawn(
        SubServer::Rpc,
        listener,
        service,
        tls.map(|t| t.acceptor.clone()),
    )
}

#[derive(Clone)]
struct RpcService {
    routes: Routes,
}

impl hyper::service::Service<Request<Incoming>> for RpcService {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let mut routes = self.routes.clone();
        Box::pin(async move {
            let method = req.uri().path().to_string();
            let deadline = req
                .headers()
                .get(GRPC_TIMEOUT_HEADER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_grpc_timeout);
            let started = Instant::now();

            let call = async move {
                std::future::poll_fn(|cx| {
                    Service::<Request<Incoming>>::poll_ready(&mut routes, cx)
                })
                .await?;
                routes.call(req).await
            };
            let guarded = AssertUnwindSafe(call).catch_unwind();

            let outcome = match deadline {
                Some(limit) => match tokio::time::timeout(limit, guarded).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        tracing::debug!(rpc.method = %method, "deadline exceeded");
                        return Ok(status_response(&Status::deadline_exceeded(
                            "deadline exceeded",
                        )));
                    }
                },
                None => guarded.await,
            };

            let response = match outcome {
                Ok(Ok(response)) => response,
                Ok(Err(never)) => match never {},
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(rpc.method = %method, panic = %message, "rpc handler panicked");
                    status_response(&Status::internal(message))
                }
            };

            tracing::debug!(
                rpc.method = %method,
                duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "rpc call finished"
            );
            Ok(response)
        })
    }
}

/// A trailers-only gRPC response carrying `status`.
fn status_response(status: &Status) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/grpc"));
    if let Err(e) = status.add_header(response.headers_mut()) {
        tracing::warn!(error = %e, "status could not be encoded into headers");
    }
    response
}
