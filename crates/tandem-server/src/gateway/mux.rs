//! The gateway route table and the typed unary translator.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tandem_router::{MethodRouter, Resolution, Router};
use tonic::metadata::MetadataMap;
use tonic::transport::{Channel, Endpoint};
use tonic::Status;

use super::error::GatewayError;
use crate::error::ServerError;
use crate::tls::ResolvedTls;

/// Input handed to a translation handler.
pub(crate) struct CallInput {
    pub(crate) message: Value,
    pub(crate) metadata: MetadataMap,
    pub(crate) timeout: Duration,
}

/// A successful translated call.
pub(crate) struct CallOutput {
    pub(crate) body: Vec<u8>,
    pub(crate) metadata: MetadataMap,
}

pub(crate) type Translator = dyn Fn(CallInput) -> BoxFuture<'static, Result<CallOutput, GatewayError>>
    + Send
    + Sync;

/// Routes gateway requests to translation handlers.
///
/// Routes are keyed by `METHOD pattern` and resolve to a fully qualified RPC
/// method name; each RPC method has one handler that performs the call.
#[derive(Default)]
pub struct GatewayMux {
    router: Router,
    handlers: HashMap<String, Arc<Translator>>,
}

impl GatewayMux {
    /// Creates an empty mux.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `method pattern` to a unary RPC.
    ///
    /// `call` receives a `tonic::Request` whose message was decoded from the
    /// merged JSON input, with forwarded metadata and the request deadline
    /// already attached; typically it forwards to a generated client built
    /// from [`RpcEndpoint::channel`].
    ///
    /// ```rust,ignore
    /// let client = FrontendServiceClient::new(endpoint.channel());
    /// mux.unary(
    ///     Method::GET,
    ///     "/v1/frontendservice/tickets/{ticket_id}",
    ///     "/matchmaking.v1.FrontendService/GetTicket",
    ///     move |req| {
    ///         let mut client = client.clone();
    ///         async move { client.get_ticket(req).await }
    ///     },
    /// )?;
    /// ```
    pub fn unary<Req, Resp, F, Fut>(
        &mut self,
        method: Method,
        pattern: &str,
        rpc_method: &str,
        call: F,
    ) -> Result<&mut Self, ServerError>
    where
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + Send + 'static,
        F: Fn(tonic::Request<Req>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<tonic::Response<Resp>, Status>> + Send + 'static,
    {
        self.router
            .insert(pattern, MethodRouter::new().method(method, rpc_method))?;

        let translator = move |input: CallInput| -> BoxFuture<'static, Result<CallOutput, GatewayError>> {
            let message: Req = match serde_json::from_value(input.message) {
                Ok(message) => message,
                Err(e) => {
                    let err = GatewayError::InvalidRequest(e.to_string());
                    return Box::pin(async move { Err(err) });
                }
            };

            let mut request = tonic::Request::new(message);
            *request.metadata_mut() = input.metadata;
            request.set_timeout(input.timeout);
            let pending = call(request);

            Box::pin(async move {
                let response = pending.await.map_err(GatewayError::Rpc)?;
                let (metadata, message, _extensions) = response.into_parts();
                let body = serde_json::to_vec(&message)
                    .map_err(|e| GatewayError::Encode(e.to_string()))?;
                Ok(CallOutput { body, metadata })
            })
        };

        self.handlers
            .insert(rpc_method.to_string(), Arc::new(translator));
        Ok(self)
    }

    /// Number of bound `(method, pattern)` routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.router.len()
    }

    /// Returns `true` if `rpc_method` has a handler.
    #[must_use]
    pub fn handles(&self, rpc_method: &str) -> bool {
        self.handlers.contains_key(rpc_method)
    }

    pub(crate) fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        self.router.resolve(method, path)
    }

    pub(crate) fn translator(&self, rpc_method: &str) -> Option<Arc<Translator>> {
        self.handlers.get(rpc_method).cloned()
    }
}

impl std::fmt::Debug for GatewayMux {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayMux")
            .field("routes", &self.router.len())
            .field("rpc_methods", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The RPC server as seen from the gateway.
///
/// Holds one eagerly connected [`Channel`]; clones share it.
#[derive(Debug, Clone)]
pub struct RpcEndpoint {
    addr: SocketAddr,
    tls: bool,
    channel: Channel,
}

impl RpcEndpoint {
    pub(crate) async fn connect(
        addr: SocketAddr,
        tls: Option<&ResolvedTls>,
        connect_timeout: Duration,
    ) -> Result<Self, ServerError> {
        let scheme = if tls.is_some() { "https" } else { "http" };
        let loopback_err = |source| ServerError::Loopback { addr, source };

        let mut endpoint = Endpoint::from_shared(format!("{scheme}://{addr}"))
            .map_err(loopback_err)?
            .connect_timeout(connect_timeout)
            .tcp_nodelay(true);
        if let Some(tls) = tls {
            endpoint = endpoint.tls_config(tls.client.clone()).map_err(loopback_err)?;
        }

        let channel = endpoint.connect().await.map_err(loopback_err)?;
        tracing::debug!(%addr, tls = tls.is_some(), "gateway connected to rpc endpoint");

        Ok(Self {
            addr,
            tls: tls.is_some(),
            channel,
        })
    }

    /// Address of the RPC listener on this host.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://` or `https://` URI of the RPC listener.
    #[must_use]
    pub fn uri(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{}", self.addr)
    }

    /// Returns `true` when the loopback connection is encrypted.
    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.tls
    }

    /// The shared client channel, for building generated clients.
    #[must_use]
    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }
}
