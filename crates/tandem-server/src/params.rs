//! Assembly-time server parameters.
//!
//! [`ServerParams`] collects everything a [`Server`](crate::Server) needs
//! before it starts: the two listeners, one [`ServiceRegistration`] per
//! hosted service, optional TLS material and any raw HTTP handlers.
//! Building params performs no I/O; TLS files are read when the server
//! starts.

use std::collections::HashSet;
use std::future::Future;

use bytes::Bytes;
use http::Request;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::gateway::{http_handler, GatewayMux, HttpHandler, HttpResponse, RpcEndpoint};
use crate::listener::Listener;
use crate::rpc::RpcRegistry;
use crate::tls::TlsMaterial;

/// Wires one service into both transports.
///
/// `register_rpc` runs first, against the RPC registry. Once the RPC server
/// is accepting, `register_gateway` runs against the gateway route table
/// with an endpoint connected to that server.
pub trait ServiceRegistration: Send + Sync + 'static {
    /// Hosts the service on the RPC server.
    fn register_rpc(&self, registry: &mut RpcRegistry);

    /// Binds the service's HTTP routes.
    ///
    /// # Errors
    ///
    /// Returns an error if a route cannot be bound; the start is rolled back.
    fn register_gateway(
        &self,
        mux: &mut GatewayMux,
        endpoint: &RpcEndpoint,
    ) -> Result<(), ServerError>;
}

struct HandlerPair<R, G> {
    rpc: R,
    gateway: G,
}

impl<R, G> ServiceRegistration for HandlerPair<R, G>
where
    R: Fn(&mut RpcRegistry) + Send + Sync + 'static,
    G: Fn(&mut GatewayMux, &RpcEndpoint) -> Result<(), ServerError> + Send + Sync + 'static,
{
    fn register_rpc(&self, registry: &mut RpcRegistry) {
        (self.rpc)(registry);
    }

    fn register_gateway(
        &self,
        mux: &mut GatewayMux,
        endpoint: &RpcEndpoint,
    ) -> Result<(), ServerError> {
        (self.gateway)(mux, endpoint)
    }
}

/// Parameters for one [`Server`](crate::Server) start.
///
/// # Example
///
/// ```rust,ignore
/// let mut params = ServerParams::from_listeners(acquire(0)?, acquire(0)?);
/// params.add_handler(
///     move |rpc| {
///         rpc.add_service(FrontendServiceServer::new(frontend.clone()));
///     },
///     |mux, endpoint| register_frontend_routes(mux, endpoint),
/// );
/// server.start(params).await?;
/// ```
pub struct ServerParams {
    pub(crate) rpc: Listener,
    pub(crate) gateway: Listener,
    pub(crate) registrations: Vec<Box<dyn ServiceRegistration>>,
    pub(crate) tls: Option<TlsMaterial>,
    pub(crate) http_handlers: Vec<(String, HttpHandler)>,
    pub(crate) config: ServerConfig,
}

impl ServerParams {
    /// Creates parameters around two acquired listeners.
    #[must_use]
    pub fn from_listeners(rpc: Listener, gateway: Listener) -> Self {
        Self {
            rpc,
            gateway,
            registrations: Vec::new(),
            tls: None,
            http_handlers: Vec::new(),
            config: ServerConfig::default(),
        }
    }

    /// Appends a registration made of two callbacks.
    pub fn add_handler<R, G>(&mut self, register_rpc: R, register_gateway: G) -> &mut Self
    where
        R: Fn(&mut RpcRegistry) + Send + Sync + 'static,
        G: Fn(&mut GatewayMux, &RpcEndpoint) -> Result<(), ServerError> + Send + Sync + 'static,
    {
        self.add_registration(HandlerPair {
            rpc: register_rpc,
            gateway: register_gateway,
        })
    }

    /// Appends a registration object.
    pub fn add_registration(&mut self, registration: impl ServiceRegistration) -> &mut Self {
        self.registrations.push(Box::new(registration));
        self
    }

    /// Serves both transports over TLS.
    pub fn with_tls(&mut self, material: TlsMaterial) -> &mut Self {
        self.tls = Some(material);
        self
    }

    /// Mounts a raw HTTP handler on an exact gateway path.
    ///
    /// The handler answers every method on `path` and is never translated
    /// into an RPC.
    pub fn add_http_handler<F, Fut>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(Request<Bytes>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HttpResponse> + Send + 'static,
    {
        self.http_handlers.push((path.into(), http_handler(handler)));
        self
    }

    /// Moves the health check to `path`.
    pub fn with_health_path(&mut self, path: impl Into<String>) -> &mut Self {
        self.config.set_health_path(Some(path.into()));
        self
    }

    /// Disables the built-in health check.
    pub fn without_health_check(&mut self) -> &mut Self {
        self.config.set_health_path(None);
        self
    }

    /// Replaces the runtime configuration, including its health path.
    pub fn with_config(&mut self, config: ServerConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Port of the RPC listener.
    #[must_use]
    pub fn rpc_port(&self) -> u16 {
        self.rpc.port()
    }

    /// Port of the gateway listener.
    #[must_use]
    pub fn gateway_port(&self) -> u16 {
        self.gateway.port()
    }

    /// Number of registered services.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    /// The health route, if enabled.
    #[must_use]
    pub fn health_path(&self) -> Option<&str> {
        self.config.health_path()
    }

    /// The runtime configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Checks the parts that cannot be checked by construction.
    pub(crate) fn validate(&self) -> Result<(), ServerError> {
        if self.rpc.local_addr() == self.gateway.local_addr() {
            return Err(ServerError::InvalidParams(format!(
                "rpc and gateway share listener address {}",
                self.rpc.local_addr()
            )));
        }

        let health = self.config.health_path();
        if let Some(path) = health {
            check_path(path)?;
        }

        let mut seen = HashSet::new();
        for (path, _) in &self.http_handlers {
            check_path(path)?;
            if health == Some(path.as_str()) {
                return Err(ServerError::InvalidParams(format!(
                    "http handler on {path} shadows the health check"
                )));
            }
            if !seen.insert(path.as_str()) {
                return Err(ServerError::InvalidParams(format!(
                    "duplicate http handler for {path}"
                )));
            }
        }
        Ok(())
    }
}

fn check_path(path: &str) -> Result<(), ServerError> {
    if path.starts_with('/') {
        Ok(())
    } else {
        Err(ServerError::InvalidParams(format!(
            "path '{path}' must start with '/'"
        )))
    }
}

impl std::fmt::Debug for ServerParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerParams")
            .field("rpc", &self.rpc.local_addr())
            .field("gateway", &self.gateway.local_addr())
            .field("registrations", &self.registrations.len())
            .field("tls", &self.tls.is_some())
            .field(
                "http_handlers",
                &self.http_handlers.iter().map(|(p, _)| p).collect::<Vec<_>>(),
            )
            .field("config", &self.config)
            .finish()
    }
}
