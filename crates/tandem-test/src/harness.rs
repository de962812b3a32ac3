//! A running server on ephemeral loopback ports, with clients for both
//! transports.

use std::net::SocketAddr;
use std::time::Duration;

use http::Method;
use tandem_server::{acquire_on, Server, ServerConfig, ServerParams, ShutdownReport};
use tonic::transport::{Channel, Endpoint};

use crate::diagnostics::FakeDiagnostics;
use crate::error::TestError;
use crate::frontend::FakeFrontend;
use crate::proto::v1::diagnostics_service_client::DiagnosticsServiceClient;
use crate::proto::v1::frontend_service_client::FrontendServiceClient;
use crate::registration::{DiagnosticsRegistration, FrontendRegistration};
use crate::response::GatewayResponse;
use crate::tls;

const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

type Configure = Box<dyn FnOnce(&mut ServerParams) + Send>;

/// Builder for [`TestServer`].
#[must_use]
pub struct TestServerBuilder {
    tls: bool,
    config: Option<ServerConfig>,
    configure: Vec<Configure>,
}

impl TestServerBuilder {
    /// Serves both transports with the test certificate.
    pub fn tls(mut self) -> Self {
        self.tls = true;
        self
    }

    /// Uses `config` instead of the defaults.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Adjusts the params after the fixture services are registered.
    pub fn configure(mut self, f: impl FnOnce(&mut ServerParams) + Send + 'static) -> Self {
        self.configure.push(Box::new(f));
        self
    }

    /// Acquires two loopback listeners and starts the server.
    pub async fn start(self) -> Result<TestServer, TestError> {
        let loopback: SocketAddr = SocketAddr::from(([127, 0, 0, 1], 0));
        let mut params = ServerParams::from_listeners(acquire_on(loopback)?, acquire_on(loopback)?);

        let frontend = FakeFrontend::new();
        let diagnostics = FakeDiagnostics::new();
        params
            .add_registration(FrontendRegistration::new(frontend.clone()))
            .add_registration(DiagnosticsRegistration::new(diagnostics.clone()));
        if let Some(config) = self.config {
            params.with_config(config);
        }
        if self.tls {
            params.with_tls(tls::server_tls());
        }
        for configure in self.configure {
            configure(&mut params);
        }

        let http = if self.tls {
            tls::https_client()?
        } else {
            reqwest::Client::builder().timeout(CLIENT_TIMEOUT).build()?
        };

        let mut server = Server::new();
        server.start(params).await?;

        Ok(TestServer {
            server,
            tls: self.tls,
            http,
            frontend,
            diagnostics,
        })
    }
}

/// A started [`Server`] hosting [`FakeFrontend`] and [`FakeDiagnostics`].
///
/// ```rust,ignore
/// let server = TestServer::start().await?;
/// server
///     .post_json("/v1/frontendservice/tickets", &json!({}))
///     .await?
///     .assert_status(StatusCode::OK)
///     .assert_body_eq("{}");
/// ```
pub struct TestServer {
    server: Server,
    tls: bool,
    http: reqwest::Client,
    frontend: FakeFrontend,
    diagnostics: FakeDiagnostics,
}

impl TestServer {
    /// Starts a plaintext server with default configuration.
    pub async fn start() -> Result<Self, TestError> {
        Self::builder().start().await
    }

    /// Returns a builder.
    pub fn builder() -> TestServerBuilder {
        TestServerBuilder {
            tls: false,
            config: None,
            configure: Vec::new(),
        }
    }

    fn scheme(&self) -> &'static str {
        if self.tls {
            "https"
        } else {
            "http"
        }
    }

    /// The gateway's address.
    ///
    /// # Panics
    ///
    /// Panics once the server has been stopped.
    #[must_use]
    pub fn gateway_addr(&self) -> SocketAddr {
        self.server.gateway_addr().expect("server is running")
    }

    /// The RPC server's address.
    ///
    /// # Panics
    ///
    /// Panics once the server has been stopped.
    #[must_use]
    pub fn rpc_addr(&self) -> SocketAddr {
        self.server.rpc_addr().expect("server is running")
    }

    /// Absolute gateway URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}://{}{path}", self.scheme(), self.gateway_addr())
    }

    /// URI for dialing the RPC server.
    #[must_use]
    pub fn rpc_uri(&self) -> String {
        format!("{}://{}", self.scheme(), self.rpc_addr())
    }

    /// Starts a gateway request; finish it with [`TestServer::send`].
    pub fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.http.request(method, self.url(path))
    }

    /// Sends a request and reads the whole response.
    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<GatewayResponse, TestError> {
        let response = request.send().await?;
        GatewayResponse::from_reqwest(response).await
    }

    /// `GET path`.
    pub async fn get(&self, path: &str) -> Result<GatewayResponse, TestError> {
        self.send(self.request(Method::GET, path)).await
    }

    /// `POST path` with a JSON body.
    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<GatewayResponse, TestError> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    /// `DELETE path`.
    pub async fn delete(&self, path: &str) -> Result<GatewayResponse, TestError> {
        self.send(self.request(Method::DELETE, path)).await
    }

    /// Opens a channel to the RPC server, over TLS when the server uses it.
    pub async fn rpc_channel(&self) -> Result<Channel, TestError> {
        let mut endpoint = Endpoint::from_shared(self.rpc_uri())?.timeout(CLIENT_TIMEOUT);
        if self.tls {
            endpoint = endpoint.tls_config(tls::grpc_client_tls())?;
        }
        Ok(endpoint.connect().await?)
    }

    /// A `FrontendService` client over a fresh channel.
    pub async fn frontend_client(&self) -> Result<FrontendServiceClient<Channel>, TestError> {
        Ok(FrontendServiceClient::new(self.rpc_channel().await?))
    }

    /// A `DiagnosticsService` client over a fresh channel.
    pub async fn diagnostics_client(&self) -> Result<DiagnosticsServiceClient<Channel>, TestError> {
        Ok(DiagnosticsServiceClient::new(self.rpc_channel().await?))
    }

    /// The frontend fixture behind both transports.
    #[must_use]
    pub fn frontend(&self) -> &FakeFrontend {
        &self.frontend
    }

    /// The diagnostics fixture behind both transports.
    #[must_use]
    pub fn diagnostics(&self) -> &FakeDiagnostics {
        &self.diagnostics
    }

    /// The underlying server.
    #[must_use]
    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Stops the server.
    pub async fn stop(&mut self) -> ShutdownReport {
        self.server.stop().await
    }
}

impl std::fmt::Debug for TestServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestServer")
            .field("server", &self.server)
            .field("tls", &self.tls)
            .finish_non_exhaustive()
    }
}
