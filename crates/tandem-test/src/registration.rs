//! Ready-made registrations for the fixture services.
//!
//! | Route | RPC |
//! |-------|-----|
//! | `POST /v1/frontendservice/tickets` | `FrontendService/CreateTicket` |
//! | `GET /v1/frontendservice/tickets/{ticket_id}` | `FrontendService/GetTicket` |
//! | `DELETE /v1/frontendservice/tickets/{ticket_id}` | `FrontendService/DeleteTicket` |
//! | `POST /v1/diagnostics/echo` | `DiagnosticsService/Echo` |
//! | `GET /v1/diagnostics/echo/{message}` | `DiagnosticsService/Echo` |
//! | `POST /v1/diagnostics/sleep` | `DiagnosticsService/Sleep` |
//! | `POST /v1/diagnostics/panic` | `DiagnosticsService/Panic` |

use http::Method;
use tandem_server::{GatewayMux, RpcEndpoint, RpcRegistry, ServerError, ServiceRegistration};
use tonic::transport::Channel;

use crate::diagnostics::FakeDiagnostics;
use crate::frontend::FakeFrontend;
use crate::proto::methods;
use crate::proto::v1::diagnostics_service_client::DiagnosticsServiceClient;
use crate::proto::v1::diagnostics_service_server::DiagnosticsServiceServer;
use crate::proto::v1::frontend_service_client::FrontendServiceClient;
use crate::proto::v1::frontend_service_server::FrontendServiceServer;
use crate::proto::v1::{
    CreateTicketRequest, DeleteTicketRequest, EchoRequest, GetTicketRequest, PanicRequest,
    SleepRequest,
};

/// Binds a unary route that forwards through a cloned generated client.
macro_rules! forward {
    ($mux:expr, $client:expr, $method:expr, $pattern:expr, $rpc:expr, $req:ty, $call:ident) => {{
        let client = $client.clone();
        $mux.unary($method, $pattern, $rpc, move |req: tonic::Request<$req>| {
            let mut client = client.clone();
            async move { client.$call(req).await }
        })?;
    }};
}

/// Binds the `FrontendService` routes.
pub fn register_frontend_routes(
    mux: &mut GatewayMux,
    endpoint: &RpcEndpoint,
) -> Result<(), ServerError> {
    let client: FrontendServiceClient<Channel> = FrontendServiceClient::new(endpoint.channel());
    forward!(mux, client, Method::POST, "/v1/frontendservice/tickets", methods::CREATE_TICKET, CreateTicketRequest, create_ticket);
    forward!(mux, client, Method::GET, "/v1/frontendservice/tickets/{ticket_id}", methods::GET_TICKET, GetTicketRequest, get_ticket);
    forward!(mux, client, Method::DELETE, "/v1/frontendservice/tickets/{ticket_id}", methods::DELETE_TICKET, DeleteTicketRequest, delete_ticket);
    Ok(())
}

/// Binds the `DiagnosticsService` routes.
pub fn register_diagnostics_routes(
    mux: &mut GatewayMux,
    endpoint: &RpcEndpoint,
) -> Result<(), ServerError> {
    let client: DiagnosticsServiceClient<Channel> =
        DiagnosticsServiceClient::new(endpoint.channel());
    forward!(mux, client, Method::POST, "/v1/diagnostics/echo", methods::ECHO, EchoRequest, echo);
    forward!(mux, client, Method::GET, "/v1/diagnostics/echo/{message}", methods::ECHO, EchoRequest, echo);
    forward!(mux, client, Method::POST, "/v1/diagnostics/sleep", methods::SLEEP, SleepRequest, sleep);
    forward!(mux, client, Method::POST, "/v1/diagnostics/panic", methods::PANIC, PanicRequest, panic);
    Ok(())
}

/// Registers a [`FakeFrontend`] on both transports.
#[derive(Debug, Clone)]
pub struct FrontendRegistration {
    service: FakeFrontend,
}

impl FrontendRegistration {
    /// Wraps `service`; the caller keeps a clone to inspect its state.
    #[must_use]
    pub fn new(service: FakeFrontend) -> Self {
        Self { service }
    }
}

impl ServiceRegistration for FrontendRegistration {
    fn register_rpc(&self, registry: &mut RpcRegistry) {
        registry.add_service(FrontendServiceServer::new(self.service.clone()));
    }

    fn register_gateway(
        &self,
        mux: &mut GatewayMux,
        endpoint: &RpcEndpoint,
    ) -> Result<(), ServerError> {
        register_frontend_routes(mux, endpoint)
    }
}

/// Registers a [`FakeDiagnostics`] on both transports.
#[derive(Debug, Clone)]
pub struct DiagnosticsRegistration {
    service: FakeDiagnostics,
}

impl DiagnosticsRegistration {
    /// Wraps `service`; the caller keeps a clone to inspect its counters.
    #[must_use]
    pub fn new(service: FakeDiagnostics) -> Self {
        Self { service }
    }
}

impl ServiceRegistration for DiagnosticsRegistration {
    fn register_rpc(&self, registry: &mut RpcRegistry) {
        registry.add_service(DiagnosticsServiceServer::new(self.service.clone()));
    }

    fn register_gateway(
        &self,
        mux: &mut GatewayMux,
        endpoint: &RpcEndpoint,
    ) -> Result<(), ServerError> {
        register_diagnostics_routes(mux, endpoint)
    }
}
