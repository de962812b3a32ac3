//! The server lifecycle controller.
//!
//! A [`Server`] starts the RPC server and the gateway as one unit and stops
//! them the same way:
//!
//! ```text
//! Idle ──start──▶ Starting ──▶ Running ──stop──▶ Stopping ──▶ Stopped
//!                    │
//!                    └── failure: roll back, back to Idle
//! ```
//!
//! The RPC server is accepting before the gateway connects to it, and the
//! gateway is accepting before `start` returns. `stop` never fails: it
//! reports how each sub-server went down in a [`ShutdownReport`].

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::{ServerError, SubServer};
use crate::gateway::{self, GatewayMux, GatewayState, RpcEndpoint};
use crate::health::HealthCheck;
use crate::params::ServerParams;
use crate::rpc::{self, RpcRegistry};
use crate::serve::ServeHandle;
use crate::shutdown::ShutdownSignal;

/// Where a [`Server`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Constructed, never started.
    Idle,
    /// `start` is in progress.
    Starting,
    /// Both sub-servers are accepting.
    Running,
    /// `stop` is draining both sub-servers.
    Stopping,
    /// Both sub-servers are gone. Terminal.
    Stopped,
}

impl LifecycleState {
    /// Lower-case name, as used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one sub-server went down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// Every in-flight request finished within the grace period.
    Drained,
    /// The grace period elapsed; remaining connections were closed.
    Forced,
    /// The serve loop panicked or could not accept connections.
    Failed(String),
    /// There was nothing to stop.
    NotRunning,
}

impl StopOutcome {
    /// Returns `true` unless requests may have been cut off.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Drained | Self::NotRunning)
    }
}

impl fmt::Display for StopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drained => f.write_str("drained"),
            Self::Forced => f.write_str("forced"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::NotRunning => f.write_str("not running"),
        }
    }
}

/// Per-sub-server result of [`Server::stop`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// How the RPC server went down.
    pub rpc: StopOutcome,
    /// How the gateway went down.
    pub gateway: StopOutcome,
}

impl ShutdownReport {
    fn not_running() -> Self {
        Self {
            rpc: StopOutcome::NotRunning,
            gateway: StopOutcome::NotRunning,
        }
    }

    /// Returns `true` if both sub-servers stopped cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rpc.is_clean() && self.gateway.is_clean()
    }
}

impl fmt::Display for ShutdownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rpc {}, gateway {}", self.rpc, self.gateway)
    }
}

struct Running {
    rpc: ServeHandle,
    gateway: ServeHandle,
    endpoint: RpcEndpoint,
    health: Option<HealthCheck>,
    grace: Duration,
}

/// A dual-protocol server: one RPC listener and one JSON/HTTP gateway
/// listener serving the same registered services.
///
/// # Example
///
/// ```rust,ignore
/// let mut server = Server::new();
/// server.start(params).await?;
/// let report = server.serve_until(ShutdownSignal::with_os_signals()).await;
/// tracing::info!(%report, "server stopped");
/// ```
pub struct Server {
    state: LifecycleState,
    running: Option<Running>,
}

impl Server {
    /// Creates an idle server.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Idle,
            running: None,
        }
    }

    /// Starts both sub-servers.
    ///
    /// Returns once both are accepting connections. On failure anything
    /// already started is torn down and the server is back in
    /// [`LifecycleState::Idle`], so `start` may be retried with fresh
    /// params.
    ///
    /// # Errors
    ///
    /// - [`ServerError::AlreadyRunning`] / [`ServerError::NotRestartable`]
    ///   outside `Idle`
    /// - configuration, TLS, registration or startup failures, naming the
    ///   sub-server involved
    pub async fn start(&mut self, params: ServerParams) -> Result<(), ServerError> {
        match self.state {
            // A cancelled `start` leaves `Starting` behind with nothing running.
            LifecycleState::Idle | LifecycleState::Starting => {}
            LifecycleState::Running | LifecycleState::Stopping => {
                return Err(ServerError::AlreadyRunning)
            }
            LifecycleState::Stopped => return Err(ServerError::NotRestartable),
        }

        self.state = LifecycleState::Starting;
        tracing::info!(
            rpc_port = params.rpc_port(),
            gateway_port = params.gateway_port(),
            registrations = params.registration_count(),
            "starting server"
        );

        match launch(params).await {
            Ok(running) => {
                tracing::info!(
                    rpc = %running.rpc.addr(),
                    gateway = %running.gateway.addr(),
                    "server running"
                );
                self.running = Some(running);
                self.state = LifecycleState::Running;
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    category = e.category(),
                    sub_server = e.sub_server().map(SubServer::as_str),
                    "server failed to start"
                );
                self.state = LifecycleState::Idle;
                Err(e)
            }
        }
    }

    /// Stops both sub-servers, draining in-flight requests.
    ///
    /// Each sub-server gets the configured grace period before its
    /// remaining connections are closed. Calling `stop` when the server is
    /// not running does nothing and reports [`StopOutcome::NotRunning`].
    pub async fn stop(&mut self) -> ShutdownReport {
        let Some(running) = self.running.take() else {
            tracing::debug!(state = %self.state, "stop requested, nothing running");
            return ShutdownReport::not_running();
        };

        self.state = LifecycleState::Stopping;
        tracing::info!(grace_ms = u64::try_from(running.grace.as_millis()).unwrap_or(u64::MAX), "stopping server");
        if let Some(health) = &running.health {
            health.set_draining();
        }

        let Running {
            rpc,
            gateway,
            endpoint,
            grace,
            ..
        } = running;
        drop(endpoint);
        let (rpc, gateway) = tokio::join!(rpc.stop(grace), gateway.stop(grace));
        let report = ShutdownReport { rpc, gateway };

        self.state = LifecycleState::Stopped;
        if report.is_clean() {
            tracing::info!(%report, "server stopped");
        } else {
            tracing::warn!(%report, "server stopped with degraded shutdown");
        }
        report
    }

    /// Serves until `signal` fires, then stops.
    ///
    /// Returns immediately with the stop report if the server is not
    /// running.
    pub async fn serve_until(&mut self, signal: ShutdownSignal) -> ShutdownReport {
        if self.state == LifecycleState::Running {
            signal.recv().await;
            tracing::info!("shutdown signal received");
        }
        self.stop().await
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Bound address of the RPC server while running.
    #[must_use]
    pub fn rpc_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.rpc.addr())
    }

    /// Bound address of the gateway while running.
    #[must_use]
    pub fn gateway_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.gateway.addr())
    }

    /// The gateway's connection to the RPC server while running.
    #[must_use]
    pub fn rpc_endpoint(&self) -> Option<&RpcEndpoint> {
        self.running.as_ref().map(|r| &r.endpoint)
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("state", &self.state)
            .field("rpc_addr", &self.rpc_addr())
            .field("gateway_addr", &self.gateway_addr())
            .finish()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if self.running.take().is_some() {
            tracing::warn!("server dropped while running, aborting both sub-servers");
        }
    }
}

/// Brings both sub-servers up. Handles dropped on an error path abort their
/// loops, which rolls back whatever was started.
async fn launch(params: ServerParams) -> Result<Running, ServerError> {
    params.validate()?;
    let ServerParams {
        rpc: rpc_listener,
        gateway: gateway_listener,
        registrations,
        tls,
        http_handlers,
        config,
    } = params;

    let tls = tls
        .map(|material| material.resolve(config.tls_server_name()))
        .transpose()?;

    let mut registry = RpcRegistry::new();
    for registration in &registrations {
        registration.register_rpc(&mut registry);
    }

    let rpc_target = rpc_listener.loopback_addr();
    let (rpc, rpc_ready) = rpc::spawn(rpc_listener, registry, tls.as_ref())?;
    wait_ready(SubServer::Rpc, rpc_ready, config.startup_timeout()).await?;

    let endpoint = RpcEndpoint::connect(rpc_target, tls.as_ref(), config.startup_timeout()).await?;
    let mut mux = GatewayMux::new();
    for registration in &registrations {
        registration.register_gateway(&mut mux, &endpoint)?;
    }

    let health = config
        .health_path()
        .map(|path| (path.to_string(), HealthCheck::new()));
    let state = GatewayState {
        mux,
        http_handlers: http_handlers.into_iter().collect(),
        health: health.clone(),
        max_body_bytes: config.max_body_bytes(),
        request_timeout: config.request_timeout(),
    };
    let (gateway, gateway_ready) = gateway::spawn(gateway_listener, state, tls.as_ref())?;
    wait_ready(SubServer::Gateway, gateway_ready, config.startup_timeout()).await?;

    Ok(Running {
        rpc,
        gateway,
        endpoint,
        health: health.map(|(_, check)| check),
        grace: config.shutdown_grace(),
    })
}

async fn wait_ready(
    server: SubServer,
    ready: oneshot::Receiver<()>,
    timeout: Duration,
) -> Result<(), ServerError> {
    match tokio::time::timeout(timeout, ready).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err(ServerError::startup(
            server,
            "serve loop exited before accepting",
        )),
        Err(_) => Err(ServerError::StartupTimeout { server, timeout }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::acquire_on;

    fn params() -> ServerParams {
        let rpc = acquire_on("127.0.0.1:0".parse().unwrap()).unwrap();
        let gateway = acquire_on("127.0.0.1:0".parse().unwrap()).unwrap();
        ServerParams::from_listeners(rpc, gateway)
    }

    #[test]
    fn test_new_server_is_idle() {
        let server = Server::new();
        assert_eq!(server.state(), LifecycleState::Idle);
        assert!(server.rpc_addr().is_none());
        assert!(server.gateway_addr().is_none());
        assert!(server.rpc_endpoint().is_none());
    }

    #[tokio::test]
    async fn test_stop_before_start_is_a_no_op() {
        let mut server = Server::new();
        let report = server.stop().await;
        assert_eq!(report, ShutdownReport::not_running());
        assert!(report.is_clean());
        assert_eq!(server.state(), LifecycleState::Idle);
    }

    #[tokio::test]
    async fn test_start_and_stop_without_services() {
        let mut server = Server::new();
        server.start(params()).await.unwrap();
        assert_eq!(server.state(), LifecycleState::Running);
        assert!(server.rpc_addr().is_some());
        assert!(server.rpc_endpoint().is_some());

        let report = server.stop().await;
        assert_eq!(report.rpc, StopOutcome::Drained);
        assert_eq!(report.gateway, StopOutcome::Drained);
        assert_eq!(server.state(), LifecycleState::Stopped);
        assert!(server.rpc_addr().is_none());

        assert_eq!(server.stop().await, ShutdownReport::not_running());
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let mut server = Server::new();
        server.start(params()).await.unwrap();
        let err = server.start(params()).await.unwrap_err();
        assert!(matches!(err, ServerError::AlreadyRunning));
        assert_eq!(server.state(), LifecycleState::Running);
        server.stop().await;
    }

    #[tokio::test]
    async fn test_stopped_server_is_not_restartable() {
        let mut server = Server::new();
        server.start(params()).await.unwrap();
        server.stop().await;
        let err = server.start(params()).await.unwrap_err();
        assert!(matches!(err, ServerError::NotRestartable));
    }

    #[tokio::test]
    async fn test_failed_registration_rolls_back_to_idle() {
        let mut failing = params();
        failing.add_handler(|_rpc| {}, |_mux, _endpoint| Err(ServerError::registration("boom")));

        let mut server = Server::new();
        let err = server.start(failing).await.unwrap_err();
        assert!(matches!(err, ServerError::Registration(_)));
        assert_eq!(server.state(), LifecycleState::Idle);
        assert!(server.rpc_addr().is_none());

        server.start(params()).await.unwrap();
        assert_eq!(server.state(), LifecycleState::Running);
        server.stop().await;
    }

    #[tokio::test]
    async fn test_invalid_params_fail_fast() {
        let mut invalid = params();
        invalid.with_health_path("healthz");

        let mut server = Server::new();
        let err = server.start(invalid).await.unwrap_err();
        assert_eq!(err.category(), "configuration");
        assert_eq!(server.state(), LifecycleState::Idle);
    }

    #[tokio::test]
    async fn test_serve_until_returns_after_signal() {
        let mut server = Server::new();
        server.start(params()).await.unwrap();

        let signal = ShutdownSignal::new();
        let trigger = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.trigger();
        });

        let report = tokio::time::timeout(Duration::from_secs(10), server.serve_until(signal))
            .await
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(server.state(), LifecycleState::Stopped);
    }

    #[test]
    fn test_report_display() {
        let report = ShutdownReport {
            rpc: StopOutcome::Drained,
            gateway: StopOutcome::Forced,
        };
        assert_eq!(report.to_string(), "rpc drained, gateway forced");
        assert!(!report.is_clean());
        assert_eq!(
            StopOutcome::Failed("join error".into()).to_string(),
            "failed: join error"
        );
    }
}
