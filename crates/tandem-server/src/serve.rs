//! The accept loop shared by the RPC server and the gateway.
//!
//! Each accepted connection runs on its own task inside a [`JoinSet`] owned
//! by the loop. Draining stops the accept loop and asks every connection to
//! finish its in-flight requests (HTTP/2 `GOAWAY`, HTTP/1 close after the
//! current response). Aborting the loop drops the set, which aborts every
//! connection task and closes its socket.

use std::convert::Infallible;
use std::error::Error as StdError;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, Response};
use hyper::body::{Body, Incoming};
use hyper::service::Service;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio_rustls::TlsAcceptor;

use crate::error::{ServerError, SubServer};
use crate::lifecycle::StopOutcome;
use crate::listener::Listener;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

// Pause after a resource error (e.g. EMFILE) so the loop does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

// How long a forced stop waits for aborted connections to release sockets.
const ABORT_SETTLE: Duration = Duration::from_secs(1);

/// A running serve loop.
#[derive(Debug)]
pub(crate) struct ServeHandle {
    server: SubServer,
    addr: SocketAddr,
    drain: ShutdownSignal,
    tracker: ConnectionTracker,
    accept_error: AcceptError,
    task: JoinHandle<()>,
}

// The most recent non-transient accept failure of a loop.
type AcceptError = Arc<Mutex<Option<String>>>;

/// Starts a serve loop on its own task.
///
/// The returned receiver resolves once the loop is polling for connections.
pub(crate) fn spawn<S, B>(
    server: SubServer,
    listener: Listener,
    service: S,
    tls: Option<TlsAcceptor>,
) -> Result<(ServeHandle, oneshot::Receiver<()>), ServerError>
where
    S: Service<Request<Incoming>, Response = Response<B>, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let addr = listener.local_addr();
    let listener = listener
        .into_tokio()
        .map_err(|source| ServerError::Listener { server, source })?;

    let drain = ShutdownSignal::new();
    let tracker = ConnectionTracker::new();
    let accept_error = AcceptError::default();
    let (ready_tx, ready_rx) = oneshot::channel();

    let task = tokio::spawn(accept_loop(
        server,
        listener,
        service,
        tls,
        drain.clone(),
        tracker.clone(),
        accept_error.clone(),
        ready_tx,
    ));

    let handle = ServeHandle {
        server,
        addr,
        drain,
        tracker,
        accept_error,
        task,
    };
    Ok((handle, ready_rx))
}

impl ServeHandle {
    /// The address the loop is bound to.
    pub(crate) fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Drains the loop, forcing it closed once `grace` elapses.
    pub(crate) async fn stop(mut self, grace: Duration) -> StopOutcome {
        self.drain.trigger();

        match tokio::time::timeout(grace, &mut self.task).await {
            Ok(Ok(())) => match self.accept_error.lock().take() {
                Some(reason) => StopOutcome::Failed(format!("accept failed: {reason}")),
                None => StopOutcome::Drained,
            },
            Ok(Err(e)) => StopOutcome::Failed(e.to_string()),
            Err(_) => {
                tracing::warn!(
                    transport = %self.server,
                    connections = self.tracker.active_connections(),
                    grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                    "grace period elapsed, forcing connections closed"
                );
                self.task.abort();
                let _ = (&mut self.task).await;
                let _ = tokio::time::timeout(ABORT_SETTLE, self.tracker.wait_idle()).await;
                StopOutcome::Forced
            }
        }
    }

    /// Aborts the loop and its connections without waiting.
    pub(crate) fn abort(&self) {
        self.drain.trigger();
        self.task.abort();
    }
}

// A handle dropped without `stop` (failed start, dropped `Server`) takes its
// loop down with it.
impl Drop for ServeHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

async fn accept_loop<S, B>(
    server: SubServer,
    listener: TcpListener,
    service: S,
    tls: Option<TlsAcceptor>,
    drain: ShutdownSignal,
    tracker: ConnectionTracker,
    accept_error: AcceptError,
    ready: oneshot::Sender<()>,
) where
    S: Service<Request<Incoming>, Response = Response<B>, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let mut connections = JoinSet::new();
    let drained = drain.recv();
    tokio::pin!(drained);

    let _ = ready.send(());
    tracing::info!(transport = %server, addr = ?listener.local_addr().ok(), tls = tls.is_some(), "serving");

    loop {
        tokio::select! {
            biased;

            () = &mut drained => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, remote)) => {
                    let token = tracker.acquire();
                    let service = service.clone();
                    let tls = tls.clone();
                    let drain = drain.clone();
                    connections.spawn(async move {
                        let _token = token;
                        match tls {
                            Some(acceptor) => {
                                let handshake = tokio::select! {
                                    res = acceptor.accept(stream) => res,
                                    () = drain.recv() => return,
                                };
                                match handshake {
                                    Ok(stream) => serve_connection(server, remote, stream, service, drain).await,
                                    Err(e) => tracing::debug!(transport = %server, %remote, error = %e, "tls handshake failed"),
                                }
                            }
                            None => serve_connection(server, remote, stream, service, drain).await,
                        }
                    });
                }
                Err(e) if is_transient(&e) => {
                    tracing::debug!(transport = %server, error = %e, "accept interrupted");
                }
                Err(e) => {
                    tracing::error!(transport = %server, error = %e, "accept failed");
                    *accept_error.lock() = Some(e.to_string());
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },

            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        tracing::error!(transport = %server, "connection task panicked");
                    }
                }
            }
        }
    }

    drop(listener);
    tracing::info!(
        transport = %server,
        connections = tracker.active_connections(),
        "stopped accepting, draining"
    );

    while connections.join_next().await.is_some() {}
    tracing::info!(transport = %server, "drained");
}

async fn serve_connection<I, S, B>(
    server: SubServer,
    remote: SocketAddr,
    io: I,
    service: S,
    drain: ShutdownSignal,
) where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    S: Service<Request<Incoming>, Response = Response<B>, Error = Infallible> + Send + 'static,
    S::Future: Send + 'static,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let builder = auto::Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection(TokioIo::new(io), service);
    tokio::pin!(conn);

    let drained = drain.recv();
    tokio::pin!(drained);

    let result = tokio::select! {
        res = conn.as_mut() => res,
        () = &mut drained => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = result {
        tracing::debug!(transport = %server, %remote, error = %e, "connection closed with error");
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}
