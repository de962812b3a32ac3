//! Listener provisioning.
//!
//! Listeners are bound eagerly and synchronously so the resolved port is
//! known before anything starts; the serve loop takes ownership later.
//!
//! ```rust
//! use tandem_server::listener::{acquire, resolved_port};
//!
//! let listener = acquire(0).unwrap();
//! let port: u16 = resolved_port(&listener).parse().unwrap();
//! assert!(port > 0);
//! ```

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};

use crate::error::ServerError;

/// A bound TCP listener that no serve loop owns yet.
#[derive(Debug)]
pub struct Listener {
    inner: StdTcpListener,
    local_addr: SocketAddr,
}

/// Binds a listener on all interfaces; port `0` asks the OS for a free one.
pub fn acquire(port: u16) -> Result<Listener, ServerError> {
    acquire_on(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
}

/// Binds a listener on a specific address.
pub fn acquire_on(addr: SocketAddr) -> Result<Listener, ServerError> {
    let bind_err = |source| ServerError::Bind { addr, source };

    let inner = StdTcpListener::bind(addr).map_err(bind_err)?;
    inner.set_nonblocking(true).map_err(bind_err)?;
    let local_addr = inner.local_addr().map_err(bind_err)?;

    tracing::debug!(requested = %addr, bound = %local_addr, "listener acquired");
    Ok(Listener { inner, local_addr })
}

/// The port the OS actually bound, as a decimal string.
pub fn resolved_port(listener: &Listener) -> String {
    listener.port().to_string()
}

impl Listener {
    /// The bound port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// The bound address, which may be unspecified (`0.0.0.0`).
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The address a client on this host should dial.
    #[must_use]
    pub fn loopback_addr(&self) -> SocketAddr {
        loopback_for(self.local_addr)
    }

    /// Converts into a Tokio listener. Must be called inside a runtime.
    pub fn into_tokio(self) -> io::Result<tokio::net::TcpListener> {
        tokio::net::TcpListener::from_std(self.inner)
    }
}

pub(crate) fn loopback_for(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(std::net::Ipv6Addr::LOCALHOST), addr.port())
        }
        _ => addr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_ephemeral() {
        let listener = acquire(0).unwrap();
        let port: u32 = resolved_port(&listener).parse().unwrap();
        assert!(port > 0 && port < 65536);
        assert!(listener.local_addr().ip().is_unspecified());
    }

    #[test]
    fn test_two_ephemeral_listeners_differ() {
        let a = acquire(0).unwrap();
        let b = acquire(0).unwrap();
        assert_ne!(a.port(), b.port());
    }

    #[test]
    fn test_loopback_addr() {
        let listener = acquire(0).unwrap();
        let loopback = listener.loopback_addr();
        assert!(loopback.ip().is_loopback());
        assert_eq!(loopback.port(), listener.port());

        let explicit: SocketAddr = "192.0.2.7:9000".parse().unwrap();
        assert_eq!(loopback_for(explicit), explicit);
    }

    #[test]
    fn test_bind_conflict_is_reported() {
        let held = acquire_on("127.0.0.1:0".parse().unwrap()).unwrap();
        let err = acquire_on(held.local_addr()).unwrap_err();
        match err {
            ServerError::Bind { addr, .. } => assert_eq!(addr, held.local_addr()),
            other => panic!("expected Bind, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_into_tokio_keeps_port() {
        let listener = acquire_on("127.0.0.1:0".parse().unwrap()).unwrap();
        let port = listener.port();
        let tokio_listener = listener.into_tokio().unwrap();
        assert_eq!(tokio_listener.local_addr().unwrap().port(), port);
    }
}
