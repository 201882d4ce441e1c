//! Socket helpers shared by the control client and the session
//!
//! Thin wrappers over tokio networking that apply the crate's timeout and
//! port-binding conventions.


use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpStream, UdpSocket};

use crate::error::RaopError;

/// Runtime abstraction for common operations
pub struct Runtime;

impl Runtime {
    /// Sleep for the specified duration
    pub async fn sleep(duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Run a future with a timeout
    ///
    /// # Errors
    ///
    /// Returns `RaopError::Timeout` if the future does not complete in time.
    pub async fn timeout<F, T>(duration: Duration, future: F) -> Result<T, RaopError>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout(duration, future)
            .await
            .map_err(|_| RaopError::Timeout { duration })
    }

    /// Run a future with an optional timeout
    ///
    /// # Errors
    ///
    /// Returns `RaopError::Timeout` if a limit is set and elapses.
    pub async fn maybe_timeout<F, T>(duration: Option<Duration>, future: F) -> Result<T, RaopError>
    where
        F: Future<Output = T>,
    {
        match duration {
            Some(limit) => Self::timeout(limit, future).await,
            None => Ok(future.await),
        }
    }
}

/// Open a TCP connection to `host:port`
///
/// # Errors
///
/// Returns `ConnectionFailed` if the receiver refuses or is unreachable, or
/// `Timeout` if `connect_timeout` elapses first.
pub async fn connect_tcp(
    host: &str,
    port: u16,
    connect_timeout: Duration,
) -> Result<TcpStream, RaopError> {
    let addr = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };
    tracing::debug!(%addr, "Connecting RTSP control channel");

    let stream = Runtime::timeout(connect_timeout, TcpStream::connect(&addr))
        .await?
        .map_err(|e| RaopError::ConnectionFailed {
            host: host.to_string(),
            port,
            message: e.to_string(),
            source: Some(e),
        })?;

    // Small request/response exchanges; do not wait on Nagle.
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("Failed to set TCP_NODELAY: {}", e);
    }

    Ok(stream)
}

/// Bind a UDP socket on `port`, or on an ephemeral port when `port` is 0
///
/// Ephemeral binds try the IPv4 wildcard, then IPv4 loopback, then the IPv6
/// wildcard.
///
/// # Errors
///
/// Returns the bind error when every candidate address fails.
pub async fn bind_udp(port: u16) -> std::io::Result<UdpSocket> {
    if port != 0 {
        return UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], port))).await;
    }

    if let Ok(sock) = UdpSocket::bind("0.0.0.0:0").await {
        return Ok(sock);
    }

    if let Ok(sock) = UdpSocket::bind("127.0.0.1:0").await {
        return Ok(sock);
    }

    UdpSocket::bind("[::]:0").await
}
