use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::headers::names;
use super::{Headers, Method, RtspCodec, RtspRequest, RtspResponse};
use crate::error::RaopError;
use crate::net::{self, Runtime};
use crate::types::DEFAULT_USER_AGENT;

/// RTSP client over one persistent TCP connection
///
/// Requests are strictly sequential: each call writes a request and waits
/// for its full response before returning.
#[derive(Debug)]
pub struct RtspClient {
    host: String,
    port: u16,
    stream: Option<TcpStream>,
    codec: RtspCodec,
    cseq: u32,
    user_agent: String,
    connect_timeout: Duration,
    request_timeout: Option<Duration>,
}

impl RtspClient {
    /// Create a client for `host:port` (not yet connected)
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            stream: None,
            codec: RtspCodec::new(),
            cseq: 0,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: None,
        }
    }

    /// Set the `User-Agent` injected when a request has none
    #[must_use]
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Set the TCP connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bound every round trip (`None` waits indefinitely)
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Open the TCP connection
    ///
    /// # Errors
    ///
    /// Returns `ConnectionFailed` if the receiver is unreachable or refuses,
    /// `Timeout` if the connect timeout elapses.
    pub async fn connect(&mut self) -> Result<(), RaopError> {
        let stream = net::connect_tcp(&self.host, self.port, self.connect_timeout).await?;
        self.codec.reset();
        self.stream = Some(stream);
        tracing::debug!(host = %self.host, port = self.port, "RTSP connected");
        Ok(())
    }

    /// Whether a connection is open
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Local address of the control connection
    ///
    /// # Errors
    ///
    /// Returns `Disconnected` when no connection is open.
    pub fn local_addr(&self) -> Result<SocketAddr, RaopError> {
        let stream = self.stream.as_ref().ok_or(RaopError::Disconnected)?;
        Ok(stream.local_addr()?)
    }

    /// Remote address of the control connection
    ///
    /// # Errors
    ///
    /// Returns `Disconnected` when no connection is open.
    pub fn peer_addr(&self) -> Result<SocketAddr, RaopError> {
        let stream = self.stream.as_ref().ok_or(RaopError::Disconnected)?;
        Ok(stream.peer_addr()?)
    }

    /// Last `CSeq` that was sent (0 before the first request)
    #[must_use]
    pub fn cseq(&self) -> u32 {
        self.cseq
    }

    /// Send one request and wait for its response
    ///
    /// Writes `CSeq` first, then `headers` in order, then `User-Agent` if
    /// the caller did not supply one. `Content-Length` is added when `body`
    /// is present.
    ///
    /// # Errors
    ///
    /// Returns `Disconnected` if the connection is closed, `ConnectionFailed`
    /// on a read/write failure, `Timeout` if the request timeout elapses, or
    /// `Rtsp` if the response cannot be parsed.
    pub async fn send_request(
        &mut self,
        method: Method,
        url: &str,
        headers: Headers,
        body: Option<Vec<u8>>,
    ) -> Result<RtspResponse, RaopError> {
        self.cseq += 1;

        let mut builder = RtspRequest::builder(method, url)
            .cseq(self.cseq)
            .headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let mut request = builder.build();
        request
            .headers
            .insert_if_absent(names::USER_AGENT, self.user_agent.clone());

        let result = Runtime::maybe_timeout(self.request_timeout, self.round_trip(&request)).await;
        match result {
            Ok(inner) => inner,
            Err(e) => {
                // Buffered bytes stay in the codec; the late reply is discarded by CSeq.
                tracing::warn!(%method, url, cseq = self.cseq, "RTSP request timed out");
                Err(e)
            }
        }
    }

    async fn round_trip(&mut self, request: &RtspRequest) -> Result<RtspResponse, RaopError> {
        let encoded = request.encode();
        let expected = request.headers.cseq().unwrap_or(self.cseq);
        let (host, port) = (self.host.clone(), self.port);
        let stream = self.stream.as_mut().ok_or(RaopError::Disconnected)?;
        let io_failure = |e: std::io::Error| RaopError::ConnectionFailed {
            host: host.clone(),
            port,
            message: e.to_string(),
            source: Some(e),
        };

        if request.body.is_empty() || std::str::from_utf8(&request.body).is_ok() {
            tracing::debug!(">> RTSP request:\n{}", String::from_utf8_lossy(&encoded).trim());
        } else {
            tracing::debug!(
                ">> RTSP request {} {} (binary body, {} bytes)",
                request.method,
                request.uri,
                request.body.len()
            );
        }

        stream.write_all(&encoded).await.map_err(io_failure)?;
        stream.flush().await.map_err(io_failure)?;

        let mut buf = vec![0u8; 4096];
        loop {
            if let Some(response) = self.codec.decode()? {
                if let Some(stale) = response.cseq().filter(|&seq| seq != expected) {
                    tracing::debug!(
                        stale,
                        expected,
                        status = response.status.as_u16(),
                        "Discarding late RTSP response"
                    );
                    continue;
                }
                tracing::debug!(
                    status = response.status.as_u16(),
                    reason = %response.reason,
                    body_len = response.body.len(),
                    "<< RTSP response"
                );
                return Ok(response);
            }

            let n = stream.read(&mut buf).await.map_err(io_failure)?;
            if n == 0 {
                return self
                    .codec
                    .finish()
                    .filter(|r| r.cseq().is_none_or(|seq| seq == expected))
                    .ok_or(RaopError::Disconnected);
            }
            self.codec.feed(&buf[..n])?;
        }
    }

    /// Close the connection
    ///
    /// Safe to call any number of times.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::debug!("RTSP shutdown error (ignored): {}", e);
            }
            tracing::debug!(host = %self.host, "RTSP connection closed");
        }
        self.codec.reset();
    }
}
