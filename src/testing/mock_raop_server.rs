//! In-process RAOP receiver for tests
//!
//! Speaks enough RTSP to take a sender through OPTIONS, pairing, ANNOUNCE,
//! SETUP, RECORD, `SET_PARAMETER` and TEARDOWN, and records everything it
//! sees: requests, audio packets and control packets.

#![allow(clippy::missing_errors_doc)]

use std::collections::HashMap;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::broadcast;

use crate::protocol::crypto::{CryptoContext, SrpServer};
use crate::protocol::pairing::messages::{self, SrpChallenge};
use crate::protocol::pairing::paths;
use crate::protocol::rtp::{NtpTimestamp, TimingPacket};
use crate::protocol::rtsp::headers::names;
use crate::protocol::rtsp::{Headers, Method, RtspRequest, TransportHeader};
use crate::protocol::sdp::AnnouncedStream;

/// A request as the mock received it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Method
    pub method: Method,
    /// Request URI
    pub uri: String,
    /// Headers in wire order
    pub headers: Headers,
    /// Body bytes
    pub body: Vec<u8>,
    /// Status the mock answered with
    pub status: u16,
}

/// What the mock has seen so far
#[derive(Debug, Clone, Default)]
pub struct MockRaopState {
    /// Every RTSP request, in arrival order
    pub requests: Vec<RecordedRequest>,
    /// Parsed ANNOUNCE body
    pub announce: Option<AnnouncedStream>,
    /// Sender's control port from SETUP
    pub client_control_port: Option<u16>,
    /// Sender's timing port from SETUP
    pub client_timing_port: Option<u16>,
    /// Audio packets received
    pub audio_packets: Vec<Vec<u8>>,
    /// Control packets (sync) received
    pub control_packets: Vec<Vec<u8>>,
    /// Last volume received, in dB
    pub volume_db: Option<f32>,
    /// PIN pairing completed
    pub paired: bool,
    /// RECORD accepted
    pub recording: bool,
    /// TEARDOWN received
    pub torn_down: bool,
}

impl MockRaopState {
    /// Methods of all recorded requests, in order
    #[must_use]
    pub fn methods(&self) -> Vec<Method> {
        self.requests.iter().map(|r| r.method).collect()
    }

    /// URIs of recorded POST requests, in order
    #[must_use]
    pub fn post_paths(&self) -> Vec<String> {
        self.requests
            .iter()
            .filter(|r| r.method == Method::Post)
            .map(|r| r.uri.clone())
            .collect()
    }

    /// First request with `method`
    #[must_use]
    pub fn request(&self, method: Method) -> Option<&RecordedRequest> {
        self.requests.iter().find(|r| r.method == method)
    }
}

/// Mock receiver configuration
#[derive(Debug, Clone)]
pub struct MockRaopConfig {
    /// RTSP port (0 for dynamic)
    pub rtsp_port: u16,
    /// Audio port (0 for dynamic)
    pub audio_port: u16,
    /// Control port (0 for dynamic)
    pub control_port: u16,
    /// Timing port (0 for dynamic)
    pub timing_port: u16,
    /// Name reported by `GET /info`
    pub name: String,
    /// When set, `pin_gate` is answered 403 until PIN pairing succeeds
    pub pin: Option<String>,
    /// Method gated behind pairing
    pub pin_gate: Method,
    /// Include M2 in the proof reply
    pub send_server_proof: bool,
    /// Fixed status per method, answered instead of the normal handling
    pub status_overrides: HashMap<Method, u16>,
    /// Advertise control and timing ports in the SETUP reply
    pub advertise_sync_ports: bool,
    /// `Session` header value for the SETUP reply
    pub session_header: String,
    /// Hold the reply to a request URI this long before writing it
    pub reply_delays: HashMap<String, Duration>,
}

impl Default for MockRaopConfig {
    fn default() -> Self {
        Self {
            rtsp_port: 0,
            audio_port: 0,
            control_port: 0,
            timing_port: 0,
            name: "Mock RAOP".to_string(),
            pin: None,
            pin_gate: Method::Options,
            send_server_proof: true,
            status_overrides: HashMap::new(),
            advertise_sync_ports: true,
            session_header: "DEADBEEF;timeout=60".to_string(),
            reply_delays: HashMap::new(),
        }
    }
}

impl MockRaopConfig {
    /// Require PIN pairing before `gate` succeeds
    #[must_use]
    pub fn with_pin(mut self, pin: impl Into<String>, gate: Method) -> Self {
        self.pin = Some(pin.into());
        self.pin_gate = gate;
        self
    }

    /// Always answer `method` with `status`
    #[must_use]
    pub fn with_status(mut self, method: Method, status: u16) -> Self {
        self.status_overrides.insert(method, status);
        self
    }

    /// Answer requests for `uri` only after `delay`
    #[must_use]
    pub fn with_reply_delay(mut self, uri: impl Into<String>, delay: Duration) -> Self {
        self.reply_delays.insert(uri.into(), delay);
        self
    }
}

type Shared = Arc<Mutex<MockRaopState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockRaopState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock RAOP receiver
pub struct MockRaopServer {
    /// Configuration; ports are filled in by [`start`](Self::start)
    pub config: MockRaopConfig,
    state: Shared,
    running: bool,
    shutdown: Option<broadcast::Sender<()>>,
}

/// Per-connection pairing progress
struct Conn {
    config: MockRaopConfig,
    state: Shared,
    crypto: CryptoContext,
    srp: Option<SrpServer>,
}

/// Canned response
struct Reply {
    status: u16,
    headers: Headers,
    body: Vec<u8>,
}

impl Reply {
    fn status(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    fn ok() -> Self {
        Self::status(200)
    }

    fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        453 => "Not Enough Bandwidth",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

impl MockRaopServer {
    /// Create a stopped server
    #[must_use]
    pub fn new(config: MockRaopConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(MockRaopState::default())),
            running: false,
            shutdown: None,
        }
    }

    /// Bind every socket on loopback and start serving
    ///
    /// Returns the RTSP address.
    pub async fn start(&mut self) -> Result<SocketAddr, MockServerError> {
        let listener = TcpListener::bind(("127.0.0.1", self.config.rtsp_port))
            .await
            .map_err(|e| MockServerError::BindFailed(format!("RTSP: {e}")))?;
        let rtsp_addr = listener
            .local_addr()
            .map_err(|e| MockServerError::BindFailed(format!("RTSP: {e}")))?;
        self.config.rtsp_port = rtsp_addr.port();

        let audio = Self::bind_udp("audio", &mut self.config.audio_port).await?;
        let control = Self::bind_udp("control", &mut self.config.control_port).await?;
        let timing = Self::bind_udp("timing", &mut self.config.timing_port).await?;

        let crypto = CryptoContext::new()
            .map_err(|e| MockServerError::BindFailed(format!("crypto: {e}")))?;

        let (shutdown_tx, _) = broadcast::channel(1);
        self.shutdown = Some(shutdown_tx.clone());
        self.running = true;

        let state = Arc::clone(&self.state);
        let config = self.config.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            tracing::debug!(%peer, "mock receiver accepted connection");
                            let conn = Conn {
                                config: config.clone(),
                                state: Arc::clone(&state),
                                crypto: crypto.clone(),
                                srp: None,
                            };
                            tokio::spawn(conn.serve(stream));
                        }
                        Err(e) => tracing::warn!(error = %e, "mock accept failed"),
                    },
                    _ = shutdown_rx.recv() => break,
                }
            }
        });

        Self::spawn_recorder(audio, shutdown_tx.subscribe(), Arc::clone(&self.state), |s, p| {
            s.audio_packets.push(p);
        });
        Self::spawn_recorder(control, shutdown_tx.subscribe(), Arc::clone(&self.state), |s, p| {
            s.control_packets.push(p);
        });
        // Timing requests to the mock are dropped unanswered
        Self::spawn_recorder(timing, shutdown_tx.subscribe(), Arc::clone(&self.state), |_, _| {});

        Ok(rtsp_addr)
    }

    async fn bind_udp(name: &str, port: &mut u16) -> Result<UdpSocket, MockServerError> {
        let socket = UdpSocket::bind(("127.0.0.1", *port))
            .await
            .map_err(|e| MockServerError::BindFailed(format!("{name}: {e}")))?;
        *port = socket
            .local_addr()
            .map_err(|e| MockServerError::BindFailed(format!("{name}: {e}")))?
            .port();
        Ok(socket)
    }

    fn spawn_recorder(
        socket: UdpSocket,
        mut shutdown: broadcast::Receiver<()>,
        state: Shared,
        record: fn(&mut MockRaopState, Vec<u8>),
    ) {
        tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            loop {
                tokio::select! {
                    received = socket.recv_from(&mut buf) => match received {
                        Ok((n, _)) => record(&mut lock(&state), buf[..n].to_vec()),
                        Err(_) => break,
                    },
                    _ = shutdown.recv() => break,
                }
            }
        });
    }

    /// Stop serving; open connections are left to close on their own
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.running = false;
    }

    /// Whether [`start`](Self::start) succeeded and `stop` was not called
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Snapshot of what the mock has seen
    #[must_use]
    pub fn state(&self) -> MockRaopState {
        lock(&self.state).clone()
    }

    /// Wait until at least `count` audio packets arrived
    pub async fn wait_for_audio(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if lock(&self.state).audio_packets.len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        lock(&self.state).audio_packets.len() >= count
    }

    /// Send a timing request to the sender's timing port and return its reply
    pub async fn probe_timing(&self, transmit: NtpTimestamp) -> Option<Vec<u8>> {
        let port = lock(&self.state).client_timing_port?;
        let socket = UdpSocket::bind("127.0.0.1:0").await.ok()?;
        socket
            .send_to(TimingPacket::request(transmit).as_bytes(), ("127.0.0.1", port))
            .await
            .ok()?;
        let mut buf = [0u8; 128];
        let (n, _) = tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
            .await
            .ok()?
            .ok()?;
        Some(buf[..n].to_vec())
    }
}

impl Drop for MockRaopServer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Conn {
    async fn serve(mut self, mut stream: TcpStream) {
        let mut buffer = Vec::new();
        let mut chunk = vec![0u8; 4096];

        loop {
            let n = match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            buffer.extend_from_slice(&chunk[..n]);

            loop {
                match parse_request(&buffer) {
                    Ok(Some((request, consumed))) => {
                        buffer.drain(..consumed);
                        let reply = self.handle(&request);
                        let bytes = encode_reply(&request, &reply);
                        let delay = self.config.reply_delays.get(&request.uri).copied();
                        lock(&self.state).requests.push(RecordedRequest {
                            method: request.method,
                            uri: request.uri,
                            headers: request.headers,
                            body: request.body,
                            status: reply.status,
                        });
                        if let Some(delay) = delay {
                            tokio::time::sleep(delay).await;
                        }
                        if stream.write_all(&bytes).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(()) => return,
                }
            }
        }
    }

    fn handle(&mut self, request: &RtspRequest) -> Reply {
        if let Some(&status) = self.config.status_overrides.get(&request.method) {
            return Reply::status(status);
        }
        let gated = self.config.pin.is_some()
            && request.method == self.config.pin_gate
            && !lock(&self.state).paired;
        if gated {
            return Reply::status(403);
        }

        match request.method {
            Method::Options => Reply::ok().header(
                names::PUBLIC,
                "ANNOUNCE, SETUP, RECORD, PAUSE, FLUSH, TEARDOWN, OPTIONS, GET_PARAMETER, SET_PARAMETER, POST, GET",
            ),
            Method::Announce => self.announce(request),
            Method::Setup => self.setup(request),
            Method::Record => {
                lock(&self.state).recording = true;
                Reply::ok().header("Audio-Latency", "11025")
            }
            Method::SetParameter => self.set_parameter(request),
            Method::Teardown => {
                let mut state = lock(&self.state);
                state.recording = false;
                state.torn_down = true;
                Reply::ok()
            }
            Method::Post => self.post(request),
            Method::Get => self.info(request),
        }
    }

    fn announce(&self, request: &RtspRequest) -> Reply {
        let text = String::from_utf8_lossy(&request.body);
        match AnnouncedStream::parse(&text) {
            Some(stream) => {
                lock(&self.state).announce = Some(stream);
                Reply::ok()
            }
            None => {
                tracing::debug!("mock rejected SDP without an audio stream");
                Reply::status(400)
            }
        }
    }

    fn setup(&self, request: &RtspRequest) -> Reply {
        if let Some(header) = request
            .headers
            .get(names::TRANSPORT)
            .and_then(|v| TransportHeader::parse(v).ok())
        {
            let mut state = lock(&self.state);
            state.client_control_port = header.port("control_port").ok().flatten();
            state.client_timing_port = header.port("timing_port").ok().flatten();
        }

        let mut transport = format!(
            "RTP/AVP/UDP;unicast;mode=record;server_port={}",
            self.config.audio_port
        );
        if self.config.advertise_sync_ports {
            let _ = write!(
                transport,
                ";control_port={};timing_port={}",
                self.config.control_port, self.config.timing_port
            );
        }
        Reply::ok()
            .header(names::TRANSPORT, transport)
            .header(names::SESSION, self.config.session_header.clone())
            .header("Audio-Jack-Status", "connected; type=analog")
    }

    fn set_parameter(&self, request: &RtspRequest) -> Reply {
        let body = String::from_utf8_lossy(&request.body);
        let volume = body
            .lines()
            .find_map(|line| line.strip_prefix("volume:"))
            .and_then(|v| v.trim().parse::<f32>().ok());
        match volume {
            Some(db) => {
                lock(&self.state).volume_db = Some(db);
                Reply::ok()
            }
            None => Reply::status(400),
        }
    }

    fn post(&mut self, request: &RtspRequest) -> Reply {
        match request.uri.as_str() {
            paths::AUTH_SETUP if is_key_request(&request.body) => self.key_reply(&[], None),
            paths::AUTH_SETUP => Reply::status(400),
            paths::PAIR_PIN_START => Reply::ok(),
            paths::PAIR_SETUP if is_key_request(&request.body) => {
                self.key_reply(b"MOCK-CERT", Some(&[0x5A; 64][..]))
            }
            paths::PAIR_SETUP => self.pair_setup(&request.body),
            _ => Reply::status(404),
        }
    }

    /// `key(32) len cert [len signature]`
    fn key_reply(&self, certificate: &[u8], signature: Option<&[u8]>) -> Reply {
        let server = self.crypto.ephemeral_keypair();
        let mut body = server.public_key().as_bytes().to_vec();
        body.extend_from_slice(&length_prefix(certificate));
        body.extend_from_slice(certificate);
        if let Some(signature) = signature {
            body.extend_from_slice(&length_prefix(signature));
            body.extend_from_slice(signature);
        }
        Reply::ok().body(body)
    }

    fn pair_setup(&mut self, body: &[u8]) -> Reply {
        let Some(pin) = self.config.pin.clone() else {
            return Reply::status(404);
        };
        let Ok(dict) = messages::decode_request(body) else {
            return Reply::status(400);
        };
        let data = |key: &str| dict.get(key).and_then(plist::Value::as_data);

        if let Some(proof) = data(messages::keys::PROOF) {
            let (Some(srp), Some(client_public)) =
                (self.srp.take(), data(messages::keys::PUBLIC_KEY))
            else {
                return Reply::status(400);
            };
            return match srp.verify_client(client_public, proof) {
                Ok(m2) => {
                    lock(&self.state).paired = true;
                    if self.config.send_server_proof {
                        messages::server_proof_response(&m2)
                            .map_or_else(|_| Reply::status(500), |b| Reply::ok().body(b))
                    } else {
                        Reply::ok()
                    }
                }
                Err(_) => Reply::status(403),
            };
        }

        let user = dict
            .get(messages::keys::USER)
            .and_then(plist::Value::as_string)
            .unwrap_or_default()
            .to_string();
        let salt = self.crypto.random_bytes(16);
        let srp = self.crypto.srp_server(&user, &pin, &salt);
        let challenge = SrpChallenge {
            salt,
            server_public: srp.public_key().to_vec(),
        };
        self.srp = Some(srp);
        messages::challenge_response(&challenge)
            .map_or_else(|_| Reply::status(500), |b| Reply::ok().body(b))
    }

    fn info(&self, request: &RtspRequest) -> Reply {
        if request.uri != "/info" {
            return Reply::status(404);
        }
        let mut dict = plist::Dictionary::new();
        dict.insert(
            "name".to_string(),
            plist::Value::String(self.config.name.clone()),
        );
        dict.insert(
            "model".to_string(),
            plist::Value::String("MockRAOP1,1".to_string()),
        );
        dict.insert(
            "sourceVersion".to_string(),
            plist::Value::String("220.68".to_string()),
        );
        let mut body = Vec::new();
        match plist::Value::Dictionary(dict).to_writer_binary(std::io::Cursor::new(&mut body)) {
            Ok(()) => Reply::ok()
                .header(
                    names::CONTENT_TYPE,
                    crate::protocol::rtsp::headers::content_types::BINARY_PLIST,
                )
                .body(body),
            Err(_) => Reply::status(500),
        }
    }
}

/// `0x01 || pk(32)`
fn is_key_request(body: &[u8]) -> bool {
    body.len() == 33 && body[0] == 0x01
}

fn length_prefix(data: &[u8]) -> [u8; 4] {
    u32::try_from(data.len()).unwrap_or(u32::MAX).to_be_bytes()
}

fn parse_request(data: &[u8]) -> Result<Option<(RtspRequest, usize)>, ()> {
    let Some(header_end) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
        return Ok(None);
    };
    let header_len = header_end + 4;
    let head = String::from_utf8_lossy(&data[..header_end]);
    let mut lines = head.lines();
    let mut parts = lines.next().ok_or(())?.split_whitespace();
    let method = Method::parse(parts.next().ok_or(())?).ok_or(())?;
    let uri = parts.next().ok_or(())?.to_string();

    let mut headers = Headers::new();
    let mut content_length = 0;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let (name, value) = (name.trim(), value.trim());
            if name.eq_ignore_ascii_case(names::CONTENT_LENGTH) {
                content_length = value.parse().unwrap_or(0);
            }
            headers.insert(name, value);
        }
    }

    if data.len() < header_len + content_length {
        return Ok(None);
    }
    let body = data[header_len..header_len + content_length].to_vec();
    Ok(Some((
        RtspRequest {
            method,
            uri,
            headers,
            body,
        },
        header_len + content_length,
    )))
}

fn encode_reply(request: &RtspRequest, reply: &Reply) -> Vec<u8> {
    let mut head = format!("RTSP/1.0 {} {}\r\n", reply.status, reason(reply.status));
    let _ = write!(
        head,
        "{}: {}\r\n",
        names::CSEQ,
        request.headers.cseq().unwrap_or(0)
    );
    for (name, value) in reply.headers.iter() {
        let _ = write!(head, "{name}: {value}\r\n");
    }
    if !reply.body.is_empty() {
        let _ = write!(head, "{}: {}\r\n", names::CONTENT_LENGTH, reply.body.len());
    }
    head.push_str("\r\n");

    let mut bytes = head.into_bytes();
    bytes.extend_from_slice(&reply.body);
    bytes
}

/// Mock server errors
#[derive(Debug, thiserror::Error)]
pub enum MockServerError {
    /// Failed to bind a socket
    #[error("bind failed: {0}")]
    BindFailed(String),
}
