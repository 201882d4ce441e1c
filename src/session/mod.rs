//! RAOP session controller
//!
//! [`RaopSession`] drives one receiver through the RAOP handshake and then
//! streams audio to it:
//!
//! ```text
//! Idle -> Connected -> [PairingInProgress ->] Announced -> TransportReady -> Streaming -> Stopped
//! ```
//!
//! Any fatal handshake error releases the control connection and every UDP
//! socket before moving the session to `Error`. The resources of each stage
//! live in the session phase, so a session only holds sockets while it streams.
//!
//! ```no_run
//! use raop_stream::prelude::*;
//!
//! # async fn run() -> Result<(), RaopError> {
//! let receiver = ReceiverInfo::new("Kitchen", "192.168.1.20", 5000);
//! let mut session = RaopSession::new(receiver, RaopConfig::default(), CryptoContext::new()?);
//! session.connect().await?;
//! session.send_frame(&[0u8; 1408]).await?;
//! session.stop().await;
//! # Ok(())
//! # }
//! ```

mod ids;
mod info;
mod link;
mod state;
mod transport;


pub use ids::SessionIds;
pub use info::ReceiverDetails;
pub use state::SessionState;
pub use transport::{LocalPorts, ServerEndpoints};

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use self::link::ControlLink;
use self::transport::Transport;
use crate::audio::AudioFrame;
use crate::error::RaopError;
use crate::protocol::crypto::{CryptoContext, SessionKey, X25519SharedSecret};
use crate::protocol::pairing::{PairingNegotiator, PinProvider, StaticPin};
use crate::protocol::rtsp::headers::names;
use crate::protocol::rtsp::{Method, RtspResponse, ServerPorts};
use crate::streaming::{RaopStreamer, SessionStats, StatsCounters};
use crate::types::{RaopConfig, ReceiverInfo};

/// `SET_PARAMETER` dB value for a volume in `[0, 1]`
///
/// 0 (and anything at or below it, or NaN) mutes with -144 dB; otherwise the
/// range maps linearly onto -30..0 dB.
#[must_use]
pub fn volume_to_db(volume: f32) -> f32 {
    let volume = if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    };
    if volume <= 0.0 {
        -144.0
    } else {
        volume * 30.0 - 30.0
    }
}

/// Resources of a session that reached `Streaming`
#[derive(Debug)]
struct Live {
    link: ControlLink,
    transport: Transport,
    streamer: RaopStreamer,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Handshaking,
    Live(Box<Live>),
    Stopped,
    Failed,
}

/// One RAOP streaming session with one receiver
pub struct RaopSession {
    receiver: ReceiverInfo,
    config: RaopConfig,
    crypto: CryptoContext,
    ids: Option<SessionIds>,
    pins: Option<Arc<dyn PinProvider>>,
    phase: Phase,
    state: watch::Sender<SessionState>,
    counters: Arc<StatsCounters>,
    pairing_secret: Option<X25519SharedSecret>,
    pairing_key: Option<SessionKey>,
    volume_db: Option<f32>,
}

impl fmt::Debug for RaopSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RaopSession")
            .field("receiver", &self.receiver)
            .field("state", &self.state())
            .field("ids", &self.ids)
            .field("has_pin_provider", &self.pins.is_some())
            .field("volume_db", &self.volume_db)
            .finish_non_exhaustive()
    }
}

impl RaopSession {
    /// Create an idle session for `receiver`
    ///
    /// A `pin` in `config` becomes the session's PIN source.
    #[must_use]
    pub fn new(receiver: ReceiverInfo, config: RaopConfig, crypto: CryptoContext) -> Self {
        let pins = config
            .pin
            .clone()
            .map(|pin| Arc::new(StaticPin::new(pin)) as Arc<dyn PinProvider>);
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            receiver,
            config,
            crypto,
            ids: None,
            pins,
            phase: Phase::Idle,
            state,
            counters: Arc::new(StatsCounters::default()),
            pairing_secret: None,
            pairing_key: None,
            volume_db: None,
        }
    }

    /// Use fixed identifiers instead of random ones
    #[must_use]
    pub fn with_ids(mut self, ids: SessionIds) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Ask `provider` for a PIN when the receiver demands pairing
    #[must_use]
    pub fn with_pin_provider(mut self, provider: Arc<dyn PinProvider>) -> Self {
        self.pins = Some(provider);
        self
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Receiver this session targets
    #[must_use]
    pub fn receiver(&self) -> &ReceiverInfo {
        &self.receiver
    }

    /// Session configuration
    #[must_use]
    pub fn config(&self) -> &RaopConfig {
        &self.config
    }

    /// Identifiers, once set or generated
    #[must_use]
    pub fn ids(&self) -> Option<&SessionIds> {
        self.ids.as_ref()
    }

    /// Counters for this session
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.counters.snapshot()
    }

    /// Shared secret from `/auth-setup`, if it ran
    ///
    /// The audio stream is not encrypted with it.
    #[must_use]
    pub fn pairing_secret(&self) -> Option<&X25519SharedSecret> {
        self.pairing_secret.as_ref()
    }

    /// SRP session key from PIN pairing, if it ran
    #[must_use]
    pub fn pairing_key(&self) -> Option<&SessionKey> {
        self.pairing_key.as_ref()
    }

    /// Last volume accepted by the receiver, in dB
    #[must_use]
    pub fn volume_db(&self) -> Option<f32> {
        self.volume_db
    }

    fn live(&self) -> Option<&Live> {
        match &self.phase {
            Phase::Live(live) => Some(live),
            _ => None,
        }
    }

    /// Local UDP ports while streaming
    #[must_use]
    pub fn local_ports(&self) -> Option<LocalPorts> {
        self.live().map(|live| live.transport.local_ports())
    }

    /// Receiver UDP endpoints while streaming
    #[must_use]
    pub fn server_endpoints(&self) -> Option<ServerEndpoints> {
        self.live().and_then(|live| live.transport.server())
    }

    /// Server session token from SETUP
    #[must_use]
    pub fn session_token(&self) -> Option<&str> {
        self.live().and_then(|live| live.link.session_token())
    }

    /// Sequence number of the next audio packet
    #[must_use]
    pub fn sequence(&self) -> Option<u16> {
        self.live().map(|live| live.streamer.sequence())
    }

    /// RTP timestamp of the next audio packet
    #[must_use]
    pub fn timestamp(&self) -> Option<u32> {
        self.live().map(|live| live.streamer.timestamp())
    }

    /// SSRC of the audio stream
    #[must_use]
    pub fn ssrc(&self) -> Option<u32> {
        self.live().map(|live| live.streamer.ssrc())
    }

    fn set_state(&self, next: SessionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::info!(
                receiver = %self.receiver.name,
                from = %previous,
                to = %next,
                "session state changed"
            );
        }
    }

    fn fail(&mut self, err: RaopError) -> RaopError {
        tracing::warn!(receiver = %self.receiver.name, error = %err, "session failed");
        self.phase = Phase::Failed;
        self.set_state(SessionState::Error);
        err
    }

    /// Run the handshake and start streaming
    ///
    /// # Errors
    /// Returns `InvalidState` unless the session is idle. Otherwise any
    /// handshake error is returned after the control connection and all
    /// sockets are released and the session moved to `Error`:
    /// `ConnectionFailed`/`Timeout` for the TCP connect, `PairingRequired`
    /// or `PairingFailed` for a 403 that pairing cannot resolve, and
    /// `HandshakeFailed` for a rejected ANNOUNCE, SETUP or RECORD.
    pub async fn connect(&mut self) -> Result<(), RaopError> {
        if !matches!(self.phase, Phase::Idle) {
            return Err(RaopError::invalid_state(
                "connect requires an idle session",
                self.state(),
            ));
        }
        self.phase = Phase::Handshaking;

        let ids = match &self.ids {
            Some(ids) => ids.clone(),
            None => {
                let ids = SessionIds::generate(&self.crypto);
                self.ids = Some(ids.clone());
                ids
            }
        };
        tracing::info!(
            receiver = %self.receiver,
            session_id = %ids.session_id,
            "connecting"
        );

        let mut link = match ControlLink::open(&self.receiver, &self.config, ids).await {
            Ok(link) => link,
            Err(e) => return Err(self.fail(e)),
        };
        self.set_state(SessionState::Connected);

        match self.establish(&mut link).await {
            Ok((transport, streamer)) => {
                self.phase = Phase::Live(Box::new(Live {
                    link,
                    transport,
                    streamer,
                }));
                self.set_state(SessionState::Streaming);
            }
            Err(e) => {
                link.close().await;
                return Err(self.fail(e));
            }
        }

        self.prime().await;
        Ok(())
    }

    async fn establish(
        &mut self,
        link: &mut ControlLink,
    ) -> Result<(Transport, RaopStreamer), RaopError> {
        self.negotiate(link).await?;

        let mut transport = Transport::bind(&self.config, Arc::clone(&self.counters)).await?;
        match self.start_transport(link, &mut transport).await {
            Ok(streamer) => Ok((transport, streamer)),
            Err(e) => {
                transport.close().await;
                Err(e)
            }
        }
    }

    /// OPTIONS, auth-setup and ANNOUNCE, pairing on 403
    async fn negotiate(&mut self, link: &mut ControlLink) -> Result<(), RaopError> {
        let negotiator = PairingNegotiator::new(
            self.crypto.clone(),
            link.ids().client_instance.clone(),
            link.base_headers(),
        );

        let options = link.options().await?;
        if options.is_forbidden() {
            self.pair(link, &negotiator, Method::Options).await?;
            let retry = link.options().await?;
            if retry.is_forbidden() {
                return Err(handshake_failed(Method::Options, &retry));
            }
            warn_unless_success(Method::Options, &retry);
        } else {
            warn_unless_success(Method::Options, &options);
            if let Some(public) = options.headers.get(names::PUBLIC) {
                tracing::debug!(public, "receiver methods");
            }
        }

        if self.config.auth_setup {
            match negotiator.auth_setup(link.rtsp_mut()).await {
                Ok(secret) => self.pairing_secret = Some(secret),
                Err(e) => tracing::warn!(error = %e, "auth-setup failed; continuing without it"),
            }
        }

        let mut announce = link.announce(self.config.latency_samples).await?;
        if announce.is_forbidden() {
            self.pair(link, &negotiator, Method::Announce).await?;
            announce = link.announce(self.config.latency_samples).await?;
        }
        if !announce.is_success() {
            return Err(handshake_failed(Method::Announce, &announce));
        }
        self.set_state(SessionState::Announced);
        Ok(())
    }

    async fn pair(
        &mut self,
        link: &mut ControlLink,
        negotiator: &PairingNegotiator,
        method: Method,
    ) -> Result<(), RaopError> {
        let Some(pins) = self.pins.clone() else {
            return Err(RaopError::PairingRequired {
                method: method.to_string(),
            });
        };
        self.set_state(SessionState::PairingInProgress);
        let key = negotiator.pair_with_pin(link.rtsp_mut(), pins.as_ref()).await?;
        self.pairing_key = Some(key);
        self.set_state(SessionState::Connected);
        Ok(())
    }

    /// SETUP, first sync and RECORD
    async fn start_transport(
        &mut self,
        link: &mut ControlLink,
        transport: &mut Transport,
    ) -> Result<RaopStreamer, RaopError> {
        let local = transport.local_ports();
        let setup = link.setup(local.control, local.timing).await?;
        if !setup.is_success() {
            return Err(handshake_failed(Method::Setup, &setup));
        }
        let ports = setup
            .headers
            .get(names::TRANSPORT)
            .ok_or_else(|| handshake_failed(Method::Setup, &setup))
            .and_then(|value| {
                ServerPorts::from_header(value).map_err(|e| {
                    tracing::warn!(error = %e, transport = value, "unusable SETUP transport");
                    handshake_failed(Method::Setup, &setup)
                })
            })?;
        if let Some(token) = setup.session() {
            link.set_session_token(token);
        }
        let server = ServerEndpoints::new(link.peer_ip(), ports);
        tracing::debug!(?server, "receiver endpoints");

        #[allow(clippy::cast_possible_truncation)]
        let sequence = self.crypto.random_u32() as u16;
        let mut streamer = RaopStreamer::new(
            sequence,
            self.crypto.random_u32(),
            self.crypto.random_u32(),
            self.config.sync_every_frames,
        );
        transport.attach(
            server,
            self.config.latency_samples,
            streamer.shared_timestamp(),
            Arc::clone(&self.counters),
        );
        self.set_state(SessionState::TransportReady);

        if let Some(sync) = transport.sync_sender() {
            sync.send(true).await;
        }
        if let Some(interval) = self.config.sync_interval {
            transport.start_periodic_sync(interval);
        }

        self.send_pre_record_silence(transport, &mut streamer).await;

        let record = link
            .record(streamer.sequence(), streamer.timestamp())
            .await?;
        if !record.is_success() {
            return Err(handshake_failed(Method::Record, &record));
        }
        Ok(streamer)
    }

    /// Silent frames between SETUP and RECORD, closed by a sync packet
    async fn send_pre_record_silence(&self, transport: &Transport, streamer: &mut RaopStreamer) {
        let frames = self.config.pre_record_silence_frames;
        if frames == 0 {
            return;
        }
        let silence = AudioFrame::silence();
        for _ in 0..frames {
            let sequence = streamer.sequence();
            let sent = match streamer.encode_frame(silence.as_bytes()) {
                Ok(packet) => transport.send_audio(&packet).await,
                Err(e) => Err(e),
            };
            match sent {
                Ok(()) => self.counters.frame_sent(),
                Err(e) => {
                    tracing::warn!(sequence, error = %e, "pre-record frame dropped");
                    self.counters.frames_dropped(1);
                }
            }
        }
        streamer.take_sync_due();
        if let Some(sync) = transport.sync_sender() {
            sync.send(false).await;
        }
        tracing::debug!(
            frames,
            sequence = streamer.sequence(),
            timestamp = streamer.timestamp(),
            "pre-record silence sent"
        );
    }

    /// Initial volume and post-RECORD silence
    async fn prime(&mut self) {
        if let Some(volume) = self.config.initial_volume {
            if let Err(e) = self.set_volume(volume).await {
                tracing::warn!(error = %e, "initial volume not applied");
            }
        }
        self.send_silence(self.config.post_record_silence_frames)
            .await;
    }

    async fn send_silence(&mut self, frames: u32) {
        if frames == 0 {
            return;
        }
        let silence = AudioFrame::silence();
        for _ in 0..frames {
            if self.send_frame(silence.as_bytes()).await.is_err() {
                break;
            }
        }
        tracing::debug!(frames, "silence sent");
    }

    /// Encode and send one PCM frame
    ///
    /// Encode and send failures are logged and counted as dropped, never
    /// returned. The sequence number and timestamp advance on send failures
    /// but not on encode failures.
    ///
    /// # Errors
    /// Returns `InvalidState` unless the session is streaming.
    pub async fn send_frame(&mut self, pcm: &[u8]) -> Result<(), RaopError> {
        let state = self.state();
        let Phase::Live(live) = &mut self.phase else {
            return Err(RaopError::invalid_state(
                "frames can only be sent while streaming",
                state,
            ));
        };

        let sequence = live.streamer.sequence();
        let packet = match live.streamer.encode_frame(pcm) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::warn!(sequence, error = %e, "frame dropped");
                self.counters.frames_dropped(1);
                return Ok(());
            }
        };

        match live.transport.send_audio(&packet).await {
            Ok(()) => {
                self.counters.frame_sent();
                tracing::trace!(sequence, len = packet.len(), "audio packet sent");
            }
            Err(e) => {
                tracing::warn!(sequence, error = %e, "frame dropped");
                self.counters.frames_dropped(1);
            }
        }

        if live.streamer.take_sync_due() {
            if let Some(sync) = live.transport.sync_sender() {
                sync.send(false).await;
            }
        }
        Ok(())
    }

    pub(crate) fn record_dropped(&self, count: u64) {
        self.counters.frames_dropped(count);
    }

    /// Change the receiver volume; `volume` is clamped to `[0, 1]`
    ///
    /// # Errors
    /// Returns `InvalidState` unless streaming, `HandshakeFailed` if the
    /// receiver rejects the request, or the transport error.
    pub async fn set_volume(&mut self, volume: f32) -> Result<(), RaopError> {
        let state = self.state();
        let Phase::Live(live) = &mut self.phase else {
            return Err(RaopError::invalid_state(
                "volume can only be set once the transport is ready",
                state,
            ));
        };

        let db = volume_to_db(volume);
        let response = live.link.set_volume(db).await?;
        if !response.is_success() {
            return Err(handshake_failed(Method::SetParameter, &response));
        }
        tracing::debug!(volume, db, "volume set");
        self.volume_db = Some(db);
        Ok(())
    }

    /// `GET /info` on the open control connection
    ///
    /// # Errors
    /// Returns `InvalidState` unless streaming, or the transport error.
    pub async fn fetch_info(&mut self) -> Result<RtspResponse, RaopError> {
        let state = self.state();
        let Phase::Live(live) = &mut self.phase else {
            return Err(RaopError::invalid_state(
                "receiver info needs an open control connection",
                state,
            ));
        };
        live.link.info().await
    }

    /// [`fetch_info`](Self::fetch_info), decoded
    ///
    /// # Errors
    /// As `fetch_info`, plus `HandshakeFailed` if the reply is not a plist.
    pub async fn receiver_details(&mut self) -> Result<ReceiverDetails, RaopError> {
        let response = self.fetch_info().await?;
        ReceiverDetails::from_response(&response)
    }

    /// Tear down and release everything
    ///
    /// TEARDOWN is best-effort. Safe to call in any state and any number of
    /// times; the session always ends `Stopped`.
    pub async fn stop(&mut self) {
        if let Phase::Live(live) = std::mem::replace(&mut self.phase, Phase::Stopped) {
            let Live {
                mut link,
                transport,
                ..
            } = *live;
            match link.teardown().await {
                Ok(response) if response.is_success() => tracing::debug!("TEARDOWN accepted"),
                Ok(response) => tracing::debug!(
                    status = response.status.as_u16(),
                    "TEARDOWN rejected (ignored)"
                ),
                Err(e) => tracing::debug!(error = %e, "TEARDOWN failed (ignored)"),
            }
            link.close().await;
            transport.close().await;
        }
        self.set_state(SessionState::Stopped);
    }
}

fn handshake_failed(method: Method, response: &RtspResponse) -> RaopError {
    RaopError::HandshakeFailed {
        method: method.to_string(),
        status: response.status.as_u16(),
    }
}

fn warn_unless_success(method: Method, response: &RtspResponse) {
    if !response.is_success() {
        tracing::warn!(
            %method,
            status = response.status.as_u16(),
            "unexpected status; continuing"
        );
    }
}
