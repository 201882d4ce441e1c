//! UDP side of a session: the three client sockets, the receiver's
//! endpoints and the background listener tasks

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::AtomicU32;

use tokio::net::UdpSocket;

use crate::error::RaopError;
use crate::net;
use crate::protocol::rtsp::ServerPorts;
use crate::streaming::{StatsCounters, SyncSender, TimingSyncEngine};
use crate::types::RaopConfig;

/// Local ports the three client sockets are bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalPorts {
    /// Control (sync out) port
    pub control: u16,
    /// Timing port
    pub timing: u16,
    /// Audio source port
    pub audio: u16,
}

/// Receiver endpoints from the SETUP response
///
/// A receiver that announces no control or timing port gets `None` there;
/// sync packets are not sent without a control endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerEndpoints {
    /// Audio data destination
    pub audio: SocketAddr,
    /// Sync packet destination
    pub control: Option<SocketAddr>,
    /// Receiver timing port
    pub timing: Option<SocketAddr>,
}

impl ServerEndpoints {
    pub(crate) fn new(ip: IpAddr, ports: ServerPorts) -> Self {
        let endpoint = |port: u16| (port != 0).then(|| SocketAddr::new(ip, port));
        Self {
            audio: SocketAddr::new(ip, ports.audio),
            control: endpoint(ports.control),
            timing: endpoint(ports.timing),
        }
    }
}

/// Sockets and tasks owned by one session; released by [`close`](Self::close)
#[derive(Debug)]
pub(crate) struct Transport {
    control: Arc<UdpSocket>,
    timing: Arc<UdpSocket>,
    audio: UdpSocket,
    local: LocalPorts,
    engine: TimingSyncEngine,
    server: Option<ServerEndpoints>,
    sync: Option<SyncSender>,
}

impl Transport {
    /// Bind control, timing and audio sockets and start the listeners
    pub(crate) async fn bind(
        config: &RaopConfig,
        counters: Arc<StatsCounters>,
    ) -> Result<Self, RaopError> {
        let control = Arc::new(net::bind_udp(config.control_port).await?);
        let timing = Arc::new(net::bind_udp(config.timing_port).await?);
        let audio = net::bind_udp(config.audio_port).await?;

        let local = LocalPorts {
            control: control.local_addr()?.port(),
            timing: timing.local_addr()?.port(),
            audio: audio.local_addr()?.port(),
        };
        tracing::debug!(
            control = local.control,
            timing = local.timing,
            audio = local.audio,
            "UDP sockets bound"
        );

        let engine = TimingSyncEngine::start(Arc::clone(&control), Arc::clone(&timing), counters);
        Ok(Self {
            control,
            timing,
            audio,
            local,
            engine,
            server: None,
            sync: None,
        })
    }

    pub(crate) fn local_ports(&self) -> LocalPorts {
        self.local
    }

    pub(crate) fn server(&self) -> Option<ServerEndpoints> {
        self.server
    }

    /// Record where the receiver listens and prepare the sync sender
    pub(crate) fn attach(
        &mut self,
        server: ServerEndpoints,
        latency: u32,
        timestamp: Arc<AtomicU32>,
        counters: Arc<StatsCounters>,
    ) {
        self.sync = server.control.map(|dest| {
            SyncSender::new(Arc::clone(&self.control), dest, latency, timestamp, counters)
        });
        if self.sync.is_none() {
            tracing::warn!("receiver announced no control port; sync packets disabled");
        }
        self.server = Some(server);
    }

    pub(crate) fn sync_sender(&self) -> Option<&SyncSender> {
        self.sync.as_ref()
    }

    pub(crate) fn start_periodic_sync(&mut self, interval: std::time::Duration) {
        if let Some(sender) = self.sync.clone() {
            self.engine.start_periodic_sync(sender, interval);
        }
    }

    /// Send one audio packet to the receiver's audio port
    pub(crate) async fn send_audio(&self, packet: &[u8]) -> Result<(), RaopError> {
        let dest = self
            .server
            .map(|s| s.audio)
            .ok_or_else(|| RaopError::Transport {
                message: "no receiver audio endpoint".to_string(),
                source: None,
            })?;
        self.audio
            .send_to(packet, dest)
            .await
            .map(|_| ())
            .map_err(|e| RaopError::Transport {
                message: format!("audio send to {dest} failed"),
                source: Some(e),
            })
    }

    /// Stop the listeners and release all three sockets
    pub(crate) async fn close(mut self) {
        self.engine.shutdown().await;
        self.sync = None;
        tracing::debug!(
            control = self.local.control,
            timing = self.local.timing,
            audio = self.local.audio,
            "UDP sockets closed"
        );
        drop(self.timing);
        drop(self.control);
        drop(self.audio);
    }
}
