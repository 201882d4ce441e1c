//! Control/timing listeners and sync packet sending
//!
//! Two listener tasks run per session, one per UDP channel. Timing requests
//! are answered on the socket they arrived on; everything else is logged and
//! dropped. Sync packets go out on the control socket, either from the frame
//! send path or from an optional wall-clock task.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::StatsCounters;
use crate::error::RaopError;
use crate::protocol::rtp::{NtpTimestamp, SyncPacket, timing_reply};

/// Which channel a listener serves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Control port: sync out, retransmit requests in (ignored)
    Control,
    /// Timing port: NTP-style requests in, replies out
    Timing,
}

impl Channel {
    /// Name used in logs and errors
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Control => "control",
            Channel::Timing => "timing",
        }
    }
}

/// Sends sync packets for the current stream position
#[derive(Debug, Clone)]
pub struct SyncSender {
    socket: Arc<UdpSocket>,
    dest: SocketAddr,
    latency: u32,
    timestamp: Arc<AtomicU32>,
    counters: Arc<StatsCounters>,
}

impl SyncSender {
    /// Create a sender writing to `dest` through `socket`
    #[must_use]
    pub fn new(
        socket: Arc<UdpSocket>,
        dest: SocketAddr,
        latency: u32,
        timestamp: Arc<AtomicU32>,
        counters: Arc<StatsCounters>,
    ) -> Self {
        Self {
            socket,
            dest,
            latency,
            timestamp,
            counters,
        }
    }

    /// Send one sync packet; failures are logged and swallowed
    pub async fn send(&self, first: bool) {
        let timestamp = self.timestamp.load(Ordering::Acquire);
        let packet = SyncPacket::new(timestamp, self.latency, NtpTimestamp::now(), first);
        match self.socket.send_to(&packet.encode(), self.dest).await {
            Ok(_) => {
                self.counters.sync_sent();
                tracing::trace!(timestamp, first, dest = %self.dest, "sync sent");
            }
            Err(e) => {
                tracing::warn!(dest = %self.dest, error = %e, "sync send failed");
            }
        }
    }
}

/// Background tasks of one session
///
/// Dropping the engine cancels its tasks; [`shutdown`](Self::shutdown) also
/// waits for them to finish so their sockets are released.
#[derive(Debug)]
pub struct TimingSyncEngine {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl TimingSyncEngine {
    /// Start the control and timing listeners
    #[must_use]
    pub fn start(
        control: Arc<UdpSocket>,
        timing: Arc<UdpSocket>,
        counters: Arc<StatsCounters>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let tasks = vec![
            spawn_listener(Channel::Control, control, cancel.clone(), Arc::clone(&counters)),
            spawn_listener(Channel::Timing, timing, cancel.clone(), counters),
        ];
        Self { cancel, tasks }
    }

    /// Also send a sync packet every `interval`
    ///
    /// The first tick is skipped; the handshake already sent the first sync.
    pub fn start_periodic_sync(&mut self, sender: SyncSender, interval: Duration) {
        let cancel = self.cancel.clone();
        self.tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => sender.send(false).await,
                }
            }
            tracing::debug!("periodic sync stopped");
        }));
    }

    /// Whether any task is still running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.is_finished())
    }

    /// Cancel all tasks and wait for them
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::debug!(error = %e, "background task ended abnormally");
            }
        }
    }
}

impl Drop for TimingSyncEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn spawn_listener(
    channel: Channel,
    socket: Arc<UdpSocket>,
    cancel: CancellationToken,
    counters: Arc<StatsCounters>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = listen(channel, &socket, &cancel, &counters).await {
            tracing::warn!(error = %e, "listener exited");
        }
    })
}

/// Receive loop for one channel
///
/// Returns `Ok` on cancellation and `RaopError::Listener` on a receive
/// failure.
async fn listen(
    channel: Channel,
    socket: &UdpSocket,
    cancel: &CancellationToken,
    counters: &StatsCounters,
) -> Result<(), RaopError> {
    let local = socket.local_addr().ok();
    tracing::debug!(channel = channel.as_str(), ?local, "listener started");
    let mut buf = [0u8; 2048];

    loop {
        let (len, from) = tokio::select! {
            () = cancel.cancelled() => {
                tracing::debug!(channel = channel.as_str(), "listener stopped");
                return Ok(());
            }
            received = socket.recv_from(&mut buf) => received.map_err(|source| RaopError::Listener {
                channel: channel.as_str(),
                source,
            })?,
        };
        let packet = &buf[..len];

        match channel {
            Channel::Timing => {
                if let Some(reply) = timing_reply(packet, NtpTimestamp::now()) {
                    match socket.send_to(&reply, from).await {
                        Ok(_) => {
                            counters.timing_reply_sent();
                            tracing::trace!(%from, "timing reply sent");
                        }
                        Err(e) => tracing::warn!(%from, error = %e, "timing reply failed"),
                    }
                } else {
                    tracing::debug!(%from, len, "ignoring non-request packet on timing port");
                }
            }
            Channel::Control => {
                tracing::debug!(
                    %from,
                    len,
                    payload_type = ?packet.get(1).map(|b| b & 0x7F),
                    "control packet ignored"
                );
            }
        }
    }
}
