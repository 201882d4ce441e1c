use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;

use super::*;
use crate::protocol::rtp::{NtpTimestamp, RtpHeader, SyncPacket, TimingPacket};
use crate::types::BackpressurePolicy;

fn pcm(fill: u8) -> Vec<u8> {
    vec![fill; 1408]
}

async fn loopback() -> Arc<UdpSocket> {
    Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap())
}

#[test]
fn test_streamer_marker_on_first_packet_only() {
    let mut streamer = RaopStreamer::new(100, 5000, 0xABCD, 125);

    let first = streamer.encode_frame(&pcm(0)).unwrap();
    let second = streamer.encode_frame(&pcm(0)).unwrap();

    let h1 = RtpHeader::decode(&first).unwrap();
    let h2 = RtpHeader::decode(&second).unwrap();
    assert!(h1.marker);
    assert!(!h2.marker);
    assert_eq!(h1.sequence, 100);
    assert_eq!(h2.sequence, 101);
    assert_eq!(h1.timestamp, 5000);
    assert_eq!(h2.timestamp, 5352);
    assert_eq!(h1.ssrc, 0xABCD);
    assert_eq!(first.len(), 12 + 1416);
}

#[test]
fn test_streamer_sequence_wraps() {
    let mut streamer = RaopStreamer::new(u16::MAX, u32::MAX - 100, 1, 125);
    streamer.encode_frame(&pcm(0)).unwrap();

    assert_eq!(streamer.sequence(), 0);
    assert_eq!(streamer.timestamp(), 251);
}

#[test]
fn test_streamer_encode_failure_does_not_advance() {
    let mut streamer = RaopStreamer::new(7, 700, 1, 125);

    assert!(streamer.encode_frame(&[0u8; 3]).is_err());
    assert_eq!(streamer.sequence(), 7);
    assert_eq!(streamer.timestamp(), 700);

    // Marker still pending for the first real packet
    let packet = streamer.encode_frame(&pcm(0)).unwrap();
    assert!(RtpHeader::decode(&packet).unwrap().marker);
}

#[test]
fn test_streamer_sync_due_every_n_frames() {
    let mut streamer = RaopStreamer::new(0, 0, 1, 3);

    let mut due = Vec::new();
    for _ in 0..7 {
        streamer.encode_frame(&pcm(0)).unwrap();
        due.push(streamer.take_sync_due());
    }

    assert_eq!(due, [false, false, true, false, false, true, false]);
}

#[test]
fn test_shared_timestamp_tracks_streamer() {
    let mut streamer = RaopStreamer::new(0, 1000, 1, 125);
    let shared = streamer.shared_timestamp();

    streamer.encode_frame(&pcm(1)).unwrap();

    assert_eq!(shared.load(std::sync::atomic::Ordering::Acquire), 1352);
}

#[test]
fn test_stats_snapshot() {
    let counters = StatsCounters::default();
    counters.frame_sent();
    counters.frame_sent();
    counters.frames_dropped(3);
    counters.sync_sent();

    let stats = counters.snapshot();
    assert_eq!(stats.frames_sent, 2);
    assert_eq!(stats.frames_dropped, 3);
    assert_eq!(stats.sync_packets_sent, 1);
    assert_eq!(stats.timing_replies_sent, 0);
}

#[tokio::test]
async fn test_timing_listener_replies() {
    let control = loopback().await;
    let timing = loopback().await;
    let timing_addr = timing.local_addr().unwrap();
    let counters = Arc::new(StatsCounters::default());
    let mut engine = TimingSyncEngine::start(control, timing, Arc::clone(&counters));

    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let transmit = NtpTimestamp::from_u64(0xDEAD_BEEF_CAFE_BABE);
    peer.send_to(TimingPacket::request(transmit).as_bytes(), timing_addr)
        .await
        .unwrap();

    let mut buf = [0u8; 64];
    let (len, _) = tokio::time::timeout(Duration::from_secs(2), peer.recv_from(&mut buf))
        .await
        .expect("no timing reply")
        .unwrap();

    assert_eq!(len, 32);
    assert_eq!(&buf[..2], &[0x80, 0xD3]);
    assert_eq!(&buf[8..16], &[0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE, 0xBA, 0xBE]);
    assert_eq!(counters.snapshot().timing_replies_sent, 1);

    engine.shutdown().await;
    assert!(!engine.is_running());
}

#[tokio::test]
async fn test_control_listener_ignores_packets() {
    let control = loopback().await;
    let control_addr = control.local_addr().unwrap();
    let timing = loopback().await;
    let counters = Arc::new(StatsCounters::default());
    let mut engine = TimingSyncEngine::start(control, timing, Arc::clone(&counters));

    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    peer.send_to(&[0x80, 0xD5, 0, 1], control_addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(engine.is_running());
    assert_eq!(counters.snapshot().timing_replies_sent, 0);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_sync_sender_writes_packet() {
    let socket = loopback().await;
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let counters = Arc::new(StatsCounters::default());
    let streamer = RaopStreamer::new(0, 20_000, 1, 125);

    let sender = SyncSender::new(
        socket,
        receiver.local_addr().unwrap(),
        11025,
        streamer.shared_timestamp(),
        Arc::clone(&counters),
    );
    sender.send(true).await;

    let mut buf = [0u8; 64];
    let (len, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
        .await
        .expect("no sync packet")
        .unwrap();
    let sync = SyncPacket::decode(&buf[..len]).unwrap();

    assert!(sync.first);
    assert_eq!(sync.next_timestamp, 20_000);
    assert_eq!(sync.playing_timestamp, 20_000 - 11025);
    assert_eq!(counters.snapshot().sync_packets_sent, 1);
}

#[tokio::test]
async fn test_periodic_sync_task() {
    let control = loopback().await;
    let timing = loopback().await;
    let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let counters = Arc::new(StatsCounters::default());
    let mut engine =
        TimingSyncEngine::start(Arc::clone(&control), timing, Arc::clone(&counters));

    let sender = SyncSender::new(
        control,
        receiver.local_addr().unwrap(),
        0,
        Arc::new(std::sync::atomic::AtomicU32::new(42)),
        Arc::clone(&counters),
    );
    engine.start_periodic_sync(sender, Duration::from_millis(20));

    let mut buf = [0u8; 64];
    let (len, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
        .await
        .expect("no periodic sync")
        .unwrap();
    let sync = SyncPacket::decode(&buf[..len]).unwrap();
    assert!(!sync.first);
    assert_eq!(sync.next_timestamp, 42);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_capture_queue_fifo() {
    let queue = CaptureQueue::new(4, BackpressurePolicy::DropOldest);
    queue.push(pcm(1)).await.unwrap();
    queue.push(pcm(2)).await.unwrap();

    assert_eq!(queue.len(), 2);
    assert_eq!(queue.pop().await.unwrap().as_bytes()[0], 1);
    assert_eq!(queue.pop().await.unwrap().as_bytes()[0], 2);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_capture_queue_drop_oldest() {
    let queue = CaptureQueue::new(2, BackpressurePolicy::DropOldest);
    for fill in 1..=5 {
        queue.push(pcm(fill)).await.unwrap();
    }

    assert_eq!(queue.len(), 2);
    assert_eq!(queue.dropped(), 3);
    assert_eq!(queue.pop().await.unwrap().as_bytes()[0], 4);
    assert_eq!(queue.pop().await.unwrap().as_bytes()[0], 5);
}

#[tokio::test]
async fn test_capture_queue_rejects_wrong_size() {
    let queue = CaptureQueue::new(2, BackpressurePolicy::DropOldest);
    let err = queue.push(vec![0u8; 1000]).await.unwrap_err();

    assert!(matches!(err, crate::RaopError::InvalidFrame { .. }));
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_capture_queue_block_waits_for_space() {
    let queue = Arc::new(CaptureQueue::new(1, BackpressurePolicy::Block));
    queue.push(pcm(1)).await.unwrap();

    let producer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.push(pcm(2)).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!producer.is_finished());

    assert_eq!(queue.pop().await.unwrap().as_bytes()[0], 1);
    producer.await.unwrap().unwrap();
    assert_eq!(queue.pop().await.unwrap().as_bytes()[0], 2);
    assert_eq!(queue.dropped(), 0);
}

#[tokio::test]
async fn test_capture_queue_close_drains_then_ends() {
    let queue = Arc::new(CaptureQueue::new(4, BackpressurePolicy::DropOldest));
    queue.push(pcm(9)).await.unwrap();
    queue.close();

    assert!(queue.push(pcm(1)).await.is_err());
    assert_eq!(queue.pop().await.unwrap().as_bytes()[0], 9);
    assert!(queue.pop().await.is_none());
}

#[tokio::test]
async fn test_capture_queue_close_wakes_consumer() {
    let queue = Arc::new(CaptureQueue::new(4, BackpressurePolicy::Block));
    let consumer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.pop().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.close();

    let popped = tokio::time::timeout(Duration::from_secs(1), consumer)
        .await
        .expect("consumer not woken")
        .unwrap();
    assert!(popped.is_none());
}
