//! Handshake failures and resource release

use std::net::UdpSocket;
use std::time::Duration;

use raop_stream::protocol::rtsp::Method;
use raop_stream::testing::{MockRaopConfig, MockRaopServer, mock_receiver};
use raop_stream::{CryptoContext, RaopConfig, RaopError, RaopSession, SessionState};

async fn start_mock(config: MockRaopConfig) -> MockRaopServer {
    let mut server = MockRaopServer::new(config);
    server.start().await.expect("failed to start mock receiver");
    server
}

/// Three distinct ports nobody is bound to right now
fn free_udp_ports() -> (u16, u16, u16) {
    let sockets: Vec<UdpSocket> = (0..3)
        .map(|_| UdpSocket::bind("0.0.0.0:0").unwrap())
        .collect();
    let ports: Vec<u16> = sockets
        .iter()
        .map(|s| s.local_addr().unwrap().port())
        .collect();
    (ports[0], ports[1], ports[2])
}

#[tokio::test]
async fn test_announce_rejected() {
    let server = start_mock(MockRaopConfig::default().with_status(Method::Announce, 500)).await;
    let mut session = RaopSession::new(
        mock_receiver(&server),
        RaopConfig::default(),
        CryptoContext::new().unwrap(),
    );

    let err = session.connect().await.unwrap_err();

    assert!(
        matches!(err, RaopError::HandshakeFailed { ref method, status: 500 } if method == "ANNOUNCE")
    );
    assert_eq!(session.state(), SessionState::Error);
    assert!(session.local_ports().is_none());
    assert!(server.state().request(Method::Setup).is_none());
}

#[tokio::test]
async fn test_late_auth_setup_reply_not_taken_for_announce() {
    let config = MockRaopConfig::default()
        .with_reply_delay("/auth-setup", Duration::from_millis(200))
        .with_status(Method::Announce, 500);
    let server = start_mock(config).await;
    let config = RaopConfig::builder()
        .request_timeout(Some(Duration::from_millis(150)))
        .build();
    let mut session = RaopSession::new(mock_receiver(&server), config, CryptoContext::new().unwrap());

    let err = session.connect().await.unwrap_err();

    assert!(
        matches!(err, RaopError::HandshakeFailed { ref method, status: 500 } if method == "ANNOUNCE"),
        "unexpected error: {err}"
    );
    assert!(server.state().request(Method::Setup).is_none());
}

#[tokio::test]
async fn test_record_failure_releases_sockets() {
    let server = start_mock(MockRaopConfig::default().with_status(Method::Record, 453)).await;
    let (control, timing, audio) = free_udp_ports();
    let config = RaopConfig {
        control_port: control,
        timing_port: timing,
        audio_port: audio,
        ..RaopConfig::default()
    };
    let mut session = RaopSession::new(mock_receiver(&server), config, CryptoContext::new().unwrap());

    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, RaopError::HandshakeFailed { status: 453, .. }));
    assert_eq!(session.state(), SessionState::Error);

    // The SETUP carried the fixed ports, so they really were bound
    let state = server.state();
    assert_eq!(state.client_control_port, Some(control));
    assert_eq!(state.client_timing_port, Some(timing));

    for port in [control, timing, audio] {
        UdpSocket::bind(("0.0.0.0", port)).unwrap();
    }
}

#[tokio::test]
async fn test_setup_rejected() {
    let server = start_mock(MockRaopConfig::default().with_status(Method::Setup, 500)).await;
    let mut session = RaopSession::new(
        mock_receiver(&server),
        RaopConfig::default(),
        CryptoContext::new().unwrap(),
    );

    let err = session.connect().await.unwrap_err();

    assert!(matches!(err, RaopError::HandshakeFailed { ref method, .. } if method == "SETUP"));
    assert!(server.state().request(Method::Record).is_none());
}

#[tokio::test]
async fn test_options_error_is_tolerated() {
    let server = start_mock(MockRaopConfig::default().with_status(Method::Options, 501)).await;
    let mut session = RaopSession::new(
        mock_receiver(&server),
        RaopConfig::default(),
        CryptoContext::new().unwrap(),
    );

    session.connect().await.unwrap();
    assert_eq!(session.state(), SessionState::Streaming);

    session.stop().await;
}

#[tokio::test]
async fn test_missing_sync_ports() {
    let config = MockRaopConfig {
        advertise_sync_ports: false,
        ..MockRaopConfig::default()
    };
    let server = start_mock(config).await;
    let mut session = RaopSession::new(
        mock_receiver(&server),
        RaopConfig::default(),
        CryptoContext::new().unwrap(),
    );

    session.connect().await.unwrap();

    let endpoints = session.server_endpoints().unwrap();
    assert_eq!(endpoints.audio.port(), server.config.audio_port);
    assert!(endpoints.control.is_none());
    assert!(endpoints.timing.is_none());

    session.send_frame(&[0u8; 1408]).await.unwrap();
    assert_eq!(session.stats().sync_packets_sent, 0);
    assert!(server.state().control_packets.is_empty());

    session.stop().await;
}

#[tokio::test]
async fn test_unencodable_frame_is_dropped() {
    let server = start_mock(MockRaopConfig::default()).await;
    let mut session = RaopSession::new(
        mock_receiver(&server),
        RaopConfig::default(),
        CryptoContext::new().unwrap(),
    );
    session.connect().await.unwrap();
    let before = session.sequence().unwrap();

    session.send_frame(&[0u8; 1407]).await.unwrap();

    assert_eq!(session.sequence(), Some(before));
    assert_eq!(session.stats().frames_dropped, 1);
    assert_eq!(session.stats().frames_sent, 0);

    session.stop().await;
}
