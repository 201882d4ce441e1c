//! PIN pairing triggered by 403 responses

use std::sync::Arc;

use async_trait::async_trait;
use raop_stream::protocol::rtsp::Method;
use raop_stream::testing::{MockRaopConfig, MockRaopServer, mock_receiver};
use raop_stream::{
    CryptoContext, PinProvider, RaopConfig, RaopError, RaopSession, SessionState, StaticPin,
};

async fn start_mock(config: MockRaopConfig) -> MockRaopServer {
    let mut server = MockRaopServer::new(config);
    server.start().await.expect("failed to start mock receiver");
    server
}

fn session_for(server: &MockRaopServer, pin: Option<&str>) -> RaopSession {
    let config = RaopConfig {
        pin: pin.map(ToString::to_string),
        ..RaopConfig::default()
    };
    RaopSession::new(
        mock_receiver(server),
        config,
        CryptoContext::new().unwrap(),
    )
}

#[tokio::test]
async fn test_pin_pairing_on_options() {
    let server = start_mock(MockRaopConfig::default().with_pin("3939", Method::Options)).await;
    let mut session = session_for(&server, Some("3939"));

    session.connect().await.unwrap();

    assert_eq!(session.state(), SessionState::Streaming);
    assert!(session.pairing_key().is_some());

    let state = server.state();
    assert!(state.paired);
    assert_eq!(
        state.post_paths(),
        vec![
            "/pair-pin-start".to_string(),
            "/pair-setup".to_string(),
            "/pair-setup".to_string(),
            "/auth-setup".to_string(),
        ]
    );
    let options: Vec<u16> = state
        .requests
        .iter()
        .filter(|r| r.method == Method::Options)
        .map(|r| r.status)
        .collect();
    assert_eq!(options, vec![403, 200]);

    session.stop().await;
}

#[tokio::test]
async fn test_pin_pairing_on_announce() {
    let server = start_mock(MockRaopConfig::default().with_pin("1111", Method::Announce)).await;
    let mut session = session_for(&server, Some("1111"));

    session.connect().await.unwrap();

    let state = server.state();
    let announces: Vec<u16> = state
        .requests
        .iter()
        .filter(|r| r.method == Method::Announce)
        .map(|r| r.status)
        .collect();
    assert_eq!(announces, vec![403, 200]);
    assert!(state.announce.is_some());

    session.stop().await;
}

#[tokio::test]
async fn test_pairing_without_server_proof() {
    let config = MockRaopConfig {
        send_server_proof: false,
        ..MockRaopConfig::default().with_pin("2468", Method::Options)
    };
    let server = start_mock(config).await;
    let mut session = session_for(&server, Some("2468"));

    session.connect().await.unwrap();
    assert!(session.pairing_key().is_some());

    session.stop().await;
}

#[tokio::test]
async fn test_wrong_pin_fails() {
    let server = start_mock(MockRaopConfig::default().with_pin("3939", Method::Options)).await;
    let mut session = session_for(&server, Some("0000"));

    let err = session.connect().await.unwrap_err();

    assert!(matches!(err, RaopError::PairingFailed { .. }));
    assert_eq!(session.state(), SessionState::Error);
    assert!(!server.state().paired);
    assert!(session.local_ports().is_none());
}

#[tokio::test]
async fn test_forbidden_without_pin() {
    let server = start_mock(MockRaopConfig::default().with_pin("3939", Method::Options)).await;
    let mut session = session_for(&server, None);

    let err = session.connect().await.unwrap_err();

    assert!(matches!(err, RaopError::PairingRequired { ref method } if method == "OPTIONS"));
    assert_eq!(session.state(), SessionState::Error);
    assert!(server.state().post_paths().is_empty());
}

struct DeclinedPin;

#[async_trait]
impl PinProvider for DeclinedPin {
    async fn pin(&self) -> Option<String> {
        None
    }
}

#[tokio::test]
async fn test_pin_provider_declines() {
    let server = start_mock(MockRaopConfig::default().with_pin("3939", Method::Options)).await;
    let mut session = session_for(&server, None).with_pin_provider(Arc::new(DeclinedPin));

    let err = session.connect().await.unwrap_err();

    assert!(matches!(err, RaopError::PairingFailed { .. }));
    assert_eq!(server.state().post_paths(), vec!["/pair-pin-start".to_string()]);
}

#[tokio::test]
async fn test_custom_pin_provider() {
    let server = start_mock(MockRaopConfig::default().with_pin("5150", Method::Options)).await;
    let mut session =
        session_for(&server, None).with_pin_provider(Arc::new(StaticPin::new("5150")));

    session.connect().await.unwrap();
    assert_eq!(session.state(), SessionState::Streaming);

    session.stop().await;
}

#[tokio::test]
async fn test_auth_setup_secret() {
    let server = start_mock(MockRaopConfig::default()).await;
    let mut session = session_for(&server, None);

    session.connect().await.unwrap();
    assert!(session.pairing_secret().is_some());

    session.stop().await;
}

#[tokio::test]
async fn test_auth_setup_disabled() {
    let server = start_mock(MockRaopConfig::default()).await;
    let config = RaopConfig {
        auth_setup: false,
        ..RaopConfig::default()
    };
    let mut session = RaopSession::new(
        mock_receiver(&server),
        config,
        CryptoContext::new().unwrap(),
    );

    session.connect().await.unwrap();
    assert!(session.pairing_secret().is_none());
    assert!(server.state().post_paths().is_empty());

    session.stop().await;
}

#[tokio::test]
async fn test_auth_setup_failure_is_not_fatal() {
    let server = start_mock(MockRaopConfig::default().with_status(Method::Post, 404)).await;
    let mut session = session_for(&server, None);

    session.connect().await.unwrap();
    assert!(session.pairing_secret().is_none());
    assert_eq!(session.state(), SessionState::Streaming);

    session.stop().await;
}
