use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::mock_raop_server::{MockRaopConfig, MockRaopServer};
use crate::protocol::crypto::CryptoContext;
use crate::protocol::pairing::{PairingNegotiator, messages};
use crate::protocol::rtsp::headers::names;
use crate::protocol::rtsp::{Headers, Method, RtspClient};

async fn started(config: MockRaopConfig) -> (MockRaopServer, RtspClient) {
    let mut server = MockRaopServer::new(config);
    let addr = server.start().await.unwrap();
    let mut client = RtspClient::new("127.0.0.1", addr.port());
    client.connect().await.unwrap();
    (server, client)
}

#[tokio::test]
async fn test_mock_assigns_ports() {
    let mut server = MockRaopServer::new(MockRaopConfig::default());
    let addr = server.start().await.unwrap();

    assert!(server.is_running());
    assert_eq!(addr.port(), server.config.rtsp_port);
    assert_ne!(server.config.audio_port, 0);
    assert_ne!(server.config.control_port, 0);
    assert_ne!(server.config.timing_port, 0);

    server.stop();
    assert!(!server.is_running());
}

#[tokio::test]
async fn test_options_raw() {
    let mut server = MockRaopServer::new(MockRaopConfig::default());
    let addr = server.start().await.unwrap();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"OPTIONS * RTSP/1.0\r\nCSeq: 7\r\n\r\n")
        .await
        .unwrap();

    let mut buf = [0u8; 1024];
    let n = stream.read(&mut buf).await.unwrap();
    let response = String::from_utf8_lossy(&buf[..n]);

    assert!(response.starts_with("RTSP/1.0 200 OK\r\n"));
    assert!(response.contains("CSeq: 7"));
    assert!(response.contains("ANNOUNCE"));
    assert!(response.contains("SET_PARAMETER"));
}

#[tokio::test]
async fn test_setup_advertises_ports() {
    let (server, mut client) = started(MockRaopConfig::default()).await;

    let mut headers = Headers::new();
    headers.insert(
        names::TRANSPORT,
        "RTP/AVP/UDP;unicast;interleaved=0-1;mode=record;control_port=6001;timing_port=6002",
    );
    let response = client
        .send_request(Method::Setup, "rtsp://127.0.0.1/1", headers, None)
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.session(), Some("DEADBEEF;timeout=60"));
    let transport = response.headers.get(names::TRANSPORT).unwrap();
    assert!(transport.contains(&format!("server_port={}", server.config.audio_port)));
    assert!(transport.contains(&format!("control_port={}", server.config.control_port)));

    let state = server.state();
    assert_eq!(state.client_control_port, Some(6001));
    assert_eq!(state.client_timing_port, Some(6002));
}

#[tokio::test]
async fn test_setup_without_sync_ports() {
    let config = MockRaopConfig {
        advertise_sync_ports: false,
        ..MockRaopConfig::default()
    };
    let (_server, mut client) = started(config).await;

    let response = client
        .send_request(Method::Setup, "rtsp://127.0.0.1/1", Headers::new(), None)
        .await
        .unwrap();

    let transport = response.headers.get(names::TRANSPORT).unwrap();
    assert!(transport.contains("server_port="));
    assert!(!transport.contains("control_port="));
}

#[tokio::test]
async fn test_status_override() {
    let config = MockRaopConfig::default().with_status(Method::Announce, 500);
    let (server, mut client) = started(config).await;

    let response = client
        .send_request(Method::Announce, "rtsp://127.0.0.1/1", Headers::new(), None)
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 500);
    assert_eq!(server.state().requests[0].status, 500);
}

#[tokio::test]
async fn test_volume_recorded() {
    let (server, mut client) = started(MockRaopConfig::default()).await;

    let response = client
        .send_request(
            Method::SetParameter,
            "rtsp://127.0.0.1/1",
            Headers::new(),
            Some(b"volume: -15.000000\r\n".to_vec()),
        )
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(server.state().volume_db, Some(-15.0));
}

#[tokio::test]
async fn test_pin_gate_and_srp_exchange() {
    let config = MockRaopConfig::default().with_pin("1234", Method::Options);
    let (server, mut client) = started(config).await;

    let response = client
        .send_request(Method::Options, "*", Headers::new(), None)
        .await
        .unwrap();
    assert!(response.is_forbidden());

    let crypto = CryptoContext::new().unwrap();
    let srp = crypto.srp_client("366B4165DD64AD3A", "1234");
    let start = messages::start_request("366B4165DD64AD3A", srp.public_key()).unwrap();
    let response = client
        .send_request(Method::Post, "/pair-setup", Headers::new(), Some(start))
        .await
        .unwrap();
    let challenge = messages::parse_challenge(&response.body).unwrap();
    assert_eq!(challenge.salt.len(), 16);

    let proof = srp
        .compute_proof(&challenge.salt, &challenge.server_public)
        .unwrap();
    let request = messages::proof_request(srp.public_key(), proof.client_proof()).unwrap();
    let response = client
        .send_request(Method::Post, "/pair-setup", Headers::new(), Some(request))
        .await
        .unwrap();
    assert!(response.is_success());
    let m2 = messages::parse_server_proof(&response.body).unwrap().unwrap();
    proof.verify_server(&m2).unwrap();

    assert!(server.state().paired);
    let response = client
        .send_request(Method::Options, "*", Headers::new(), None)
        .await
        .unwrap();
    assert!(response.is_success());
}

#[tokio::test]
async fn test_wrong_pin_rejected() {
    let config = MockRaopConfig::default().with_pin("1234", Method::Options);
    let (server, mut client) = started(config).await;

    let crypto = CryptoContext::new().unwrap();
    let srp = crypto.srp_client("user", "9999");
    let start = messages::start_request("user", srp.public_key()).unwrap();
    let response = client
        .send_request(Method::Post, "/pair-setup", Headers::new(), Some(start))
        .await
        .unwrap();
    let challenge = messages::parse_challenge(&response.body).unwrap();
    let proof = srp
        .compute_proof(&challenge.salt, &challenge.server_public)
        .unwrap();
    let request = messages::proof_request(srp.public_key(), proof.client_proof()).unwrap();
    let response = client
        .send_request(Method::Post, "/pair-setup", Headers::new(), Some(request))
        .await
        .unwrap();

    assert!(response.is_forbidden());
    assert!(!server.state().paired);
}

#[tokio::test]
async fn test_unknown_post_path() {
    let (server, mut client) = started(MockRaopConfig::default()).await;

    let response = client
        .send_request(Method::Post, "/fp-setup", Headers::new(), Some(vec![0; 16]))
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 404);
    assert_eq!(server.state().post_paths(), vec!["/fp-setup".to_string()]);
}

#[tokio::test]
async fn test_legacy_pair_setup_reply() {
    let (_server, mut client) = started(MockRaopConfig::default()).await;
    let negotiator =
        PairingNegotiator::new(CryptoContext::new().unwrap(), "0011223344556677", Headers::new());

    let (material, secret) = negotiator.legacy_pair_setup(&mut client).await.unwrap();

    assert_eq!(material.certificate, b"MOCK-CERT");
    assert_eq!(material.signature.as_deref(), Some(&[0x5A; 64][..]));
    assert_eq!(secret.as_bytes().len(), 32);
}

#[tokio::test]
async fn test_auth_setup_reply() {
    let (server, mut client) = started(MockRaopConfig::default()).await;
    let negotiator =
        PairingNegotiator::new(CryptoContext::new().unwrap(), "0011223344556677", Headers::new());

    negotiator.auth_setup(&mut client).await.unwrap();

    let state = server.state();
    let request = state.request(Method::Post).unwrap();
    assert_eq!(request.uri, "/auth-setup");
    assert_eq!(request.body.len(), 33);
    assert_eq!(
        request.headers.get(names::CONTENT_TYPE),
        Some("application/octet-stream")
    );
}
