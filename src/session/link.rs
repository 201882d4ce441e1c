//! The RTSP side of a session: identity headers, request URL and the
//! server session token

use std::net::IpAddr;

use super::SessionIds;
use crate::error::RaopError;
use crate::protocol::rtsp::headers::{content_types, names, raop};
use crate::protocol::rtsp::{Headers, Method, RtspClient, RtspResponse, client_transport};
use crate::protocol::sdp::AnnounceSdp;
use crate::types::{RaopConfig, ReceiverInfo};

/// Open control connection plus everything needed to address the session
#[derive(Debug)]
pub(crate) struct ControlLink {
    rtsp: RtspClient,
    ids: SessionIds,
    client_ip: IpAddr,
    peer_ip: IpAddr,
    url: String,
    session_token: Option<String>,
}

impl ControlLink {
    /// Connect to the receiver and learn both ends' addresses
    pub(crate) async fn open(
        receiver: &ReceiverInfo,
        config: &RaopConfig,
        ids: SessionIds,
    ) -> Result<Self, RaopError> {
        let mut rtsp = RtspClient::new(receiver.host.clone(), receiver.port)
            .with_user_agent(config.user_agent.clone())
            .with_connect_timeout(config.connect_timeout)
            .with_request_timeout(config.request_timeout);
        rtsp.connect().await?;

        let addrs = rtsp.local_addr().and_then(|local| Ok((local, rtsp.peer_addr()?)));
        let (local, peer) = match addrs {
            Ok(addrs) => addrs,
            Err(e) => {
                rtsp.close().await;
                return Err(e);
            }
        };

        let url = format!("rtsp://{}/{}", local.ip(), ids.session_id);
        tracing::debug!(%url, peer = %peer, "control link open");
        Ok(Self {
            rtsp,
            ids,
            client_ip: local.ip(),
            peer_ip: peer.ip(),
            url,
            session_token: None,
        })
    }

    pub(crate) fn ids(&self) -> &SessionIds {
        &self.ids
    }

    pub(crate) fn peer_ip(&self) -> IpAddr {
        self.peer_ip
    }

    pub(crate) fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub(crate) fn rtsp_mut(&mut self) -> &mut RtspClient {
        &mut self.rtsp
    }

    /// Keep the part of a `Session` header before any `;timeout=`
    pub(crate) fn set_session_token(&mut self, raw: &str) {
        let token = raw.split(';').next().unwrap_or(raw).trim();
        if !token.is_empty() {
            tracing::debug!(token, "server session token");
            self.session_token = Some(token.to_string());
        }
    }

    /// `Client-Instance`, `DACP-ID` and `Active-Remote`
    pub(crate) fn base_headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert(raop::CLIENT_INSTANCE, self.ids.client_instance.clone());
        headers.insert(raop::DACP_ID, self.ids.client_instance.clone());
        headers.insert(raop::ACTIVE_REMOTE, self.ids.active_remote.clone());
        headers
    }

    async fn request(
        &mut self,
        method: Method,
        uri: Option<&str>,
        extra: Headers,
        body: Option<Vec<u8>>,
    ) -> Result<RtspResponse, RaopError> {
        let mut headers = self.base_headers();
        if let Some(token) = &self.session_token {
            headers.insert(names::SESSION, token.clone());
        }
        for (name, value) in extra.iter() {
            headers.insert(name, value);
        }
        let uri = uri.unwrap_or(&self.url).to_string();

        let response = self.rtsp.send_request(method, &uri, headers, body).await?;
        tracing::debug!(%method, status = response.status.as_u16(), "handshake step");
        Ok(response)
    }

    pub(crate) async fn options(&mut self) -> Result<RtspResponse, RaopError> {
        self.request(Method::Options, Some("*"), Headers::new(), None)
            .await
    }

    pub(crate) async fn announce(&mut self, latency_samples: u32) -> Result<RtspResponse, RaopError> {
        let client_ip = self.client_ip.to_string();
        let host = self.peer_ip.to_string();
        let sdp = AnnounceSdp {
            session_id: &self.ids.session_id,
            client_ip: &client_ip,
            host: &host,
            latency_samples,
        }
        .encode();

        let mut headers = Headers::new();
        headers.insert(names::CONTENT_TYPE, content_types::SDP);
        self.request(Method::Announce, None, headers, Some(sdp.into_bytes()))
            .await
    }

    pub(crate) async fn setup(
        &mut self,
        control_port: u16,
        timing_port: u16,
    ) -> Result<RtspResponse, RaopError> {
        let mut headers = Headers::new();
        headers.insert(names::TRANSPORT, client_transport(control_port, timing_port));
        self.request(Method::Setup, None, headers, None).await
    }

    pub(crate) async fn record(
        &mut self,
        sequence: u16,
        timestamp: u32,
    ) -> Result<RtspResponse, RaopError> {
        let mut headers = Headers::new();
        headers.insert(names::RANGE, "npt=0-");
        headers.insert(
            names::RTP_INFO,
            format!("seq={sequence};rtptime={timestamp}"),
        );
        self.request(Method::Record, None, headers, None).await
    }

    pub(crate) async fn set_volume(&mut self, db: f32) -> Result<RtspResponse, RaopError> {
        let mut headers = Headers::new();
        headers.insert(names::CONTENT_TYPE, content_types::PARAMETERS);
        let body = format!("volume: {db:.6}\r\n");
        self.request(Method::SetParameter, None, headers, Some(body.into_bytes()))
            .await
    }

    pub(crate) async fn teardown(&mut self) -> Result<RtspResponse, RaopError> {
        self.request(Method::Teardown, None, Headers::new(), None)
            .await
    }

    pub(crate) async fn info(&mut self) -> Result<RtspResponse, RaopError> {
        self.request(Method::Get, Some("/info"), Headers::new(), None)
            .await
    }

    pub(crate) async fn close(&mut self) {
        self.rtsp.close().await;
    }
}
