use anyhow::{Result, bail};
use edgelink_core::{IceServerConfig, SessionDescription, SignalingIceCandidate};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine as CodecRegistry;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::track::track_remote::TrackRemote;

/// What the peer connection callbacks report back to the signaling loop.
pub enum PeerEvent {
    Track {
        remote: Arc<TrackRemote>,
        mid: Option<String>,
    },
    CandidateGenerated(SignalingIceCandidate),
    StateChanged(RTCPeerConnectionState),
}

pub struct PeerWrapper {
    pub peer_connection: Arc<RTCPeerConnection>,
}

impl PeerWrapper {
    /// Builds a receive-side peer connection; callbacks feed `event_tx`.
    pub async fn new(ice_servers: &[IceServerConfig], event_tx: mpsc::Sender<PeerEvent>) -> Result<Self> {
        let mut codecs = CodecRegistry::default();
        codecs.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut codecs)?;

        let api = APIBuilder::new()
            .with_media_engine(codecs)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|s| RTCIceServer {
                    urls: s.urls.clone(),
                    username: s.username.clone().unwrap_or_default(),
                    credential: s.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = event_tx.clone();
        peer_connection.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            Box::pin(async move {
                info!(state = ?s, "Peer connection state changed");
                let _ = tx.send(PeerEvent::StateChanged(s)).await;
            })
        }));

        let ice_tx = event_tx.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let candidate = SignalingIceCandidate {
                    sdp_mid: init.sdp_mid.unwrap_or_default(),
                    candidate: init.candidate,
                };
                let _ = tx.send(PeerEvent::CandidateGenerated(candidate)).await;
            })
        }));

        let track_tx = event_tx;
        peer_connection.on_track(Box::new(move |remote, _receiver, transceiver| {
            let tx = track_tx.clone();
            Box::pin(async move {
                let mid = transceiver.mid().map(|m| m.to_string());
                debug!(kind = ?remote.kind(), mid = ?mid, "Remote track added");
                let _ = tx.send(PeerEvent::Track { remote, mid }).await;
            })
        }));

        Ok(Self { peer_connection })
    }

    pub async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = match desc.kind.as_str() {
            "offer" => RTCSessionDescription::offer(desc.sdp)?,
            "answer" => RTCSessionDescription::answer(desc.sdp)?,
            "pranswer" => RTCSessionDescription::pranswer(desc.sdp)?,
            other => bail!("unsupported session description type `{other}`"),
        };
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    /// Creates the local answer and applies it.
    pub async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(SessionDescription {
            kind: "answer".to_owned(),
            sdp: answer.sdp,
        })
    }

    pub async fn add_ice_candidate(&self, candidate: SignalingIceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: Some(candidate.sdp_mid),
            ..Default::default()
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    /// Mids of every negotiated transceiver.
    pub async fn mids(&self) -> Vec<String> {
        self.peer_connection
            .get_transceivers()
            .await
            .iter()
            .filter_map(|t| t.mid().map(|m| m.to_string()))
            .collect()
    }

    pub async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}
