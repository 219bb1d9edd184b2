use crate::media::rtc::peer_wrapper::{PeerEvent, PeerWrapper};
use crate::media::rtc::rtc_config::RtcConfig;
use crate::media::rtc::rtc_track::RtcTrack;
use crate::media::rtc::signaling_stream::{SignalingReceiver, SignalingSender, signaling_channel};
use crate::media::{FailureSink, MediaBackend, MediaEngine, MediaTrack, RemoteTrack, TrackSink};
use crate::transport::DeviceConnection;
use async_trait::async_trait;
use edgelink_core::utils::{CONTENT_FORMAT_CBOR, STATUS_CONTENT};
use edgelink_core::{
    IceServerConfig, MediaFailure, MetadataTrack, NegotiationFailure, RtcInfo, SessionDescription,
    SignalMessage, SignalMessageMetadata, SignalMessageType, SignalingIceCandidate,
    SignalingRequest, TurnServer,
};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

type Ready = oneshot::Sender<Result<(), NegotiationFailure>>;

/// Media engine negotiating WebRTC over the device's signaling stream.
#[derive(Debug, Clone, Default)]
pub struct RtcMediaEngine {
    config: RtcConfig,
}

impl RtcMediaEngine {
    pub fn new(config: RtcConfig) -> Self {
        Self { config }
    }
}

impl MediaEngine for RtcMediaEngine {
    fn create_session(&self, connection: DeviceConnection) -> Box<dyn MediaBackend> {
        Box::new(RtcBackend {
            connection,
            config: self.config.clone(),
            sender: None,
            signaling: None,
            peer: Arc::new(OnceLock::new()),
        })
    }
}

pub struct RtcBackend {
    connection: DeviceConnection,
    config: RtcConfig,
    sender: Option<SignalingSender>,
    signaling: Option<JoinHandle<()>>,
    peer: Arc<OnceLock<Arc<PeerWrapper>>>,
}

impl RtcBackend {
    async fn signaling_port(&self) -> Result<u32, NegotiationFailure> {
        let response = self
            .connection
            .execute(SignalingRequest::webrtc_info())
            .await
            .map_err(|e| NegotiationFailure::Signaling(e.to_string()))?;

        if response.status != STATUS_CONTENT {
            error!(status = response.status, "WebRTC info request failed");
            return Err(NegotiationFailure::Signaling(format!(
                "webrtc info answered with status {}",
                response.status
            )));
        }

        let body = response
            .body
            .ok_or_else(|| NegotiationFailure::Signaling("webrtc info returned no body".into()))?;
        let info: RtcInfo = if response.content_format == Some(CONTENT_FORMAT_CBOR) {
            ciborium::from_reader(&body[..]).map_err(|e| {
                NegotiationFailure::Signaling(format!("malformed CBOR webrtc info: {e}"))
            })?
        } else {
            serde_json::from_slice(&body)
                .map_err(|e| NegotiationFailure::Signaling(format!("malformed webrtc info: {e}")))?
        };
        Ok(info.signaling_stream_port)
    }
}

#[async_trait]
impl MediaBackend for RtcBackend {
    async fn negotiate(
        &mut self,
        tracks: TrackSink,
        failures: FailureSink,
    ) -> Result<(), NegotiationFailure> {
        let port = self.signaling_port().await?;
        debug!(port, "Opening signaling stream");

        let stream = self
            .connection
            .open_stream(port)
            .await
            .map_err(|e| NegotiationFailure::Signaling(e.to_string()))?;
        let (sender, receiver) = signaling_channel(stream);

        sender
            .send(&SignalMessage::turn_request())
            .await
            .map_err(|e| NegotiationFailure::Signaling(e.to_string()))?;

        let (ready_tx, ready_rx) = oneshot::channel();
        let signaling = SignalingLoop::new(
            receiver,
            sender.clone(),
            self.config.ice_servers.clone(),
            tracks,
            failures,
            self.peer.clone(),
            ready_tx,
        );
        self.sender = Some(sender);
        self.signaling = Some(tokio::spawn(signaling.run()));

        ready_rx.await.unwrap_or_else(|_| {
            Err(NegotiationFailure::Signaling(
                "signaling ended before the peer connection was ready".into(),
            ))
        })
    }

    async fn close(&mut self) {
        if let Some(signaling) = self.signaling.take() {
            signaling.abort();
        }
        if let Some(peer) = self.peer.get()
            && let Err(e) = peer.close().await
        {
            warn!("Failed to close peer connection: {:?}", e);
        }
        if let Some(sender) = self.sender.take() {
            sender.shutdown().await;
        }
        debug!("WebRTC backend closed");
    }
}

/// ICE server for a legacy `servers` entry. A hostname that already names
/// a scheme is taken as the full URL.
fn legacy_ice_server(server: TurnServer) -> IceServerConfig {
    const SCHEMES: [&str; 4] = ["turn:", "turns:", "stun:", "stuns:"];

    let url = if SCHEMES.iter().any(|s| server.hostname.starts_with(s)) {
        server.hostname
    } else {
        format!("turn:{}:{}", server.hostname, server.port)
    };
    IceServerConfig {
        urls: vec![url],
        username: Some(server.username),
        credential: Some(server.password),
    }
}

/// Echo of the device's track metadata for the negotiated `mids`. Always
/// present, so the device gets a status even when it sent no metadata.
fn answer_metadata(
    known: &HashMap<String, MetadataTrack>,
    mids: Vec<String>,
) -> SignalMessageMetadata {
    let tracks = mids
        .into_iter()
        .filter_map(|mid| known.get(&mid).cloned())
        .collect();
    SignalMessageMetadata::for_tracks(tracks)
}

struct SignalingLoop {
    receiver: SignalingReceiver,
    sender: SignalingSender,
    fallback_ice: Vec<IceServerConfig>,
    sink: TrackSink,
    failures: FailureSink,
    peer: Arc<OnceLock<Arc<PeerWrapper>>>,
    peer_tx: mpsc::Sender<PeerEvent>,
    peer_rx: mpsc::Receiver<PeerEvent>,
    /// Device metadata by mid, from the latest offer or answer.
    metadata: HashMap<String, MetadataTrack>,
    ready: Option<Ready>,
}

impl SignalingLoop {
    fn new(
        receiver: SignalingReceiver,
        sender: SignalingSender,
        fallback_ice: Vec<IceServerConfig>,
        sink: TrackSink,
        failures: FailureSink,
        peer: Arc<OnceLock<Arc<PeerWrapper>>>,
        ready: Ready,
    ) -> Self {
        let (peer_tx, peer_rx) = mpsc::channel(64);
        Self {
            receiver,
            sender,
            fallback_ice,
            sink,
            failures,
            peer,
            peer_tx,
            peer_rx,
            metadata: HashMap::new(),
            ready: Some(ready),
        }
    }

    async fn run(mut self) {
        info!("Signaling loop started");

        loop {
            let outcome = tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Ok(msg) => self.handle_message(msg).await,
                    Err(e) => Err(MediaFailure::SignalingLost(e.to_string())),
                },
                Some(event) = self.peer_rx.recv() => self.handle_peer_event(event).await,
            };

            if let Err(failure) = outcome {
                self.fault(failure);
                break;
            }
        }

        info!("Signaling loop finished");
    }

    /// Fails the pending negotiation, or reports the failure once media is up.
    fn fault(&mut self, failure: MediaFailure) {
        match self.ready.take() {
            Some(ready) => {
                warn!("Signaling failed before the peer connection was ready: {}", failure);
                let failure = match failure {
                    MediaFailure::PeerConnection(e) => NegotiationFailure::Engine(e),
                    other => NegotiationFailure::Signaling(other.to_string()),
                };
                let _ = ready.send(Err(failure));
            }
            None => {
                error!("Signaling failed: {}", failure);
                self.failures.report(failure);
            }
        }
    }

    fn peer(&self) -> Option<Arc<PeerWrapper>> {
        self.peer.get().cloned()
    }

    async fn handle_message(&mut self, msg: SignalMessage) -> Result<(), MediaFailure> {
        match msg.kind {
            SignalMessageType::TurnResponse => self.handle_turn_response(msg).await,
            SignalMessageType::Offer => {
                let rejected = MediaFailure::RemoteDescription;
                let desc: SessionDescription = msg
                    .decode_data()
                    .map_err(|e| rejected(e.to_string()))?
                    .ok_or_else(|| rejected("offer without data".into()))?;
                if let Some(metadata) = msg.metadata {
                    self.record_metadata(metadata);
                }

                let peer = self
                    .peer()
                    .ok_or_else(|| rejected("offer before the TURN response".into()))?;
                peer.set_remote_description(desc)
                    .await
                    .map_err(|e| rejected(e.to_string()))?;
                let answer = peer.create_answer().await.map_err(|e| rejected(e.to_string()))?;
                let metadata = answer_metadata(&self.metadata, peer.mids().await);

                let answer = SignalMessage::description(&answer, Some(metadata))
                    .map_err(|e| MediaFailure::SignalingSend(e.to_string()))?;
                self.sender
                    .send(&answer)
                    .await
                    .map_err(|e| MediaFailure::SignalingSend(e.to_string()))?;
                debug!("Answer sent");
                Ok(())
            }
            SignalMessageType::Answer => {
                let rejected = MediaFailure::RemoteDescription;
                let desc: SessionDescription = msg
                    .decode_data()
                    .map_err(|e| rejected(e.to_string()))?
                    .ok_or_else(|| rejected("answer without data".into()))?;
                if let Some(metadata) = msg.metadata {
                    self.record_metadata(metadata);
                }
                let peer = self
                    .peer()
                    .ok_or_else(|| rejected("answer before the TURN response".into()))?;
                peer.set_remote_description(desc)
                    .await
                    .map_err(|e| rejected(e.to_string()))
            }
            SignalMessageType::IceCandidate => {
                let rejected = MediaFailure::IceCandidate;
                let candidate: SignalingIceCandidate = msg
                    .decode_data()
                    .map_err(|e| rejected(e.to_string()))?
                    .ok_or_else(|| rejected("ICE candidate without data".into()))?;
                let peer = self
                    .peer()
                    .ok_or_else(|| rejected("ICE candidate before the TURN response".into()))?;
                peer.add_ice_candidate(candidate)
                    .await
                    .map_err(|e| rejected(e.to_string()))
            }
            SignalMessageType::TurnRequest => {
                debug!("Ignoring TURN request from device");
                Ok(())
            }
        }
    }

    async fn handle_turn_response(&mut self, msg: SignalMessage) -> Result<(), MediaFailure> {
        if self.peer.get().is_some() {
            debug!("Ignoring repeated TURN response");
            return Ok(());
        }

        let legacy: Vec<IceServerConfig> = msg
            .servers
            .unwrap_or_default()
            .into_iter()
            .map(legacy_ice_server)
            .collect();
        let ice_servers = match msg.ice_servers {
            Some(servers) if !servers.is_empty() => servers,
            _ if !legacy.is_empty() => legacy,
            _ => self.fallback_ice.clone(),
        };
        debug!(count = ice_servers.len(), "TURN response received");

        let peer = PeerWrapper::new(&ice_servers, self.peer_tx.clone())
            .await
            .map_err(|e| MediaFailure::PeerConnection(format!("could not be created: {e}")))?;
        let _ = self.peer.set(Arc::new(peer));
        info!("Peer connection created");

        if let Some(ready) = self.ready.take() {
            let _ = ready.send(Ok(()));
        }
        Ok(())
    }

    fn record_metadata(&mut self, metadata: SignalMessageMetadata) {
        if metadata.failed() {
            error!("Device reported failed track negotiation");
        }
        for track in metadata.tracks.unwrap_or_default() {
            if track.failed() {
                error!(mid = %track.mid, track = %track.track_id, "Track failed: {:?}", track.error);
            }
            self.metadata.insert(track.mid.clone(), track);
        }
    }

    /// Hands a remote track to the sink, tagged with the device's id for its mid.
    fn announce(&self, handle: Arc<dyn RemoteTrack>, mid: Option<String>) {
        let device_track_id = mid
            .as_ref()
            .and_then(|m| self.metadata.get(m))
            .map(|t| t.track_id.clone());
        self.sink.discovered(MediaTrack::new(handle, device_track_id));
    }

    async fn handle_peer_event(&mut self, event: PeerEvent) -> Result<(), MediaFailure> {
        match event {
            PeerEvent::Track { remote, mid } => {
                match RtcTrack::new(remote) {
                    Some(track) => self.announce(Arc::new(track), mid),
                    None => warn!(mid = ?mid, "Ignoring track of unknown kind"),
                }
                Ok(())
            }
            PeerEvent::CandidateGenerated(candidate) => {
                let msg = SignalMessage::ice_candidate(&candidate)
                    .map_err(|e| MediaFailure::SignalingSend(e.to_string()))?;
                self.sender
                    .send(&msg)
                    .await
                    .map_err(|e| MediaFailure::SignalingSend(e.to_string()))
            }
            PeerEvent::StateChanged(state) => match state {
                RTCPeerConnectionState::Failed | RTCPeerConnectionState::Closed => Err(
                    MediaFailure::PeerConnection(format!("{state:?}").to_lowercase()),
                ),
                _ => Ok(()),
            },
        }
    }
}
