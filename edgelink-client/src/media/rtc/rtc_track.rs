use crate::media::RemoteTrack;
use edgelink_core::TrackKind;
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_remote::TrackRemote;

/// A WebRTC remote track. Renderers get at the RTP source through
/// [`RtcTrack::remote`] after downcasting the [`RemoteTrack`] handle.
pub struct RtcTrack {
    remote: Arc<TrackRemote>,
    kind: TrackKind,
    enabled: AtomicBool,
}

impl RtcTrack {
    /// `None` for tracks whose codec type is neither audio nor video.
    pub fn new(remote: Arc<TrackRemote>) -> Option<Self> {
        let kind = match remote.kind() {
            RTPCodecType::Audio => TrackKind::Audio,
            RTPCodecType::Video => TrackKind::Video,
            _ => return None,
        };
        Some(Self {
            remote,
            kind,
            enabled: AtomicBool::new(false),
        })
    }

    pub fn remote(&self) -> &Arc<TrackRemote> {
        &self.remote
    }
}

impl RemoteTrack for RtcTrack {
    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn id(&self) -> String {
        self.remote.id()
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
