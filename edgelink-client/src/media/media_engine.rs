use crate::media::media_track::TrackSink;
use crate::transport::DeviceConnection;
use async_trait::async_trait;
use edgelink_core::{MediaFailure, NegotiationFailure, TrackKind};
use std::any::Any;
use tokio::sync::mpsc;

/// Engine-side handle of one remote track. Opaque to this crate apart from
/// the enable switch; renderers downcast through [`RemoteTrack::as_any`].
pub trait RemoteTrack: Send + Sync + 'static {
    fn kind(&self) -> TrackKind;

    /// Engine-unique id of the track.
    fn id(&self) -> String;

    fn set_enabled(&self, enabled: bool);

    fn is_enabled(&self) -> bool;

    fn as_any(&self) -> &dyn Any;
}

/// Factory for media sessions layered on a connected device connection.
pub trait MediaEngine: Send + Sync + 'static {
    fn create_session(&self, connection: DeviceConnection) -> Box<dyn MediaBackend>;
}

/// Where a backend reports that its media went down after negotiation.
/// Every report is fatal to the media session.
#[derive(Clone)]
pub struct FailureSink {
    tx: mpsc::UnboundedSender<MediaFailure>,
}

impl FailureSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MediaFailure>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Returns `false` once nobody listens anymore.
    pub fn report(&self, failure: MediaFailure) -> bool {
        self.tx.send(failure).is_ok()
    }
}

/// One engine-side media session.
#[async_trait]
pub trait MediaBackend: Send + 'static {
    /// Negotiates the session. The backend keeps `tracks` and reports every
    /// remote track through it, including tracks that appear after this
    /// returns. Later breakage goes to `failures`.
    async fn negotiate(
        &mut self,
        tracks: TrackSink,
        failures: FailureSink,
    ) -> Result<(), NegotiationFailure>;

    async fn close(&mut self);
}
