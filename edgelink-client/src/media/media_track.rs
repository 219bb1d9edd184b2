use crate::media::media_engine::RemoteTrack;
use edgelink_core::TrackKind;
use futures::Stream;
use std::collections::HashSet;
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// A remote audio or video track discovered during negotiation.
#[derive(Clone)]
pub struct MediaTrack {
    pub kind: TrackKind,
    pub id: String,
    /// Track id the device announced for this track, if any.
    pub device_track_id: Option<String>,
    pub handle: Arc<dyn RemoteTrack>,
}

impl MediaTrack {
    pub fn new(handle: Arc<dyn RemoteTrack>, device_track_id: Option<String>) -> Self {
        Self {
            kind: handle.kind(),
            id: handle.id(),
            device_track_id,
            handle,
        }
    }
}

impl fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaTrack")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("device_track_id", &self.device_track_id)
            .field("enabled", &self.handle.is_enabled())
            .finish()
    }
}

#[derive(Default)]
struct TrackRegistry {
    discovered: Vec<MediaTrack>,
    seen: HashSet<String>,
    listeners: Vec<mpsc::UnboundedSender<MediaTrack>>,
    closed: bool,
}

/// Where a media backend reports discovered tracks.
///
/// Audio tracks are enabled here, before anyone sees them. Every track is
/// recorded so late subscribers get a replay.
#[derive(Clone, Default)]
pub struct TrackSink {
    registry: Arc<Mutex<TrackRegistry>>,
}

impl TrackSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, TrackRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a track. Returns `false` for duplicates and after close.
    ///
    /// Tracks are the same when their ids match. Tracks without an id are
    /// only the same when they share a handle.
    pub fn discovered(&self, track: MediaTrack) -> bool {
        let mut registry = self.registry();
        let duplicate = if track.id.is_empty() {
            registry
                .discovered
                .iter()
                .any(|t| Arc::ptr_eq(&t.handle, &track.handle))
        } else {
            !registry.seen.insert(track.id.clone())
        };
        if registry.closed || duplicate {
            debug!(track = %track.id, "Ignoring duplicate or late track");
            return false;
        }

        if track.kind == TrackKind::Audio {
            track.handle.set_enabled(true);
        }
        info!(kind = %track.kind, track = %track.id, "Remote track discovered");

        registry.listeners.retain(|l| l.send(track.clone()).is_ok());
        registry.discovered.push(track);
        true
    }

    /// Every track so far, then live ones, in discovery order.
    pub fn subscribe(&self) -> TrackStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut registry = self.registry();
        for track in &registry.discovered {
            let _ = tx.send(track.clone());
        }
        if !registry.closed {
            registry.listeners.push(tx);
        }
        TrackStream { rx }
    }

    pub fn discovered_tracks(&self) -> Vec<MediaTrack> {
        self.registry().discovered.clone()
    }

    /// Ends all streams; later tracks are dropped.
    pub fn close(&self) {
        let mut registry = self.registry();
        registry.closed = true;
        registry.listeners.clear();
    }
}

pub struct TrackStream {
    rx: mpsc::UnboundedReceiver<MediaTrack>,
}

impl TrackStream {
    pub async fn recv(&mut self) -> Option<MediaTrack> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<MediaTrack> {
        self.rx.try_recv().ok()
    }
}

impl Stream for TrackStream {
    type Item = MediaTrack;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
