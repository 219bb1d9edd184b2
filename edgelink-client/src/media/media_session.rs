use crate::media::media_config::MediaConfig;
use crate::media::media_engine::{FailureSink, MediaBackend, MediaEngine};
use crate::media::media_track::{TrackSink, TrackStream};
use crate::transport::{ConnectionState, DeviceConnection};
use edgelink_core::{InvalidStateError, MediaFailure, NegotiationFailure};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    Created,
    Negotiating,
    Active,
    Closed,
}

impl fmt::Display for MediaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaState::Created => "created",
            MediaState::Negotiating => "negotiating",
            MediaState::Active => "active",
            MediaState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Pending outcome of [`MediaSession::connect`].
#[must_use = "the negotiation outcome is only observable by awaiting it"]
pub struct Negotiation {
    rx: oneshot::Receiver<Result<(), NegotiationFailure>>,
}

impl Future for Negotiation {
    type Output = Result<(), NegotiationFailure>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(NegotiationFailure::Cancelled)))
    }
}

/// A real-time media session layered on a connected [`DeviceConnection`].
#[derive(Clone)]
pub struct MediaSession {
    inner: Arc<MediaInner>,
}

struct MediaInner {
    connection: DeviceConnection,
    config: MediaConfig,
    state: watch::Sender<MediaState>,
    tracks: TrackSink,
    /// Empty while a negotiation owns the backend, and after close.
    backend: Mutex<Option<Box<dyn MediaBackend>>>,
    /// Why the backend went down after negotiation, if it did.
    failure: std::sync::Mutex<Option<MediaFailure>>,
}

impl MediaSession {
    pub fn create(
        engine: &dyn MediaEngine,
        connection: &DeviceConnection,
        config: MediaConfig,
    ) -> Result<Self, InvalidStateError> {
        let state = connection.state();
        if state != ConnectionState::Connected {
            return Err(InvalidStateError::new("create a media session", state));
        }

        debug!(device = connection.options().device_id(), "Creating media session");
        let backend = engine.create_session(connection.clone());

        Ok(Self {
            inner: Arc::new(MediaInner {
                connection: connection.clone(),
                config,
                state: watch::Sender::new(MediaState::Created),
                tracks: TrackSink::new(),
                backend: Mutex::new(Some(backend)),
                failure: std::sync::Mutex::new(None),
            }),
        })
    }

    pub fn state(&self) -> MediaState {
        *self.inner.state.borrow()
    }

    /// Set when the backend reported a failure after negotiation. The
    /// session is Closed by then.
    pub fn failure(&self) -> Option<MediaFailure> {
        self.inner
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Receiver of every state change.
    pub fn watch_state(&self) -> watch::Receiver<MediaState> {
        self.inner.state.subscribe()
    }

    /// Tracks discovered so far, then every later one. Audio is already enabled.
    pub fn tracks(&self) -> TrackStream {
        self.inner.tracks.subscribe()
    }

    /// Starts negotiation. Allowed once, from Created.
    pub fn connect(&self) -> Result<Negotiation, InvalidStateError> {
        let started = self.inner.state.send_if_modified(|state| {
            if *state != MediaState::Created {
                return false;
            }
            *state = MediaState::Negotiating;
            true
        });
        if !started {
            return Err(InvalidStateError::new("connect media", self.state()));
        }

        let (tx, rx) = oneshot::channel();
        tokio::spawn(self.inner.clone().negotiate(tx));
        Ok(Negotiation { rx })
    }

    /// Releases engine resources. A pending negotiation resolves as cancelled.
    pub async fn close(&self) {
        let previous = self.inner.state.send_replace(MediaState::Closed);
        if previous == MediaState::Closed {
            return;
        }

        info!(device = self.inner.connection.options().device_id(), "Media session closed");
        self.inner.release().await;
    }
}

impl MediaInner {
    async fn closed(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| *s == MediaState::Closed).await;
    }

    async fn release(&self) {
        self.tracks.close();
        let backend = self.backend.lock().await.take();
        if let Some(mut backend) = backend {
            backend.close().await;
        }
    }

    /// Closes the session on behalf of a failing backend.
    async fn fail(&self, failure: MediaFailure) {
        let failed = self.state.send_if_modified(|state| {
            if *state == MediaState::Closed {
                return false;
            }
            *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(failure.clone());
            *state = MediaState::Closed;
            true
        });
        if !failed {
            debug!("Ignoring media failure after close: {}", failure);
            return;
        }

        error!(device = self.connection.options().device_id(), "Media session failed: {}", failure);
        self.release().await;
    }

    /// Turns the first backend report into a failure, until the session closes.
    async fn watch_failures(&self, mut reports: mpsc::UnboundedReceiver<MediaFailure>) {
        tokio::select! {
            Some(failure) = reports.recv() => self.fail(failure).await,
            _ = self.closed() => {}
        }
    }

    async fn negotiate(self: Arc<Self>, done: oneshot::Sender<Result<(), NegotiationFailure>>) {
        let Some(mut backend) = self.backend.lock().await.take() else {
            let _ = done.send(Err(NegotiationFailure::Cancelled));
            return;
        };

        let (failures, reports) = FailureSink::channel();
        let outcome = {
            let sink = self.tracks.clone();
            let negotiation = async {
                match self.config.negotiation_timeout {
                    Some(limit) => tokio::time::timeout(limit, backend.negotiate(sink, failures))
                        .await
                        .unwrap_or(Err(NegotiationFailure::TimedOut)),
                    None => backend.negotiate(sink, failures).await,
                }
            };

            tokio::select! {
                res = negotiation => res,
                _ = self.connection.closed() => Err(NegotiationFailure::Cancelled),
                _ = self.closed() => Err(NegotiationFailure::Cancelled),
            }
        };

        match outcome {
            Ok(()) => {
                let mut slot = self.backend.lock().await;
                let activated = self.state.send_if_modified(|state| {
                    if *state != MediaState::Negotiating {
                        return false;
                    }
                    *state = MediaState::Active;
                    true
                });

                if activated {
                    *slot = Some(backend);
                    drop(slot);
                    info!("Media session active");
                    let _ = done.send(Ok(()));
                    self.watch_failures(reports).await;
                } else {
                    drop(slot);
                    backend.close().await;
                    let _ = done.send(Err(NegotiationFailure::Cancelled));
                }
            }
            Err(failure) => {
                if failure != NegotiationFailure::Cancelled {
                    warn!("Media negotiation failed: {}", failure);
                }
                self.state.send_replace(MediaState::Closed);
                self.tracks.close();
                backend.close().await;
                let _ = done.send(Err(failure));
            }
        }
    }
}

impl fmt::Debug for MediaSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaSession")
            .field("state", &self.state())
            .field("connection", &self.inner.connection)
            .finish()
    }
}
