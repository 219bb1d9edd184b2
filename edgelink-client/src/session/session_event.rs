use crate::media::MediaTrack;
use edgelink_core::{
    InvalidStateError, MediaFailure, NegotiationFailure, SignalingFailure, SignalingResponse,
    TransportFailure,
};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;

/// Why a session ended without the caller asking for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionFailure {
    #[error(transparent)]
    Transport(#[from] TransportFailure),

    #[error("password authentication failed: {0}")]
    Authentication(String),

    #[error(transparent)]
    Negotiation(#[from] NegotiationFailure),

    #[error(transparent)]
    Media(#[from] MediaFailure),

    #[error(transparent)]
    Signaling(#[from] SignalingFailure),

    #[error("media setup failed: {0}")]
    Setup(#[from] InvalidStateError),
}

/// Progress of a session, in the order it happened.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Connected,
    TrackAvailable(MediaTrack),
    MediaActive,
    /// Outcome of the stream-start request. Sent exactly once per session
    /// that reaches MediaActive.
    SignalingResult(Result<SignalingResponse, SignalingFailure>),
    /// Always last. `None` when the caller closed the session.
    Ended { reason: Option<SessionFailure> },
}

pub struct SessionEvents {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionEvents {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<SessionEvent>) -> Self {
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }
}

impl Stream for SessionEvents {
    type Item = SessionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
