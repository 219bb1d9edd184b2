use thiserror::Error;

/// Malformed or incomplete connection options. Raised synchronously when the
/// options are built, never from an I/O path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing connection option `{0}`")]
    Missing(&'static str),

    #[error("connection option `{0}` must be valid UTF-8")]
    NotUtf8(&'static str),
}

/// An operation was invoked in a state that forbids it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {operation} while {state}")]
pub struct InvalidStateError {
    pub operation: &'static str,
    pub state: String,
}

impl InvalidStateError {
    pub fn new(operation: &'static str, state: impl ToString) -> Self {
        Self {
            operation,
            state: state.to_string(),
        }
    }
}

/// The underlying transport failed, was rejected, or went away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFailure {
    #[error("device rejected the connection: {0}")]
    Rejected(String),

    #[error("transport connect timed out")]
    TimedOut,

    #[error("transport lost: {0}")]
    Lost(String),

    #[error("transport error: {0}")]
    Io(String),
}

/// Media negotiation did not reach the Active state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationFailure {
    #[error("negotiation cancelled")]
    Cancelled,

    #[error("negotiation timed out")]
    TimedOut,

    #[error("signaling setup failed: {0}")]
    Signaling(String),

    #[error("media engine error: {0}")]
    Engine(String),
}

/// An active media session went down after negotiation succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaFailure {
    #[error("signaling stream lost: {0}")]
    SignalingLost(String),

    #[error("failed to send signaling message: {0}")]
    SignalingSend(String),

    #[error("remote description rejected: {0}")]
    RemoteDescription(String),

    #[error("ICE candidate rejected: {0}")]
    IceCandidate(String),

    #[error("peer connection {0}")]
    PeerConnection(String),
}

/// The stream-start exchange did not report success.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalingFailure {
    #[error("device answered with status {status}")]
    Rejected {
        status: u16,
        body: Option<bytes::Bytes>,
    },

    #[error(transparent)]
    Transport(#[from] TransportFailure),

    #[error(transparent)]
    InvalidState(#[from] InvalidStateError),
}

impl SignalingFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            SignalingFailure::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("frame of {0} bytes exceeds the limit")]
    FrameTooLarge(usize),

    #[error("signaling stream closed")]
    Closed,

    #[error("malformed signal message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("signaling stream I/O: {0}")]
    Io(#[from] std::io::Error),
}

/// Umbrella error for synchronous calls that can fail in more than one way.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    InvalidState(#[from] InvalidStateError),

    #[error(transparent)]
    Transport(#[from] TransportFailure),

    #[error(transparent)]
    Negotiation(#[from] NegotiationFailure),

    #[error(transparent)]
    Media(#[from] MediaFailure),

    #[error(transparent)]
    Signaling(#[from] SignalingFailure),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
