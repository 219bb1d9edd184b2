mod message;
mod options;
mod session;
mod signaling;
mod track;

pub use message::{
    IceServerConfig, MetadataTrack, RtcInfo, SessionDescription, SignalMessage,
    SignalMessageMetadata, SignalMessageType, SignalingIceCandidate, TurnServer,
};
pub use options::ConnectionOptions;
pub use session::{ObserverId, SessionId};
pub use signaling::{Payload, SignalingExchange, SignalingRequest, SignalingResponse};
pub use track::TrackKind;
