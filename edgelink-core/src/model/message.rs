use serde::{Deserialize, Serialize};

/// Message kinds carried on the device's WebRTC signaling stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SignalMessageType {
    Offer,
    Answer,
    IceCandidate,
    TurnRequest,
    TurnResponse,
}

impl From<SignalMessageType> for u8 {
    fn from(t: SignalMessageType) -> Self {
        match t {
            SignalMessageType::Offer => 0,
            SignalMessageType::Answer => 1,
            SignalMessageType::IceCandidate => 2,
            SignalMessageType::TurnRequest => 3,
            SignalMessageType::TurnResponse => 4,
        }
    }
}

impl TryFrom<u8> for SignalMessageType {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Ok(match v {
            0 => SignalMessageType::Offer,
            1 => SignalMessageType::Answer,
            2 => SignalMessageType::IceCandidate,
            3 => SignalMessageType::TurnRequest,
            4 => SignalMessageType::TurnResponse,
            other => return Err(format!("unknown signal message type {other}")),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// TURN server entry of older devices, superseded by `iceServers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnServer {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataTrack {
    pub mid: String,
    pub track_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MetadataTrack {
    pub fn failed(&self) -> bool {
        matches!(self.error.as_deref(), Some(e) if e != "OK")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalMessageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracks: Option<Vec<MetadataTrack>>,
    #[serde(default)]
    pub no_trickle: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl SignalMessageMetadata {
    /// Metadata echoing `tracks`; status is `FAILED` if any of them carries an error.
    pub fn for_tracks(tracks: Vec<MetadataTrack>) -> Self {
        let status = if tracks.iter().any(MetadataTrack::failed) {
            "FAILED"
        } else {
            "OK"
        };
        Self {
            tracks: Some(tracks),
            no_trickle: false,
            status: Some(status.to_owned()),
        }
    }

    pub fn failed(&self) -> bool {
        self.status.as_deref() == Some("FAILED")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalMessage {
    #[serde(rename = "type")]
    pub kind: SignalMessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servers: Option<Vec<TurnServer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ice_servers: Option<Vec<IceServerConfig>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SignalMessageMetadata>,
}

impl SignalMessage {
    pub fn new(kind: SignalMessageType) -> Self {
        Self {
            kind,
            data: None,
            servers: None,
            ice_servers: None,
            metadata: None,
        }
    }

    pub fn turn_request() -> Self {
        Self::new(SignalMessageType::TurnRequest)
    }

    pub fn description(
        desc: &SessionDescription,
        metadata: Option<SignalMessageMetadata>,
    ) -> serde_json::Result<Self> {
        let kind = match desc.kind.as_str() {
            "offer" => SignalMessageType::Offer,
            _ => SignalMessageType::Answer,
        };
        Ok(Self {
            data: Some(serde_json::to_string(desc)?),
            metadata,
            ..Self::new(kind)
        })
    }

    pub fn ice_candidate(candidate: &SignalingIceCandidate) -> serde_json::Result<Self> {
        Ok(Self {
            data: Some(serde_json::to_string(candidate)?),
            ..Self::new(SignalMessageType::IceCandidate)
        })
    }

    /// Decodes `data` as the JSON document the message kind carries.
    pub fn decode_data<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<Option<T>> {
        self.data.as_deref().map(serde_json::from_str).transpose()
    }
}

/// SDP wrapped the way the device expects it inside `data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: String,
    pub sdp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalingIceCandidate {
    pub sdp_mid: String,
    pub candidate: String,
}

/// Body of a successful `/p2p/webrtc-info` read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtcInfo {
    #[serde(rename = "SignalingStreamPort")]
    pub signaling_stream_port: u32,
}
