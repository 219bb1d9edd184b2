pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";

/// Path of the request that tells the device to start streaming.
pub const STREAM_START_PATH: &str = "/webrtc/get";

/// Path of the request that returns the signaling stream port.
pub const WEBRTC_INFO_PATH: &str = "/p2p/webrtc-info";

/// Status the device answers the stream-start request with once it streams.
pub const STATUS_STREAM_STARTED: u16 = 201;

/// Status of a successful `/p2p/webrtc-info` read.
pub const STATUS_CONTENT: u16 = 205;

/// CoAP content formats.
pub const CONTENT_FORMAT_JSON: u16 = 50;
pub const CONTENT_FORMAT_CBOR: u16 = 60;

/// Serde adapter storing an optional `Duration` as whole milliseconds.
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
