use crate::error::SignalingFailure;
use crate::utils::{CONTENT_FORMAT_JSON, STATUS_STREAM_STARTED, STREAM_START_PATH, WEBRTC_INFO_PATH};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A request issued over an established device connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalingRequest {
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub content_format: u16,
    pub data: Bytes,
}

impl SignalingRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            payload: None,
            accept: None,
        }
    }

    /// `GET /webrtc/get`: tells the device a peer is ready and it may start streaming.
    pub fn stream_start() -> Self {
        Self::new("GET", STREAM_START_PATH)
    }

    /// `GET /p2p/webrtc-info`, asking for a JSON body.
    pub fn webrtc_info() -> Self {
        Self::new("GET", WEBRTC_INFO_PATH).with_accept(CONTENT_FORMAT_JSON)
    }

    pub fn with_payload(mut self, content_format: u16, data: impl Into<Bytes>) -> Self {
        self.payload = Some(Payload {
            content_format,
            data: data.into(),
        });
        self
    }

    pub fn with_accept(mut self, content_format: u16) -> Self {
        self.accept = Some(content_format);
        self
    }
}

impl Default for SignalingRequest {
    fn default() -> Self {
        Self::stream_start()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalingResponse {
    pub status: u16,
    pub content_format: Option<u16>,
    pub body: Option<Bytes>,
}

impl SignalingResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            content_format: None,
            body: None,
        }
    }

    pub fn with_body(mut self, content_format: u16, body: impl Into<Bytes>) -> Self {
        self.content_format = Some(content_format);
        self.body = Some(body.into());
        self
    }
}

/// One request paired with the response the device gave to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalingExchange {
    pub request: SignalingRequest,
    pub response: SignalingResponse,
}

impl SignalingExchange {
    pub fn new(request: SignalingRequest, response: SignalingResponse) -> Self {
        Self { request, response }
    }

    /// 201 means the device accepted and is streaming; nothing else does.
    pub fn stream_started(&self) -> bool {
        self.response.status == STATUS_STREAM_STARTED
    }

    pub fn into_result(self) -> Result<SignalingResponse, SignalingFailure> {
        if self.stream_started() {
            return Ok(self.response);
        }
        Err(SignalingFailure::Rejected {
            status: self.response.status,
            body: self.response.body,
        })
    }
}
