use crate::media::MediaConfig;
use crate::transport::ConnectionConfig;
use edgelink_core::SignalingRequest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do when the stream-start request does not report success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalingFailurePolicy {
    /// Report the failure and keep the media session running.
    #[default]
    KeepSession,
    /// Report the failure, then end the session.
    EndSession,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for PasswordAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub connection: ConnectionConfig,
    pub media: MediaConfig,
    /// Sent once media is active. Defaults to `GET /webrtc/get`.
    pub stream_request: SignalingRequest,
    pub signaling_failure_policy: SignalingFailurePolicy,
    /// Password login performed after connect, before media starts.
    pub password_auth: Option<PasswordAuth>,
}
