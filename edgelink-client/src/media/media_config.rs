use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Upper bound on media negotiation. `None` waits forever.
    #[serde(rename = "negotiation_timeout_ms", with = "edgelink_core::utils::duration_ms")]
    pub negotiation_timeout: Option<Duration>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            negotiation_timeout: Some(Duration::from_secs(30)),
        }
    }
}
