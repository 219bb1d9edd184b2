use edgelink_core::IceServerConfig;
use edgelink_core::utils::DEFAULT_STUN_ADDR;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RtcConfig {
    /// Used when the device's TURN response lists no servers.
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for RtcConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: vec![DEFAULT_STUN_ADDR.to_string()],
                username: None,
                credential: None,
            }],
        }
    }
}
