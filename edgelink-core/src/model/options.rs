use crate::error::ConfigError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity and credential material for one device connection.
///
/// Validated once, at construction; a value of this type always has every
/// field present and non-empty.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawOptions")]
pub struct ConnectionOptions {
    product_id: String,
    device_id: String,
    private_key: Bytes,
    server_connect_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawOptions {
    #[serde(default)]
    product_id: String,
    #[serde(default)]
    device_id: String,
    #[serde(default)]
    private_key: String,
    #[serde(default)]
    server_connect_token: String,
}

/// The flat key/value document handed to the transport's connect call.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TransportDocument<'a> {
    product_id: &'a str,
    device_id: &'a str,
    private_key: &'a str,
    server_connect_token: &'a str,
}

impl ConnectionOptions {
    pub fn new(
        product_id: impl Into<String>,
        device_id: impl Into<String>,
        private_key: impl Into<Bytes>,
        server_connect_token: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let options = Self {
            product_id: product_id.into(),
            device_id: device_id.into(),
            private_key: private_key.into(),
            server_connect_token: server_connect_token.into(),
        };
        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        require("ProductId", &self.product_id)?;
        require("DeviceId", &self.device_id)?;
        let key = std::str::from_utf8(&self.private_key)
            .map_err(|_| ConfigError::NotUtf8("PrivateKey"))?;
        require("PrivateKey", key)?;
        require("ServerConnectToken", &self.server_connect_token)
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn private_key(&self) -> &Bytes {
        &self.private_key
    }

    pub fn server_connect_token(&self) -> &str {
        &self.server_connect_token
    }

    /// Serializes the options into the JSON document the transport expects.
    pub fn to_transport_json(&self) -> String {
        let doc = TransportDocument {
            product_id: &self.product_id,
            device_id: &self.device_id,
            // validated as UTF-8 at construction
            private_key: std::str::from_utf8(&self.private_key).unwrap_or_default(),
            server_connect_token: &self.server_connect_token,
        };
        serde_json::to_string(&doc).unwrap_or_default()
    }
}

fn require(name: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(())
}

impl TryFrom<RawOptions> for ConnectionOptions {
    type Error = ConfigError;

    fn try_from(raw: RawOptions) -> Result<Self, Self::Error> {
        Self::new(
            raw.product_id,
            raw.device_id,
            raw.private_key,
            raw.server_connect_token,
        )
    }
}

impl fmt::Debug for ConnectionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionOptions")
            .field("product_id", &self.product_id)
            .field("device_id", &self.device_id)
            .field("private_key", &"<redacted>")
            .field("server_connect_token", &"<redacted>")
            .finish()
    }
}
