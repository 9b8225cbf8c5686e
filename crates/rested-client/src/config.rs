//! Client configuration.
//!
//! Settings can be built in code or loaded from TOML:
//!
//! ```toml
//! connect_timeout_ms = 500
//! request_timeout_ms = 2000
//! content_type = "application/json"
//! max_message_size = 65536
//! ```

use std::path::Path;
use std::time::Duration;

use rested_core::DEFAULT_CONTENT_TYPE;
use rested_protocol::MAX_MESSAGE_SIZE;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Configuration for the socket binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Time allowed to establish a connection.
    #[serde(rename = "connect_timeout_ms", with = "millis")]
    pub connect_timeout: Duration,

    /// Time allowed for writing a request and reading its reply.
    #[serde(rename = "request_timeout_ms", with = "millis")]
    pub request_timeout: Duration,

    /// Codec used for request payloads.
    pub content_type: String,

    /// Largest frame sent or accepted, in bytes.
    pub max_message_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    #[must_use]
    pub fn with_max_message_size(mut self, max: u32) -> Self {
        self.max_message_size = max;
        self
    }

    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> ClientResult<Self> {
        toml::from_str(text).map_err(|e| ClientError::config(format!("failed to parse config: {e}")))
    }

    /// Loads a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
