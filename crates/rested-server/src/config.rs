//! Server configuration.
//!
//! ```toml
//! bind_addr = "0.0.0.0:8080"
//! connection_timeout_secs = 30
//! max_connections = 100
//! content_type = "application/json"
//! max_message_size = 1048576
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use rested_core::DEFAULT_CONTENT_TYPE;
use rested_protocol::MAX_MESSAGE_SIZE;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Socket binding configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on. Port 0 picks a free port.
    pub bind_addr: SocketAddr,

    /// Idle time allowed between frames, and for writing a reply.
    #[serde(rename = "connection_timeout_secs", with = "secs")]
    pub connection_timeout: Duration,

    /// Maximum concurrent connections.
    pub max_connections: usize,

    /// Codec used for reply payloads.
    pub content_type: String,

    /// Largest frame accepted or sent, in bytes.
    pub max_message_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            connection_timeout: Duration::from_secs(30),
            max_connections: 100,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

impl ServerConfig {
    /// Creates a configuration listening on `bind_addr`.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
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
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| ServerError::config(format!("failed to parse config: {e}")))?;
        if config.max_connections == 0 {
            return Err(ServerError::config("max_connections must be at least 1"));
        }
        Ok(config)
    }

    /// Loads a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServerError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.connection_timeout, Duration::from_secs(30));
        assert_eq!(config.max_connections, 100);
        assert_eq!(config.content_type, "application/json");
        assert_eq!(config.max_message_size, 1024 * 1024);
    }

    #[test]
    fn custom_config() {
        let config = ServerConfig::new("0.0.0.0:9000".parse().unwrap())
            .with_connection_timeout(Duration::from_secs(60))
            .with_max_connections(50)
            .with_content_type("application/json; charset=utf-8");

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.connection_timeout, Duration::from_secs(60));
        assert_eq!(config.max_connections, 50);
    }

    #[test]
    fn toml_config() {
        let config = ServerConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:7000"
            connection_timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:7000".parse().unwrap());
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
        assert_eq!(config.max_connections, 100);

        assert!(ServerConfig::from_toml_str("bind_addr = \"nowhere\"").is_err());
        assert!(ServerConfig::from_toml_str("max_connections = 0").is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.toml");
        std::fs::write(&path, "max_connections = 4\n").unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.max_connections, 4);
        assert!(matches!(
            ServerConfig::load(dir.path().join("absent.toml")),
            Err(ServerError::Config { .. })
        ));
    }
}
