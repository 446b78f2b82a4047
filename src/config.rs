use std::{
    collections::HashMap,
    fs::{self, File},
    io::prelude::*,
    path::Path,
    time::Duration,
};

use log::warn;
use serde::{Deserialize, Serialize};

/// Top-level server configuration, loaded from a TOML file.
///
/// Immutable once the server is started.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Socket address to bind to, e.g. "0.0.0.0:25565".
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Player cap advertised in status responses.
    #[serde(default = "default_max_players")]
    pub max_players: u32,

    /// Text shown under the server name in the multiplayer list.
    #[serde(default = "default_description")]
    pub description: String,

    /// Version label advertised in status responses.
    #[serde(default = "default_version_name")]
    pub version_name: String,

    /// The only protocol version accepted during the handshake.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: u32,

    #[serde(default)]
    pub enforces_secure_chat: bool,

    /// Maximum concurrent connections.
    #[serde(default = "default_max_conn")]
    pub max_conn: u32,

    /// Seconds a connection may stay silent before it is dropped.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// Seconds to wait for open connections after shutdown is requested.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,

    #[serde(flatten)]
    pub other_fields: HashMap<String, toml::Value>,
}

fn default_bind() -> String {
    "0.0.0.0:25565".to_string()
}

fn default_max_players() -> u32 {
    20
}

fn default_description() -> String {
    "A Minecraft Server".to_string()
}

fn default_version_name() -> String {
    "1.21.10".to_string()
}

fn default_protocol_version() -> u32 {
    773
}

fn default_max_conn() -> u32 {
    65535
}

fn default_read_timeout() -> u64 {
    30
}

fn default_shutdown_grace() -> u64 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_players: default_max_players(),
            description: default_description(),
            version_name: default_version_name(),
            protocol_version: default_protocol_version(),
            enforces_secure_chat: false,
            max_conn: default_max_conn(),
            read_timeout_secs: default_read_timeout(),
            shutdown_grace_secs: default_shutdown_grace(),
            other_fields: HashMap::new(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ServerConfigLoadError> {
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ServerConfigLoadError> {
        let config: Self = toml::from_str(raw)?;

        for field in &config.other_fields {
            warn!(
                "Unknown configuration '{}' with value {:?}",
                field.0, field.1
            );
        }

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let config_str = toml::to_string(&self)?;
        let mut file = File::create(path)?;
        file.write_all(config_str.as_bytes())?;
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerConfigLoadError {
    #[error("Could not open config")]
    Io(#[from] std::io::Error),
    #[error("Could not parse")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ServerConfig::parse("").unwrap();
        assert_eq!(config.bind, "0.0.0.0:25565");
        assert_eq!(config.max_players, 20);
        assert_eq!(config.protocol_version, 773);
        assert_eq!(config.version_name, "1.21.10");
        assert!(!config.enforces_secure_chat);
        assert_eq!(config.read_timeout(), Duration::from_secs(30));
        assert_eq!(config.shutdown_grace(), Duration::from_secs(5));
        assert!(config.other_fields.is_empty());
    }

    #[test]
    fn partial_file_fills_missing_fields() {
        let raw = r#"
            max_players = 4
            description = "letsplay"
            motd_color = "red"
        "#;
        let config = ServerConfig::parse(raw).unwrap();
        assert_eq!(config.max_players, 4);
        assert_eq!(config.description, "letsplay");
        assert_eq!(config.max_conn, 65535);
        assert!(config.other_fields.contains_key("motd_color"));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let err = ServerConfig::parse("max_players = \"many\"").unwrap_err();
        assert!(matches!(err, ServerConfigLoadError::Parse(_)));
    }

    #[test]
    fn defaults_survive_a_save_cycle() {
        let raw = toml::to_string(&ServerConfig::default()).unwrap();
        let config = ServerConfig::parse(&raw).unwrap();
        assert_eq!(config.description, ServerConfig::default().description);
        assert_eq!(config.protocol_version, 773);
    }
}
