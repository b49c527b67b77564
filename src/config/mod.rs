//! Configuration management for the mixer remote
//!
//! Handles loading, parsing and validation of the YAML configuration file.
//! Every section is optional; missing values fall back to defaults that match
//! the stock mixer bridge.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::fs;

use crate::protocol::ChannelId;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelConfig>,
}

/// Mixer bridge server
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Origin of the bridge (`http://`, `https://`, `ws://` or `wss://`)
    #[serde(default = "default_server_url")]
    pub url: String,
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    #[serde(default = "default_gong_path")]
    pub gong_path: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

/// Reconnect backoff policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

/// One channel strip shown by the remote
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ChannelConfig {
    /// Display name
    pub name: String,
    /// Channel id used on the wire
    pub id: String,
}

impl ChannelConfig {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            ws_path: default_ws_path(),
            gong_path: default_gong_path(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
        }
    }
}

impl ServerConfig {
    /// Origin without trailing slash
    fn origin(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Split the origin into scheme and the remainder after `://`
    fn scheme_and_rest(&self) -> Result<(&str, &str)> {
        self.origin()
            .split_once("://")
            .with_context(|| format!("Server URL '{}' has no scheme", self.url))
    }

    /// WebSocket endpoint of the control channel
    ///
    /// The socket scheme follows the page scheme: `https` upgrades to `wss`.
    pub fn control_endpoint(&self) -> Result<String> {
        let (scheme, rest) = self.scheme_and_rest()?;
        let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => anyhow::bail!("Unsupported server URL scheme '{}'", other),
        };
        Ok(format!("{}://{}{}", ws_scheme, rest, self.ws_path))
    }

    /// HTTP endpoint of the sound effect trigger
    pub fn gong_endpoint(&self) -> Result<String> {
        let (scheme, rest) = self.scheme_and_rest()?;
        let http_scheme = match scheme.to_ascii_lowercase().as_str() {
            "http" | "ws" => "http",
            "https" | "wss" => "https",
            other => anyhow::bail!("Unsupported server URL scheme '{}'", other),
        };
        Ok(format!("{}://{}{}", http_scheme, rest, self.gong_path))
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        // Server
        if self.server.url.trim().is_empty() {
            anyhow::bail!("server.url cannot be empty");
        }
        self.server
            .control_endpoint()
            .context("Invalid server.url")?;
        for (field, path) in [
            ("server.ws_path", &self.server.ws_path),
            ("server.gong_path", &self.server.gong_path),
        ] {
            if !path.starts_with('/') {
                anyhow::bail!("{} must start with '/' (got '{}')", field, path);
            }
        }
        if self.server.request_timeout_ms == 0 {
            anyhow::bail!("server.request_timeout_ms must be greater than 0");
        }

        // Reconnect
        let reconnect = &self.reconnect;
        if reconnect.initial_delay_ms == 0 {
            anyhow::bail!("reconnect.initial_delay_ms must be greater than 0");
        }
        if reconnect.max_delay_ms < reconnect.initial_delay_ms {
            anyhow::bail!(
                "reconnect.max_delay_ms ({}) must be >= initial_delay_ms ({})",
                reconnect.max_delay_ms,
                reconnect.initial_delay_ms
            );
        }
        if !reconnect.multiplier.is_finite() || reconnect.multiplier < 1.0 {
            anyhow::bail!(
                "reconnect.multiplier must be a finite number >= 1.0 (got {})",
                reconnect.multiplier
            );
        }

        // Channels
        let mut seen = HashSet::new();
        for (idx, channel) in self.channels.iter().enumerate() {
            if channel.id.is_empty() {
                anyhow::bail!("Channel {} id cannot be empty", idx);
            }
            if channel.name.is_empty() {
                anyhow::bail!("Channel '{}' name cannot be empty", channel.id);
            }
            if ChannelId::new(channel.id.clone()).is_master() {
                anyhow::bail!(
                    "Channel {} uses the reserved id '{}'",
                    idx,
                    ChannelId::MASTER
                );
            }
            if !seen.insert(channel.id.as_str()) {
                anyhow::bail!("Duplicate channel id '{}'", channel.id);
            }
        }

        Ok(())
    }
}

// Default value functions
fn default_server_url() -> String { "http://localhost:8000".to_string() }
fn default_ws_path() -> String { "/ws".to_string() }
fn default_gong_path() -> String { "/play-gong".to_string() }
fn default_request_timeout() -> u64 { 5000 }
fn default_initial_delay() -> u64 { 1000 }
fn default_max_delay() -> u64 { 5000 }
fn default_multiplier() -> f64 { 1.5 }

fn default_channels() -> Vec<ChannelConfig> {
    ["Headset 1", "Headset 2", "Hand 1", "Hand 2", "HDMI", "Regie"]
        .into_iter()
        .map(|name| ChannelConfig::new(name, name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_minimal_config_uses_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("remote.yaml");
        std::fs::write(&path, "server:\n  url: \"http://10.0.0.5:8000\"\n")?;

        let config = AppConfig::load(&path.to_string_lossy()).await?;
        assert_eq!(config.server.url, "http://10.0.0.5:8000");
        assert_eq!(config.server.ws_path, "/ws");
        assert_eq!(config.reconnect.initial_delay_ms, 1000);
        assert_eq!(config.reconnect.max_delay_ms, 5000);
        assert_eq!(config.reconnect.multiplier, 1.5);
        assert_eq!(config.channels.len(), 6);
        assert_eq!(config.channels[4], ChannelConfig::new("HDMI", "HDMI"));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_full_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("remote.yaml");
        let yaml = r#"
server:
  url: "https://mixer.local/"
reconnect:
  initial_delay_ms: 250
  max_delay_ms: 4000
  multiplier: 2.0
channels:
  - name: "Lead Vocal"
    id: "vox"
  - name: "Keys"
    id: "keys"
"#;
        std::fs::write(&path, yaml)?;

        let config = AppConfig::load(&path.to_string_lossy()).await?;
        assert_eq!(config.server.control_endpoint()?, "wss://mixer.local/ws");
        assert_eq!(config.server.gong_endpoint()?, "https://mixer.local/play-gong");
        assert_eq!(config.reconnect.multiplier, 2.0);
        assert_eq!(config.channels[0].id, "vox");
        Ok(())
    }

    #[tokio::test]
    async fn test_save_then_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("saved.yaml");
        let path = path.to_string_lossy().to_string();

        AppConfig::default().save(&path).await?;
        let loaded = AppConfig::load(&path).await?;
        assert_eq!(loaded.server.url, "http://localhost:8000");
        Ok(())
    }

    #[tokio::test]
    async fn test_load_missing_file_fails() {
        let err = AppConfig::load("/nonexistent/remote.yaml").await.unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_endpoint_scheme_follows_page() {
        let mut server = ServerConfig::default();
        assert_eq!(server.control_endpoint().unwrap(), "ws://localhost:8000/ws");
        assert_eq!(server.gong_endpoint().unwrap(), "http://localhost:8000/play-gong");

        server.url = "HTTPS://10.1.1.1:8443".to_string();
        assert_eq!(server.control_endpoint().unwrap(), "wss://10.1.1.1:8443/ws");

        server.url = "ws://10.1.1.1:8000".to_string();
        assert_eq!(server.gong_endpoint().unwrap(), "http://10.1.1.1:8000/play-gong");

        server.url = "ftp://10.1.1.1".to_string();
        assert!(server.control_endpoint().is_err());

        server.url = "10.1.1.1:8000".to_string();
        assert!(server.control_endpoint().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.channels = default_channels();
        assert!(config.validate().is_ok());

        let mut bad = config.clone();
        bad.reconnect.max_delay_ms = 500;
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.reconnect.multiplier = 0.5;
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.reconnect.initial_delay_ms = 0;
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.channels.push(ChannelConfig::new("Main", "master"));
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.channels.push(ChannelConfig::new("Again", "HDMI"));
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.server.ws_path = "ws".to_string();
        assert!(bad.validate().is_err());

        let mut bad = config;
        bad.server.url = String::new();
        assert!(bad.validate().is_err());
    }
}
