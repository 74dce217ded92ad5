//! Handles loading and saving of application configuration.
//!
//! Settings are layered: a base `config/floatchat.toml` next to the
//! binary, a per-user file in the platform config directory, and
//! `FLOATCHAT_`-prefixed environment variables, later layers winning.
//! A user file with the effective values is written on first run.

use eyre::{Context, eyre};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Channel whose chat the overlay mirrors.
    pub channel: String,
    /// Sender names whose messages are never shown (chat bots, mostly).
    pub exclude: Vec<String>,
    /// Capacity of the frame fan-out to renderers; slow renderers skip
    /// frames beyond this many in flight.
    pub max_messages: usize,
    /// CSS color renderers apply to plain text tokens.
    pub message_text_color: String,
    /// Bind address of the overlay WebSocket server.
    pub listen_addr: String,
    /// Third-party emote providers requested from the aggregator.
    pub providers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel: "twitch".to_string(),
            exclude: vec![
                "streamelements".to_string(),
                "streamlabs".to_string(),
                "nightbot".to_string(),
                "moobot".to_string(),
                "fossabot".to_string(),
            ],
            max_messages: 100,
            message_text_color: "#fff".to_string(),
            listen_addr: "127.0.0.1:4350".to_string(),
            providers: vec!["7tv".to_string(), "bttv".to_string(), "ffz".to_string()],
        }
    }
}

impl Config {
    /// Whether messages from `sender` are hidden from the overlay.
    /// Matching is case-insensitive and tolerant of stray whitespace in
    /// the configured names.
    pub fn is_excluded(&self, sender: &str) -> bool {
        let sender = sender.to_lowercase();
        self.exclude
            .iter()
            .any(|name| name.trim().to_lowercase() == sender)
    }
}

fn get_config_path() -> Result<PathBuf, eyre::Report> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| eyre!("Could not find a config directory"))?
        .join(env!("CARGO_PKG_NAME"));

    Ok(config_dir.join("floatchat.toml"))
}

pub async fn load() -> Result<Config, eyre::Report> {
    let user_config_path = get_config_path()?;
    tracing::info!("Loading user config from {:?}", user_config_path);

    let base_config_path = "config/floatchat.toml";

    let config: Config = Figment::new()
        .merge(Toml::file(base_config_path))
        .merge(Toml::file(&user_config_path))
        .merge(Env::prefixed("FLOATCHAT_"))
        .extract()
        .context("Could not load config")?;

    if !user_config_path.exists() {
        if let Err(e) = save(&config).await {
            tracing::warn!("Failed to save initial config: {}", e);
        }
    }

    Ok(config)
}

pub async fn save(config: &Config) -> Result<(), eyre::Report> {
    let path = get_config_path()?;
    tracing::info!("Saving config to {:?}", path);

    let bytes = toml::to_string_pretty(config).context("Failed to serialize config")?;

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }
    }

    let mut file = tokio::fs::File::create(path)
        .await
        .context("Failed to create config file")?;

    file.write_all(bytes.as_bytes())
        .await
        .context("Failed to write config to file")?;

    Ok(())
}
