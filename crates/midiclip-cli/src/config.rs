use std::path::{Path, PathBuf};

use midiclip_core::SessionConfig;
use tracing::warn;

#[derive(serde::Serialize, serde::Deserialize, Default, Debug)]
pub(crate) struct CliConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub target: TargetConfig,
}

#[derive(serde::Serialize, serde::Deserialize, Default, Debug, Clone, Copy)]
pub(crate) struct TargetConfig {
    #[serde(default)]
    pub track: u32,
    #[serde(default)]
    pub clip_slot: u32,
}

pub(crate) fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("midiclip")
        .join("config.toml")
}

/// Missing or unreadable config falls back to defaults
pub(crate) fn load_config(path: Option<&Path>) -> CliConfig {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    let Ok(text) = std::fs::read_to_string(&path) else {
        return CliConfig::default();
    };
    parse_config(&text).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
        CliConfig::default()
    })
}

pub(crate) fn parse_config(text: &str) -> Result<CliConfig, toml::de::Error> {
    toml::from_str(text)
}
