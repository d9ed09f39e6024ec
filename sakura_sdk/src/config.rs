use std::fs;
use std::path::{Path, PathBuf};

use sakura_reload::ReloadConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE: &str = "sakura.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    ParseToml(#[from] toml::de::Error),

    #[error("invalid field `{0}`: {1}")]
    InvalidField(&'static str, String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `env_logger` filter used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub reload: ReloadConfig,
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// `sakura.toml` under `root`, or defaults when the file is missing.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE);
        match fs::read_to_string(&path) {
            Ok(contents) => parse_bridge_toml(&contents),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }
}

pub fn parse_bridge_toml(contents: &str) -> Result<BridgeConfig, ConfigError> {
    let config: BridgeConfig = toml::from_str(contents)?;
    if config.logging.filter.trim().is_empty() {
        return Err(ConfigError::InvalidField(
            "logging.filter",
            "must not be empty".to_string(),
        ));
    }
    if config.reload.capable_builds.iter().any(|b| b.trim().is_empty()) {
        return Err(ConfigError::InvalidField(
            "reload.capable_builds",
            "build names must not be empty".to_string(),
        ));
    }
    Ok(config)
}

pub fn default_bridge_toml() -> String {
    r#"[reload]
enabled = true
pending_policy = "block"
capable_builds = ["sakura"]

[logging]
filter = "warn"
"#
    .to_string()
}

/// Write the default config next to the project if there is none yet.
pub fn ensure_bridge_toml(root: &Path) -> Result<(), ConfigError> {
    let path = root.join(CONFIG_FILE);
    if path.exists() {
        return Ok(());
    }
    fs::write(&path, default_bridge_toml()).map_err(|source| ConfigError::Io { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sakura_reload::PendingPolicy;

    #[test]
    fn default_toml_matches_defaults() {
        let parsed = parse_bridge_toml(&default_bridge_toml()).unwrap();
        assert_eq!(parsed, BridgeConfig::default());
    }

    #[test]
    fn partial_tables_fall_back_to_defaults() {
        let parsed = parse_bridge_toml(
            r#"[reload]
pending_policy = "continue"
"#,
        )
        .unwrap();
        assert!(parsed.reload.enabled);
        assert_eq!(parsed.reload.pending_policy, PendingPolicy::Continue);
        assert_eq!(parsed.reload.capable_builds, ["sakura"]);
        assert_eq!(parsed.logging.filter, "warn");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            parse_bridge_toml("[reload]\npending_policy = \"later\"\n"),
            Err(ConfigError::ParseToml(_))
        ));
        assert!(matches!(
            parse_bridge_toml("[logging]\nfilter = \"  \"\n"),
            Err(ConfigError::InvalidField("logging.filter", _))
        ));
        assert!(matches!(
            parse_bridge_toml("[reload]\ncapable_builds = [\"\"]\n"),
            Err(ConfigError::InvalidField("reload.capable_builds", _))
        ));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(BridgeConfig::load(dir.path()).unwrap(), BridgeConfig::default());

        fs::write(
            dir.path().join(CONFIG_FILE),
            "[reload]\nenabled = false\n[logging]\nfilter = \"debug\"\n",
        )
        .unwrap();
        let loaded = BridgeConfig::load(dir.path()).unwrap();
        assert!(!loaded.reload.enabled);
        assert_eq!(loaded.logging.filter, "debug");

        let fresh = tempfile::tempdir().unwrap();
        ensure_bridge_toml(fresh.path()).unwrap();
        assert_eq!(BridgeConfig::load(fresh.path()).unwrap(), BridgeConfig::default());
    }
}
