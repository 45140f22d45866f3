//! Configuration loading and management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Protocol used when none is named
    #[serde(default = "default_protocol")]
    pub default_protocol: String,

    /// Directory searched for protocol definition files
    #[serde(default = "default_protocols_dir")]
    pub protocols_dir: PathBuf,

    /// Directory holding workflow run state
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Coordination hub settings
    #[serde(default)]
    pub hq: HqConfig,
}

fn default_protocol() -> String {
    "standard".to_string()
}

fn default_protocols_dir() -> PathBuf {
    PathBuf::from(".porch/protocols")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".porch")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_protocol: default_protocol(),
            protocols_dir: default_protocols_dir(),
            state_dir: default_state_dir(),
            hq: HqConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file or default locations
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(PathBuf::from).or_else(|| {
            // Try .porch/config.toml in current directory
            let local = PathBuf::from(".porch/config.toml");
            if local.exists() {
                return Some(local);
            }

            // Try ~/.porch/config.toml
            dirs::home_dir().map(|h| h.join(".porch/config.toml"))
        });

        match config_path {
            Some(p) if p.exists() => {
                let content = std::fs::read_to_string(&p)?;
                Self::parse(&content)
            }
            Some(p) if path.is_some() => Err(Error::Config(format!(
                "Config file not found: {}",
                p.display()
            ))),
            _ => Ok(Config::default()),
        }
    }

    /// Parse configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Protocol directory with `~` and environment variables expanded
    pub fn protocols_dir(&self) -> PathBuf {
        expand(&self.protocols_dir)
    }

    /// State directory with `~` and environment variables expanded
    pub fn state_dir(&self) -> PathBuf {
        expand(&self.state_dir)
    }
}

fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}

/// Coordination hub configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HqConfig {
    /// Hub URL, if this instance reports to one
    #[serde(default)]
    pub url: Option<String>,

    /// Name this instance registers under
    #[serde(default)]
    pub instance_name: Option<String>,

    /// Heartbeat ping interval
    #[serde(default = "default_heartbeat", with = "humantime_serde")]
    pub heartbeat: Duration,
}

fn default_heartbeat() -> Duration {
    Duration::from_secs(30)
}

impl Default for HqConfig {
    fn default() -> Self {
        Self {
            url: None,
            instance_name: None,
            heartbeat: default_heartbeat(),
        }
    }
}

// Custom serde module for Duration using humantime
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

/// Initialize the .porch directory with a default config
pub fn init(base: &Path) -> Result<PathBuf> {
    let protocols = base.join("protocols");
    if !protocols.exists() {
        std::fs::create_dir_all(&protocols)?;
    }

    let config_path = base.join("config.toml");
    if !config_path.exists() {
        let config_str = toml::to_string_pretty(&Config::default())
            .map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(&config_path, config_str)?;
    }

    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = Config::parse(
            r#"
default_protocol = "tick"
protocols_dir = "protocols"

[hq]
url = "wss://hq.example.com/ws"
heartbeat = "1m 30s"
"#,
        )
        .unwrap();

        assert_eq!(config.default_protocol, "tick");
        assert_eq!(config.protocols_dir, PathBuf::from("protocols"));
        assert_eq!(config.state_dir, PathBuf::from(".porch"));
        assert_eq!(config.hq.url.as_deref(), Some("wss://hq.example.com/ws"));
        assert_eq!(config.hq.heartbeat, Duration::from_secs(90));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_bad_heartbeat() {
        let err = Config::parse("[hq]\nheartbeat = \"soon\"\n").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Config::load(Some(&missing)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = init(&dir.path().join(".porch")).unwrap();
        assert!(dir.path().join(".porch/protocols").is_dir());

        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_home_expansion() {
        let config = Config {
            protocols_dir: PathBuf::from("~/protocols"),
            ..Default::default()
        };
        if let Some(home) = dirs::home_dir() {
            assert_eq!(config.protocols_dir(), home.join("protocols"));
        }
    }
}
