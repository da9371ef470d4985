use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use overlay_regions::remote::DEFAULT_CHANNEL;
use overlay_runtime::DEFAULT_BUILD_COOLDOWN_MS;
use overlay_spawn::MAX_QUERY_RADIUS;
use serde::Deserialize;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OverlayConfig {
    pub render: Render,
    pub spawnable: Spawnable,
    pub world_spawn: WorldSpawn,
    pub structures: Structures,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Render {
    pub async_building: bool,
    pub build_cooldown_ms: u64,
}

impl Default for Render {
    fn default() -> Self {
        Self {
            async_building: true,
            build_cooldown_ms: DEFAULT_BUILD_COOLDOWN_MS,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Spawnable {
    pub enabled: bool,
    /// Radius in chunks around the viewer.
    pub render_distance: u32,
    pub max_block_light: u8,
}

impl Default for Spawnable {
    fn default() -> Self {
        Self {
            enabled: true,
            render_distance: 1,
            max_block_light: 0,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorldSpawn {
    /// Height the spawn area outline is drawn at.
    pub max_y: i32,
}

impl Default for WorldSpawn {
    fn default() -> Self {
        Self { max_y: 64 }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Structures {
    pub channel: String,
}

impl Default for Structures {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "could not read config: {}", e),
            ConfigError::Parse(e) => write!(f, "could not parse config: {}", e),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl OverlayConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: OverlayConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.spawnable.max_block_light > 15 {
            return Err(ConfigError::Invalid(format!(
                "spawnable.max_block_light must be 0..=15, got {}",
                self.spawnable.max_block_light
            )));
        }
        if self.spawnable.render_distance > MAX_QUERY_RADIUS {
            return Err(ConfigError::Invalid(format!(
                "spawnable.render_distance must be at most {}, got {}",
                MAX_QUERY_RADIUS, self.spawnable.render_distance
            )));
        }
        if self.structures.channel.is_empty() {
            return Err(ConfigError::Invalid("structures.channel is empty".into()));
        }
        Ok(())
    }
}

pub fn load_config_from_path(path: &Path) -> Result<OverlayConfig, ConfigError> {
    let s = fs::read_to_string(path)?;
    OverlayConfig::from_toml_str(&s)
}
