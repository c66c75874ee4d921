use rps_core::Kind;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

// --- Error Type ---

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON config: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("invalid TOML config: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

// --- Enums for Choices ---

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SerializerType {
    Json,
    Binary,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    Stdio,
    WebSocket,
}

// --- Configuration Sections ---

#[derive(Deserialize, Debug, Clone)]
pub struct WorldSettings {
    pub width: f32,
    pub height: f32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        WorldSettings {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// One spawn cluster: `count` individuals of `kind` scattered around `center`.
#[derive(Deserialize, Debug, Clone)]
pub struct ClusterConfig {
    pub kind: Kind,
    pub center: (f32, f32),
    #[serde(default = "default_cluster_count")]
    pub count: u32,
}

fn default_cluster_count() -> u32 {
    50
}

/// Asset paths the viewer loads for each kind. The simulation only ships
/// these strings; image loading happens viewer-side, lazily.
#[derive(Deserialize, Debug, Clone)]
pub struct SpriteConfig {
    #[serde(default = "default_rock_sprite")]
    pub rock: String,
    #[serde(default = "default_paper_sprite")]
    pub paper: String,
    #[serde(default = "default_scissor_sprite")]
    pub scissor: String,
}

fn default_rock_sprite() -> String {
    "rock.png".to_string()
}
fn default_paper_sprite() -> String {
    "paper.png".to_string()
}
fn default_scissor_sprite() -> String {
    "scissor.png".to_string()
}

impl Default for SpriteConfig {
    fn default() -> Self {
        SpriteConfig {
            rock: default_rock_sprite(),
            paper: default_paper_sprite(),
            scissor: default_scissor_sprite(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct WebSocketOptions {
    #[serde(default = "default_ws_host")]
    pub host: String,
    #[serde(default = "default_ws_port")]
    pub port: u16,
}

fn default_ws_host() -> String {
    "127.0.0.1".to_string()
}
fn default_ws_port() -> u16 {
    8080
}

impl Default for WebSocketOptions {
    fn default() -> Self {
        WebSocketOptions {
            host: default_ws_host(),
            port: default_ws_port(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct TransportConfig {
    #[serde(default = "default_serializer")]
    pub serializer: SerializerType,
    #[serde(default = "default_sender")]
    pub sender: SenderType,
    #[serde(default)]
    pub websocket: WebSocketOptions,
}

fn default_serializer() -> SerializerType {
    SerializerType::Json
}
fn default_sender() -> SenderType {
    SenderType::Stdio
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            serializer: default_serializer(),
            sender: default_sender(),
            websocket: WebSocketOptions::default(),
        }
    }
}

// --- Top-Level Config Struct ---

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Display refresh rate the frame loop paces to.
    pub framerate: u32,
    pub world: WorldSettings,
    /// Side length of every bounding square.
    pub entity_size: f32,
    /// Per-frame movement magnitude, identical for all individuals.
    pub speed: f32,
    pub clusters: Vec<ClusterConfig>,
    /// Half-width of the uniform spawn offset around each cluster center.
    pub spawn_range: f32,
    pub sprites: SpriteConfig,
    pub transport: TransportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            framerate: 60,
            world: WorldSettings::default(),
            entity_size: 16.0,
            speed: 0.4,
            clusters: vec![
                ClusterConfig {
                    kind: Kind::Rock,
                    center: (200.0, 200.0),
                    count: default_cluster_count(),
                },
                ClusterConfig {
                    kind: Kind::Paper,
                    center: (400.0, 200.0),
                    count: default_cluster_count(),
                },
                ClusterConfig {
                    kind: Kind::Scissor,
                    center: (300.0, 400.0),
                    count: default_cluster_count(),
                },
            ],
            spawn_range: 150.0,
            sprites: SpriteConfig::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    /// Total population size across all clusters. Fixed for the whole run.
    pub fn population_size(&self) -> usize {
        self.clusters.iter().map(|c| c.count as usize).sum()
    }
}

// --- Loading ---

/// Loads a config from JSON or TOML, picked by file extension, and
/// validates it.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: Config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.framerate == 0 {
        return Err(ConfigError::Validation("framerate cannot be zero".to_string()));
    }
    if config.world.width <= 0.0 || config.world.height <= 0.0 {
        return Err(ConfigError::Validation(
            "world dimensions must be positive".to_string(),
        ));
    }
    if config.entity_size <= 0.0 {
        return Err(ConfigError::Validation(
            "entity_size must be positive".to_string(),
        ));
    }
    if config.speed <= 0.0 {
        return Err(ConfigError::Validation("speed must be positive".to_string()));
    }
    if config.spawn_range < 0.0 {
        return Err(ConfigError::Validation(
            "spawn_range cannot be negative".to_string(),
        ));
    }
    if config.clusters.is_empty() {
        return Err(ConfigError::Validation(
            "at least one spawn cluster is required".to_string(),
        ));
    }
    if config.population_size() == 0 {
        return Err(ConfigError::Validation(
            "total population cannot be zero".to_string(),
        ));
    }
    Ok(())
}
