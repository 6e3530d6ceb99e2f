//! Shared configuration for sketchmesh
//!
//! This crate is the single source of truth for canvas defaults, the remote
//! service endpoints and the cadence of the synthetic progress reporting.
//! Values come from an optional TOML file and are then overridden by
//! environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default canvas width in pixels
pub const DEFAULT_WIDTH: u32 = 1024;

/// Default canvas height in pixels
pub const DEFAULT_HEIGHT: u32 = 768;

/// Default line width for the brush
pub const DEFAULT_LINE_WIDTH: f32 = 5.0;

/// Padding around the drawing when exporting for enhancement
pub const DEFAULT_EXPORT_PADDING: u32 = 10;

/// Default bound on the number of undo snapshots
pub const DEFAULT_HISTORY_CAPACITY: usize = 64;

/// Default enhance endpoint
pub const DEFAULT_ENHANCE_URL: &str = "http://localhost:8000/generate-image";

/// Default mesh endpoint
pub const DEFAULT_MESH_URL: &str = "http://localhost:8000/generate-model";

/// Environment variable overriding [`ServiceConfig::enhance_url`]
pub const ENV_ENHANCE_URL: &str = "SKETCHMESH_ENHANCE_URL";

/// Environment variable overriding [`ServiceConfig::mesh_url`]
pub const ENV_MESH_URL: &str = "SKETCHMESH_MESH_URL";

/// Environment variable overriding [`CanvasConfig::history_capacity`]
pub const ENV_HISTORY_CAPACITY: &str = "SKETCHMESH_HISTORY_CAPACITY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Canvas and toolbar defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Background color as `#rrggbb`
    pub background: String,
    /// Initial stroke color as `#rrggbb`
    pub stroke_color: String,
    /// Initial brush width in pixels
    pub line_width: f32,
    /// Padding added around the autocropped export
    pub export_padding: u32,
    /// Maximum undo snapshots kept; `None` keeps every snapshot
    pub history_capacity: Option<usize>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            background: "#ffffff".to_string(),
            stroke_color: "#000000".to_string(),
            line_width: DEFAULT_LINE_WIDTH,
            export_padding: DEFAULT_EXPORT_PADDING,
            history_capacity: Some(DEFAULT_HISTORY_CAPACITY),
        }
    }
}

/// Remote service endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Endpoint that turns a sketch into a rendered image
    pub enhance_url: String,
    /// Endpoint that turns a rendered image into a mesh
    pub mesh_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            enhance_url: DEFAULT_ENHANCE_URL.to_string(),
            mesh_url: DEFAULT_MESH_URL.to_string(),
            request_timeout_secs: 300,
        }
    }
}

/// Synthetic progress cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Tick interval while the enhance call is in flight
    pub enhance_tick_ms: u64,
    /// Tick interval while the mesh call is in flight
    pub mesh_tick_ms: u64,
    /// Exclusive upper bound of the per-tick increment
    pub max_step: u32,
    /// Progress never passes this value until the response arrives
    pub cap: u32,
    /// Fixed seed for the increments (tests, reproducible demos)
    pub seed: Option<u64>,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enhance_tick_ms: 500,
            mesh_tick_ms: 800,
            max_step: 10,
            cap: 95,
            seed: None,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub canvas: CanvasConfig,
    pub services: ServiceConfig,
    pub progress: ProgressConfig,
}

impl AppConfig {
    /// Parse a config from TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config file (if any), then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                debug!("Loaded config from {}", path.display());
                toml::from_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in `load`)
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup(ENV_ENHANCE_URL) {
            debug!("{} overrides enhance url", ENV_ENHANCE_URL);
            self.services.enhance_url = url;
        }
        if let Some(url) = lookup(ENV_MESH_URL) {
            debug!("{} overrides mesh url", ENV_MESH_URL);
            self.services.mesh_url = url;
        }
        if let Some(value) = lookup(ENV_HISTORY_CAPACITY) {
            self.canvas.history_capacity = parse_capacity(&value)?;
        }
        Ok(())
    }

    /// Reject values the rest of the system cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(ConfigError::Invalid {
                field: "canvas.width/height",
                reason: format!("{}x{} is empty", self.canvas.width, self.canvas.height),
            });
        }
        if !(1.0..=100.0).contains(&self.canvas.line_width) {
            return Err(ConfigError::Invalid {
                field: "canvas.line_width",
                reason: format!("{} is outside 1..=100", self.canvas.line_width),
            });
        }
        if self.progress.cap >= 100 {
            return Err(ConfigError::Invalid {
                field: "progress.cap",
                reason: format!("{} must stay below 100", self.progress.cap),
            });
        }
        if self.progress.max_step == 0 || self.progress.max_step > 100 {
            return Err(ConfigError::Invalid {
                field: "progress.max_step",
                reason: format!("{} is outside 1..=100", self.progress.max_step),
            });
        }
        if self.progress.enhance_tick_ms == 0 || self.progress.mesh_tick_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "progress.*_tick_ms",
                reason: "tick interval must be non-zero".to_string(),
            });
        }
        for (field, url) in [
            ("services.enhance_url", &self.services.enhance_url),
            ("services.mesh_url", &self.services.mesh_url),
        ] {
            if url.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "url is empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn parse_capacity(value: &str) -> Result<Option<usize>, ConfigError> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("unbounded") {
        return Ok(None);
    }
    match value.parse::<usize>() {
        Ok(0) => Ok(None),
        Ok(n) => Ok(Some(n)),
        Err(e) => Err(ConfigError::Invalid {
            field: "canvas.history_capacity",
            reason: format!("{value:?}: {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.canvas.width, DEFAULT_WIDTH);
        assert_eq!(config.canvas.height, DEFAULT_HEIGHT);
        assert_eq!(config.canvas.history_capacity, Some(DEFAULT_HISTORY_CAPACITY));
        assert_eq!(config.services.enhance_url, DEFAULT_ENHANCE_URL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [canvas]
            width = 640
            height = 480

            [progress]
            seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.canvas.width, 640);
        assert_eq!(config.canvas.background, "#ffffff");
        assert_eq!(config.progress.seed, Some(7));
        assert_eq!(config.progress.cap, 95);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AppConfig::from_toml("[canvas]\nwidth = 0").is_err());
        assert!(AppConfig::from_toml("[canvas]\nline_width = 150.0").is_err());
        assert!(AppConfig::from_toml("[progress]\ncap = 100").is_err());
        assert!(AppConfig::from_toml("[services]\nmesh_url = \"  \"").is_err());
    }

    #[test]
    fn test_max_step_bounds() {
        assert!(AppConfig::from_toml("[progress]\nmax_step = 100").is_ok());
        let err = AppConfig::from_toml("[progress]\nmax_step = 4294967295").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "progress.max_step",
                ..
            }
        ));
        assert!(AppConfig::from_toml("[progress]\nmax_step = 0").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| match key {
                ENV_ENHANCE_URL => Some("http://gpu:9000/enhance".to_string()),
                ENV_HISTORY_CAPACITY => Some("unbounded".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.services.enhance_url, "http://gpu:9000/enhance");
        assert_eq!(config.services.mesh_url, DEFAULT_MESH_URL);
        assert_eq!(config.canvas.history_capacity, None);

        config
            .apply_overrides(|key| (key == ENV_HISTORY_CAPACITY).then(|| "12".to_string()))
            .unwrap();
        assert_eq!(config.canvas.history_capacity, Some(12));

        let err = config.apply_overrides(|key| (key == ENV_HISTORY_CAPACITY).then(|| "lots".to_string()));
        assert!(err.is_err());
    }
}
