//! Pipeline configuration and TOML loading.

use crate::alpha::AlphaOptions;
use crate::encode::EncodeOptions;
use crate::error::{ImageError, Result};
use crate::orientation::OrientationOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file names searched in the working directory.
const CONFIG_CANDIDATES: [&str; 3] = ["packshot.toml", ".packshot.toml", ".config/packshot.toml"];

/// Every tunable of the pipeline.
///
/// ```toml
/// [alpha]
/// low_threshold = 10
/// cutoff = 128
/// erosion_radius = 1
///
/// [orientation]
/// rotate_clockwise = true
///
/// [encode]
/// start_quality = 88
/// min_quality = 60
/// step = 4
/// effort = 6
/// cap_to_input_size = true
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Alpha cleanup
    pub alpha: AlphaOptions,
    /// Orientation normalization
    pub orientation: OrientationOptions,
    /// WebP encoding and quality search
    pub encode: EncodeOptions,
}

impl PipelineConfig {
    /// Load from `path`, or from the first config file found, or use defaults.
    pub fn load(path: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let config_path = path.map(Path::to_path_buf).or_else(find_config_file);

        let config = match config_path {
            Some(ref p) => load_config_file(p)?,
            None => Self::default(),
        };
        config.validate()?;

        Ok((config, config_path))
    }

    /// Parse TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ImageError::Config(e.to_string()))
    }

    /// Check option ranges.
    pub fn validate(&self) -> Result<()> {
        self.encode.validate()
    }
}

fn find_config_file() -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

fn load_config_file(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ImageError::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    toml::from_str(&content).map_err(|e| {
        ImageError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}
