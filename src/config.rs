// src/config.rs - Run configuration loaded from TOML

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::errors::{MliError, Result};
use crate::validation::{RawAnalysisConfig, RawValue};

/// Configuration for a measurement run
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Analysis parameters as entered by the operator
    #[serde(default)]
    pub analysis: RawAnalysisConfig,

    #[serde(default)]
    pub tissue_polarity: TissuePolarity,

    #[serde(default = "default_parallel")]
    pub use_parallel: bool,

    #[serde(default = "default_results_path")]
    pub results_path: String,

    /// Directory for overlay PNGs; overlays are not written when unset
    #[serde(default)]
    pub overlay_dir: Option<String>,
}

/// Which Otsu class is treated as tissue
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TissuePolarity {
    /// Stained tissue darker than the airspace
    #[default]
    Dark,
    /// Tissue brighter than the airspace (inverted or fluorescence images)
    Bright,
}

fn default_parallel() -> bool {
    true
}

fn default_results_path() -> String {
    "./results/state.json".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            analysis: RawAnalysisConfig {
                scale_um_per_pixel: Some(RawValue::Number(0.5)),
                line_length_um_horizontal: Some(RawValue::Number(432.0)),
                line_length_um_vertical: Some(RawValue::Number(432.0)),
                n_lines_horizontal: Some(RawValue::Number(5.0)),
                n_lines_vertical: Some(RawValue::Number(5.0)),
                sigma_denoise: Some(RawValue::Number(1.0)),
                min_area: Some(RawValue::Number(450.0)),
                magnification: Some("20x".to_string()),
            },
            tissue_polarity: TissuePolarity::Dark,
            use_parallel: true,
            results_path: default_results_path(),
            overlay_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            MliError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|source| MliError::ConfigLoad {
            source,
            path: path.to_path_buf(),
        })
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MliError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)?;

        Ok(())
    }
}
