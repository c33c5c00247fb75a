/// Application settings
///
/// Read once at startup from the JSON file named by `QENS_ROI_CONFIG`, or
/// from `qens_roi.json` in the working directory. Missing keys take their
/// defaults; a missing or malformed file means all defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_ENV: &str = "QENS_ROI_CONFIG";
pub const CONFIG_FILE: &str = "qens_roi.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// File name offered by the export dialog
    pub export_file_name: String,
    /// Decimals of every numeric cell in the exported table
    pub export_precision: usize,
    /// Decimals of the E_min/E_max fields
    pub bound_precision: usize,
    /// Decimals of the area fields
    pub area_precision: usize,
    /// Energy range (meV) shown when a spectrum is first plotted
    pub initial_x_range: (f64, f64),
    pub window_size: (f32, f32),
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            export_file_name: "dict_areas.csv".to_string(),
            export_precision: 4,
            bound_precision: 2,
            area_precision: 4,
            initial_x_range: (-6.0, 6.0),
            window_size: (1400.0, 900.0),
        }
    }
}

impl AppSettings {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Where settings are looked for, if anywhere
    pub fn locate() -> Option<PathBuf> {
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(p));
        }
        let local = PathBuf::from(CONFIG_FILE);
        local.exists().then_some(local)
    }

    /// Settings for this run; never fails
    pub fn load() -> Self {
        let Some(path) = Self::locate() else {
            return Self::default();
        };
        match Self::from_file(&path) {
            Ok(settings) => {
                log::info!("Settings loaded from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Ignoring settings in {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
