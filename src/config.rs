use std::fs;
use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::cache::Cache;
use crate::camera::CameraConfig;
use crate::error::Error;
use crate::pitch::CalibrationConfig;
use crate::possession::PossessionConfig;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct CacheConfig {
    pub camera_movement: Option<Cache>,
    /// Raw tracking results; used by callers wrapping their tracker.
    pub tracks: Option<Cache>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub camera: CameraConfig,
    pub calibration: CalibrationConfig,
    pub possession: PossessionConfig,
    pub cache: CacheConfig,
}

impl PipelineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        Ok(toml::from_str(s)?)
    }
}
