//! Wave-burst settings.
//!
//! Settings load from YAML; any field left out takes its default.
//!
//! ```yaml
//! ensembles_in_burst: 1024
//! output_dir: /data/waves
//! selected_bins: [3, 4, -1]
//! height_source: beam2_range_tracking
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{Result, WaveError};

/// Most bins a burst record can carry.
pub const MAX_SELECTED_BINS: usize = 3;

/// Where the wave height of each ensemble comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawHeightSource", rename_all = "snake_case")]
pub enum HeightSource {
    /// Vertical-beam range, or the mean range tracking on four-beam ensembles.
    #[default]
    VerticalBeamRange,
    Beam0RangeTracking,
    Beam1RangeTracking,
    Beam2RangeTracking,
    Beam3RangeTracking,
    /// Transducer depth plus the pressure offset.
    Pressure,
}

impl HeightSource {
    /// Numeric code used by instrument configuration files.
    pub fn code(self) -> u8 {
        match self {
            HeightSource::Beam0RangeTracking => 0,
            HeightSource::Beam1RangeTracking => 1,
            HeightSource::Beam2RangeTracking => 2,
            HeightSource::Beam3RangeTracking => 3,
            HeightSource::VerticalBeamRange => 4,
            HeightSource::Pressure => 5,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(HeightSource::Beam0RangeTracking),
            1 => Some(HeightSource::Beam1RangeTracking),
            2 => Some(HeightSource::Beam2RangeTracking),
            3 => Some(HeightSource::Beam3RangeTracking),
            4 => Some(HeightSource::VerticalBeamRange),
            5 => Some(HeightSource::Pressure),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "vertical_beam_range" | "vertical" => Some(HeightSource::VerticalBeamRange),
            "beam0_range_tracking" => Some(HeightSource::Beam0RangeTracking),
            "beam1_range_tracking" => Some(HeightSource::Beam1RangeTracking),
            "beam2_range_tracking" => Some(HeightSource::Beam2RangeTracking),
            "beam3_range_tracking" => Some(HeightSource::Beam3RangeTracking),
            "pressure" => Some(HeightSource::Pressure),
            _ => None,
        }
    }

    /// Beam index for the per-beam range sources.
    pub fn beam(self) -> Option<usize> {
        match self {
            HeightSource::Beam0RangeTracking => Some(0),
            HeightSource::Beam1RangeTracking => Some(1),
            HeightSource::Beam2RangeTracking => Some(2),
            HeightSource::Beam3RangeTracking => Some(3),
            HeightSource::VerticalBeamRange | HeightSource::Pressure => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawHeightSource {
    Code(u8),
    Name(String),
}

impl TryFrom<RawHeightSource> for HeightSource {
    type Error = String;

    fn try_from(raw: RawHeightSource) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawHeightSource::Code(code) => HeightSource::from_code(code)
                .ok_or_else(|| format!("unknown height source code {}", code)),
            RawHeightSource::Name(name) => HeightSource::from_name(&name)
                .ok_or_else(|| format!("unknown height source '{}'", name)),
        }
    }
}

/// Everything the codec needs to aggregate and write bursts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveSettings {
    /// Ensembles per burst (N).
    pub ensembles_in_burst: usize,
    /// Defaults to the home directory.
    pub output_dir: PathBuf,
    /// Used when the burst carries no WavesInfo dataset.
    pub latitude: f64,
    pub longitude: f64,
    /// Bin indices to extract; negative entries are unselected.
    pub selected_bins: Vec<i32>,
    pub pressure_sensor_depth: f32,
    pub height_source: HeightSource,
    /// Velocities with a correlation below this are marked bad.
    pub correlation_threshold: f32,
    /// Added to the transducer depth to form the pressure.
    pub pressure_offset: f32,
}

impl Default for WaveSettings {
    fn default() -> Self {
        Self {
            ensembles_in_burst: 2048,
            output_dir: dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")),
            latitude: 0.0,
            longitude: 0.0,
            selected_bins: vec![1, 3, 5],
            pressure_sensor_depth: 0.0,
            height_source: HeightSource::default(),
            correlation_threshold: 0.25,
            pressure_offset: 0.0,
        }
    }
}

/// Per-ensemble derivation inputs, split off the settings so the record
/// encoder does not need the whole configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivationParams {
    pub selected_bins: Vec<usize>,
    pub height_source: HeightSource,
    pub correlation_threshold: f32,
    pub pressure_offset: f32,
}

impl WaveSettings {
    /// Parse and validate settings from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: WaveSettings = serde_yaml_ng::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate a settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| WaveError::file_error(path.to_path_buf(), e))?;
        debug!("Loaded settings from {} ({} bytes)", path.display(), yaml.len());
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ensembles_in_burst == 0 {
            return Err(WaveError::configuration("ensembles_in_burst must be greater than zero"));
        }
        if self.selected_bins.len() > MAX_SELECTED_BINS {
            return Err(WaveError::configuration(format!(
                "at most {} selected bins are supported, got {}",
                MAX_SELECTED_BINS,
                self.selected_bins.len()
            )));
        }
        if !(0.0..=1.0).contains(&self.correlation_threshold) {
            return Err(WaveError::configuration(format!(
                "correlation_threshold {} is outside 0..=1",
                self.correlation_threshold
            )));
        }
        if !self.latitude.is_finite()
            || !self.longitude.is_finite()
            || !self.pressure_offset.is_finite()
            || !self.pressure_sensor_depth.is_finite()
        {
            return Err(WaveError::configuration("position and depth values must be finite"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(WaveError::configuration("output_dir is empty"));
        }
        Ok(())
    }

    /// Selected bins in configured order, unselected entries removed.
    pub fn selected_bins(&self) -> Vec<usize> {
        self.selected_bins.iter().filter_map(|&b| usize::try_from(b).ok()).collect()
    }

    pub fn derivation_params(&self) -> DerivationParams {
        DerivationParams {
            selected_bins: self.selected_bins(),
            height_source: self.height_source,
            correlation_threshold: self.correlation_threshold,
            pressure_offset: self.pressure_offset,
        }
    }
}
