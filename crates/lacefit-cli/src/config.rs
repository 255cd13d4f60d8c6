use lacefit_core::{FrameGate, GuidelineCalculator};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Runtime configuration: defaults, then an optional TOML file, then
/// `LACEFIT_*` environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum spacing between derivations, in milliseconds.
    pub throttle_ms: u64,
    /// Upward hairline shift from the brow row (normalized height).
    pub forehead_offset_ratio: f64,
    /// Lowest hairline row (normalized).
    pub min_hairline_y: f64,
    /// Millimeters per point (1/1000 normalized unit).
    pub mm_per_point: f64,
    /// Tilt beyond which a rotation instruction is given.
    pub tilt_tolerance_deg: f64,
    /// Offset below which the lace is too tight.
    pub min_offset_mm: f64,
    /// Default overlay render size.
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for Config {
    fn default() -> Self {
        let calc = GuidelineCalculator::default();
        Self {
            throttle_ms: 80,
            forehead_offset_ratio: calc.forehead_offset_ratio,
            min_hairline_y: calc.min_hairline_y,
            mm_per_point: calc.millimeters_per_point,
            tilt_tolerance_deg: calc.tilt_tolerance_degrees,
            min_offset_mm: calc.min_forehead_offset_mm,
            frame_width: 640,
            frame_height: 480,
        }
    }
}

impl Config {
    /// Load from `path` (or `LACEFIT_CONFIG` when no path is given), then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("LACEFIT_CONFIG").ok().map(PathBuf::from));

        let mut config = match file {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "config file loaded");
        Ok(config)
    }

    /// Override fields from `LACEFIT_*` variables. Unparseable values are
    /// ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        override_with(&lookup, "LACEFIT_THROTTLE_MS", &mut self.throttle_ms);
        override_with(&lookup, "LACEFIT_FOREHEAD_OFFSET_RATIO", &mut self.forehead_offset_ratio);
        override_with(&lookup, "LACEFIT_MIN_HAIRLINE_Y", &mut self.min_hairline_y);
        override_with(&lookup, "LACEFIT_MM_PER_POINT", &mut self.mm_per_point);
        override_with(&lookup, "LACEFIT_TILT_TOLERANCE_DEG", &mut self.tilt_tolerance_deg);
        override_with(&lookup, "LACEFIT_MIN_OFFSET_MM", &mut self.min_offset_mm);
        override_with(&lookup, "LACEFIT_FRAME_WIDTH", &mut self.frame_width);
        override_with(&lookup, "LACEFIT_FRAME_HEIGHT", &mut self.frame_height);
    }

    pub fn calculator(&self) -> GuidelineCalculator {
        GuidelineCalculator {
            forehead_offset_ratio: self.forehead_offset_ratio,
            min_hairline_y: self.min_hairline_y,
            millimeters_per_point: self.mm_per_point,
            tilt_tolerance_degrees: self.tilt_tolerance_deg,
            min_forehead_offset_mm: self.min_offset_mm,
        }
    }

    pub fn frame_gate(&self) -> FrameGate {
        FrameGate::new(Duration::from_millis(self.throttle_ms))
    }
}

fn override_with<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    field: &mut T,
) {
    let Some(raw) = lookup(key) else {
        return;
    };
    match raw.trim().parse() {
        Ok(v) => *field = v,
        Err(_) => tracing::warn!(key, value = %raw, "ignoring unparseable override"),
    }
}
