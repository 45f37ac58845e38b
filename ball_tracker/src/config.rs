use crate::core_modules::color_segmenter::ColorRange;
use crate::core_modules::hsv_pixel::HUE_STEPS;
use crate::core_modules::mask_refiner::{DEFAULT_KERNEL_SIZE, MAX_KERNEL_SIZE};
use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_MIN_RADIUS: f64 = 10.0;
const DEFAULT_RECORD_INTERVAL_SECS: f64 = 0.01;
const DEFAULT_FRAME_TIMEOUT_MS: u64 = 5000;
const DEFAULT_OUTPUT_DIR: &str = ".";
const DEFAULT_OUTPUT_PREFIX: &str = "ball_coordinates";

/// Environment variable naming a TOML config file.
pub const CONFIG_ENV_VAR: &str = "BALL_TRACKER_CONFIG";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TrackerConfigFile {
    color: Option<ColorConfigFile>,
    morph_kernel_size: Option<u32>,
    min_radius: Option<f64>,
    record_interval_secs: Option<f64>,
    frame_timeout_ms: Option<u64>,
    output: Option<OutputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ColorConfigFile {
    lower: Option<[u8; 3]>,
    upper: Option<[u8; 3]>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct OutputConfigFile {
    dir: Option<PathBuf>,
    prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    /// Directory the timestamped CSV log is created in.
    pub dir: PathBuf,
    /// File name prefix; the session timestamp is appended.
    pub prefix: String,
}

/// Tunables for one tracking session.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Inclusive HSV box of the target colour.
    pub color: ColorRange,
    /// Side of the square structuring element used by the mask refiner.
    pub morph_kernel_size: u32,
    /// Detections with radius at or below this are ignored.
    pub min_radius: f64,
    /// Minimum seconds between two recorded samples.
    pub record_interval: f64,
    /// Longest wait for a single frame before the session fails.
    pub frame_timeout: Duration,
    pub output: OutputSettings,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::from_file(TrackerConfigFile::default())
    }
}

impl TrackerConfig {
    /// Defaults, overlaid by the file at `path` (or at `$BALL_TRACKER_CONFIG`
    /// when `path` is `None`), then validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        let cfg = match path.or(env_path.as_deref()) {
            Some(path) => Self::from_toml_str(&read_config_file(path)?)?,
            None => Self::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parses a TOML document; keys it omits keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: TrackerConfigFile = toml::from_str(text)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: TrackerConfigFile) -> Self {
        let defaults = ColorRange::default();
        let color = file.color.unwrap_or_default();
        let output = file.output.unwrap_or_default();
        Self {
            color: ColorRange::new(
                color.lower.unwrap_or(defaults.lower),
                color.upper.unwrap_or(defaults.upper),
            ),
            morph_kernel_size: file.morph_kernel_size.unwrap_or(DEFAULT_KERNEL_SIZE),
            min_radius: file.min_radius.unwrap_or(DEFAULT_MIN_RADIUS),
            record_interval: file.record_interval_secs.unwrap_or(DEFAULT_RECORD_INTERVAL_SECS),
            frame_timeout: Duration::from_millis(file.frame_timeout_ms.unwrap_or(DEFAULT_FRAME_TIMEOUT_MS)),
            output: OutputSettings {
                dir: output.dir.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
                prefix: output.prefix.unwrap_or_else(|| DEFAULT_OUTPUT_PREFIX.to_string()),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        for (name, bound) in [("lower", self.color.lower), ("upper", self.color.upper)] {
            if u16::from(bound[0]) >= HUE_STEPS {
                return invalid(format!("color.{name} hue {} must be below {HUE_STEPS}", bound[0]));
            }
        }
        if self
            .color
            .lower
            .iter()
            .zip(self.color.upper.iter())
            .any(|(lo, hi)| lo > hi)
        {
            return invalid(format!(
                "color.lower {:?} exceeds color.upper {:?}",
                self.color.lower, self.color.upper
            ));
        }
        if self.morph_kernel_size % 2 == 0 || self.morph_kernel_size > MAX_KERNEL_SIZE {
            return invalid(format!(
                "morph_kernel_size {} must be odd and at most {MAX_KERNEL_SIZE}",
                self.morph_kernel_size
            ));
        }
        if !self.min_radius.is_finite() || self.min_radius < 0.0 {
            return invalid(format!("min_radius {} must be a non-negative number", self.min_radius));
        }
        if !self.record_interval.is_finite() || self.record_interval < 0.0 {
            return invalid(format!(
                "record_interval_secs {} must be a non-negative number",
                self.record_interval
            ));
        }
        if self.frame_timeout.is_zero() {
            return invalid("frame_timeout_ms must be positive".to_string());
        }
        if self.output.prefix.is_empty() {
            return invalid("output.prefix must not be empty".to_string());
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}
