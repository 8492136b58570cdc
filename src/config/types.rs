//! Configuration type definitions.

use crate::constants::{
    DEFAULT_ACTIVE_REF_OFFSET, DEFAULT_BUFFER_SIZE_LOWER_LIMIT, DEFAULT_BYTES_PER_PIXEL,
    DEFAULT_SECTION_INDEX_LIMIT, DEFAULT_SECTION_LIMIT, DEFAULT_SENSOR_NAME,
    DEFAULT_TOTAL_TIME_MAX_LIMIT, DEV_BATCH_SHAPE, PROD_BATCH_SHAPE,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Deployment environment, selected by the `ENVIRONMENT` variable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development preset: `(1024, 2478)` batch shape.
    #[default]
    Dev,
    /// Production preset: `(4096, 5625)` batch shape.
    Prod,
}

impl Environment {
    /// Read from the `ENVIRONMENT` variable, defaulting to [`Environment::Dev`].
    pub fn from_env() -> Self {
        match std::env::var("ENVIRONMENT").as_deref() {
            Ok("prod") => Self::Prod,
            _ => Self::Dev,
        }
    }

    /// Preset batch shape `(T_b, S_total)` for this environment.
    #[must_use]
    pub const fn batch_shape(self) -> (usize, usize) {
        match self {
            Self::Dev => DEV_BATCH_SHAPE,
            Self::Prod => PROD_BATCH_SHAPE,
        }
    }
}

/// Butterworth filter type, matching SciPy's `btype` argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Lowpass filter.
    Lowpass,
    /// Highpass filter.
    Highpass,
    /// Bandpass filter.
    Bandpass,
    /// Bandstop filter.
    Bandstop,
}

/// Cutoff frequency spec: a single value for lowpass/highpass, or a
/// `[low, high]` pair for bandpass/bandstop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cutoff {
    /// Single cutoff frequency.
    Single(f64),
    /// `[low, high]` cutoff pair.
    Pair([f64; 2]),
}

/// Train detector mode, fixed at build/config time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorMode {
    /// Mode 0: run-length detection over the most-frequent consecutive
    /// difference in the above-threshold column index set.
    RunLength,
    /// Mode 1: proportion of columns whose RMS clears the threshold.
    Proportion,
}

/// Signal preprocessor settings (component A).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Downsampling factor (moving-mean block size).
    pub n: usize,
    /// Butterworth filter order.
    pub f_order: usize,
    /// Cutoff frequency (Hz, relative to the post-decimation sample rate).
    pub wn: Cutoff,
    /// Filter type.
    pub btype: FilterType,
    /// Sampling frequency in Hz, pre-decimation.
    pub fs: f64,
}

impl SignalConfig {
    /// Effective sample period after preprocessing: `dt = N / fs`.
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.n as f64 / self.fs
    }
}

/// One monitored section's column range `[col_lo, col_hi)`.
pub type SectionRange = (usize, usize);

/// Ordered section map; iteration order is insertion order, which is
/// required to be stable across every operation that walks sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionMap {
    entries: Vec<(String, SectionRange)>,
}

impl SectionMap {
    /// Build a section map from an already-ordered list of entries.
    #[must_use]
    pub fn new(entries: Vec<(String, SectionRange)>) -> Self {
        Self { entries }
    }

    /// Number of configured sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no configured sections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate sections in stable, insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, SectionRange)> {
        self.entries.iter().map(|(id, range)| (id.as_str(), *range))
    }
}

/// Batch source settings (component B).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSourceConfig {
    /// Maximum number of source files to read, in directory-listing order.
    pub max_files: usize,
    /// Wall-clock seconds to sleep between successive sub-batch yields.
    pub waiting_time: f64,
    /// Target sub-batch duration in seconds; `T_b` is chosen as the
    /// divisor of the filtered temporal length closest to
    /// `round(target_batch_seconds / dt)`.
    pub target_batch_seconds: f64,
}

/// Train detector settings (component C).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainDetectorConfig {
    /// Detection mode.
    pub mode: DetectorMode,
    /// RMS threshold above which a column counts as "detected".
    pub detection_threshold: f64,
    /// Mode 0 only: minimum occurrence count of the most-frequent
    /// consecutive difference to declare detection.
    pub spatial_window: usize,
    /// Mode 1 only: strict fraction of columns that must clear the
    /// threshold, in `(0, 1]`.
    pub validity_percentage: f64,
}

/// Buffer manager / margin settings (component D).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferManagerConfig {
    /// Spatial resolution in meters per column, used only for
    /// informational sizing (not part of the core state machine).
    pub spatial_resolution: f64,
    /// Start-margin time in seconds.
    pub start_margin_time: f64,
    /// End-margin time in seconds.
    pub end_margin_time: f64,
    /// Minimum acceptable ring capacity `K_s`.
    #[serde(default = "default_buffer_size_lower_limit")]
    pub buffer_size_lower_limit: usize,
    /// Offset added to the active-reference index
    /// (`floor(start_margin / (T_b * dt)) + offset`). Defaults to the
    /// `+1` variant; set to `0` to reproduce the older boundary check.
    #[serde(default = "default_active_ref_offset")]
    pub active_ref_offset: usize,
}

const fn default_buffer_size_lower_limit() -> usize {
    DEFAULT_BUFFER_SIZE_LOWER_LIMIT
}

const fn default_active_ref_offset() -> usize {
    DEFAULT_ACTIVE_REF_OFFSET
}

/// Chunk serializer settings (component E).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializerConfig {
    /// Per-section target file size, in MiB, indexed the same as the
    /// section map's iteration order.
    pub file_size_mb_list: Vec<f64>,
    /// Empirical bytes-per-sample ratio used to derive ring capacity.
    #[serde(default = "default_bytes_per_pixel")]
    pub bytes_per_pixel: f64,
    /// Emit the binary header+NPY format instead of JSON.
    #[serde(default)]
    pub binary: bool,
    /// Sensor name recorded in fragment headers.
    #[serde(default = "default_sensor_name")]
    pub sensor_name: String,
    /// Output root directory.
    pub output_root: PathBuf,
}

fn default_bytes_per_pixel() -> f64 {
    DEFAULT_BYTES_PER_PIXEL
}

fn default_sensor_name() -> String {
    DEFAULT_SENSOR_NAME.to_string()
}

/// Config validation limits (component F), all overridable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationLimits {
    /// Maximum number of sections.
    #[serde(default = "default_section_limit")]
    pub section_limit: usize,
    /// Maximum column index referenced by any section.
    #[serde(default = "default_section_index_limit")]
    pub section_index_limit: usize,
    /// Maximum total capture time, in seconds.
    #[serde(default = "default_total_time_max_limit")]
    pub total_time_max_limit: f64,
    /// Total capture time budget used to derive the per-section
    /// file-size ceiling.
    pub total_time_max: f64,
}

const fn default_section_limit() -> usize {
    DEFAULT_SECTION_LIMIT
}

const fn default_section_index_limit() -> usize {
    DEFAULT_SECTION_INDEX_LIMIT
}

const fn default_total_time_max_limit() -> f64 {
    DEFAULT_TOTAL_TIME_MAX_LIMIT
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Signal preprocessor settings.
    pub signal: SignalConfig,
    /// Monitored section map.
    pub section_map: SectionMap,
    /// Batch source settings.
    pub batch_source: BatchSourceConfig,
    /// Train detector settings.
    pub train_detector: TrainDetectorConfig,
    /// Buffer manager settings.
    pub buffer_manager: BufferManagerConfig,
    /// Chunk serializer settings.
    pub serializer: SerializerConfig,
    /// Validation limits.
    pub limits: ValidationLimits,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_env_defaults_to_dev() {
        // SAFETY: single-threaded test process, no concurrent env access.
        unsafe {
            std::env::remove_var("ENVIRONMENT");
        }
        assert_eq!(Environment::from_env(), Environment::Dev);
        assert_eq!(Environment::Dev.batch_shape(), DEV_BATCH_SHAPE);
        assert_eq!(Environment::Prod.batch_shape(), PROD_BATCH_SHAPE);
    }

    #[test]
    fn test_section_map_preserves_insertion_order() {
        let map = SectionMap::new(vec![
            ("S02".to_string(), (201, 330)),
            ("S01".to_string(), (0, 100)),
        ]);
        let ids: Vec<&str> = map.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["S02", "S01"]);
    }

    #[test]
    fn test_signal_config_dt() {
        let signal = SignalConfig {
            n: 5,
            f_order: 4,
            wn: Cutoff::Single(0.8),
            btype: FilterType::Highpass,
            fs: 1000.0,
        };
        assert!((signal.dt() - 0.005).abs() < 1e-12);
    }
}
