//! Configuration loading and management.

mod file;
mod paths;
pub(crate) mod types;
mod validate;

pub use file::{load_config_file, load_default_config};
pub use paths::{config_dir, config_file_path};
pub use types::{
    BatchSourceConfig, BufferManagerConfig, Config, Cutoff, DetectorMode, Environment,
    FilterType, SectionMap, SectionRange, SerializerConfig, SignalConfig, TrainDetectorConfig,
    ValidationLimits,
};
pub use validate::{Geometry, validate_config};
