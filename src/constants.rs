//! Application-wide constants.
//!
//! All magic numbers are defined here to ensure consistency and make
//! changes easy to track.

/// Application name used for config directories.
pub const APP_NAME: &str = "das-train-capture";

/// Empirical bytes-per-sample ratio of the persisted (base64 or NPY f16)
/// encoding relative to one raw f32 sample, used to size per-section ring
/// capacity from a file-size budget.
pub const DEFAULT_BYTES_PER_PIXEL: f64 = 1.984;

/// Default lower bound on a section's ring capacity; configs that compute
/// a smaller `K_s` are rejected.
pub const DEFAULT_BUFFER_SIZE_LOWER_LIMIT: usize = 4;

/// Default maximum number of monitored sections.
pub const DEFAULT_SECTION_LIMIT: usize = 10;

/// Default maximum column index referenced by any section.
pub const DEFAULT_SECTION_INDEX_LIMIT: usize = 1000;

/// Default maximum total capture time (seconds), used to derive the
/// per-section file-size ceiling.
pub const DEFAULT_TOTAL_TIME_MAX_LIMIT: f64 = 300.0;

/// Development preset batch shape `(T_b, S_total)`.
pub const DEV_BATCH_SHAPE: (usize, usize) = (1024, 2478);

/// Production preset batch shape `(T_b, S_total)`.
pub const PROD_BATCH_SHAPE: (usize, usize) = (4096, 5625);

/// Default active-reference offset (the `+1` variant from the design
/// notes). Set to `0` to reproduce the older `generate_chunks` boundary
/// check.
pub const DEFAULT_ACTIVE_REF_OFFSET: usize = 1;

/// Sensor name recorded in the JSON/binary fragment header when the
/// config does not override it.
pub const DEFAULT_SENSOR_NAME: &str = "DAS_TEST";
