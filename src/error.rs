//! Error types for the train-capture pipeline.

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
///
/// Variants are grouped by the error kinds named in the pipeline design:
/// configuration, I/O, serialization. Detector degeneracy (an empty
/// run-length index set) is deliberately not an error variant here — it is
/// a valid "no train" outcome, not a failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: Box<toml::de::Error>,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Source directory could not be listed.
    #[error("failed to list source directory '{path}'")]
    SourceDirRead {
        /// Path to the source directory.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A source file could not be decoded into a matrix.
    #[error("failed to decode source file '{path}': {message}")]
    SourceDecode {
        /// Path to the offending file.
        path: std::path::PathBuf,
        /// Description of the decode failure.
        message: String,
    },

    /// Fragment output directory could not be created.
    #[error("failed to create output directory '{path}'")]
    OutputDirCreate {
        /// Path that could not be created.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Fragment file could not be written.
    #[error("failed to write fragment '{path}'")]
    FragmentWrite {
        /// Path to the fragment file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Fragment JSON header encoding failed.
    #[error("failed to encode fragment header as JSON")]
    FragmentEncode {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Fragment could not be parsed back.
    #[error("failed to parse fragment '{path}': {message}")]
    FragmentDecode {
        /// Path to the offending fragment.
        path: std::path::PathBuf,
        /// Description of the decode failure.
        message: String,
    },
}
