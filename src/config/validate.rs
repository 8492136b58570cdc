//! Configuration validation (component F).
//!
//! A single [`validate_config`] pass rejects a configuration with a
//! descriptive [`crate::error::Error::ConfigValidation`] before any
//! section state is built, covering every condition named in the buffer
//! manager design: section count/index limits, the total-time-derived
//! file-size ceiling, and the per-section ring geometry (`K_s`, the
//! active/inactive reference indices) that [`crate::buffer`] assumes is
//! already sound.

use crate::buffer::{active_ref_index, inactive_ref_index, ring_capacity};
use crate::config::types::Config;
use crate::error::{Error, Result};

/// Per-section ring geometry derived once at startup, after validation
/// passes. The buffer manager is built directly from this rather than
/// recomputing it, so a validated config and the geometry fed to
/// `BufferManager::new` never disagree.
#[derive(Debug, Clone, Copy)]
pub struct Geometry {
    /// Ring capacity `K_s`.
    pub k_s: usize,
    /// Active-reference ring index.
    pub active_ref: usize,
    /// Inactive-reference ring index.
    pub inactive_ref: i64,
}

/// Validate `config` against a batch geometry of `t_b` rows per batch and
/// post-preprocessing sample period `dt`, returning the derived
/// per-section ring geometry on success.
///
/// # Errors
///
/// Returns [`Error::ConfigValidation`] on the first condition violated,
/// in the order listed in the buffer manager design: section
/// count/index limits, serializer list length, total-time-derived
/// file-size ceiling, ring capacity, and reference-index bounds.
pub fn validate_config(config: &Config, t_b: usize, dt: f64) -> Result<Vec<Geometry>> {
    let sections = &config.section_map;
    let limits = &config.limits;

    if sections.len() > limits.section_limit {
        return Err(config_error(format!(
            "{} sections configured, exceeds section_limit of {}",
            sections.len(),
            limits.section_limit
        )));
    }

    for (section_id, (_, col_hi)) in sections.iter() {
        if col_hi >= limits.section_index_limit {
            return Err(config_error(format!(
                "section '{section_id}' upper column index {col_hi} is >= section_index_limit of {}",
                limits.section_index_limit
            )));
        }
    }

    if limits.total_time_max > limits.total_time_max_limit {
        return Err(config_error(format!(
            "total_time_max {} exceeds total_time_max_limit of {}",
            limits.total_time_max, limits.total_time_max_limit
        )));
    }

    if config.serializer.file_size_mb_list.len() != sections.len() {
        return Err(config_error(format!(
            "file_size_mb_list has {} entries, expected one per section ({})",
            config.serializer.file_size_mb_list.len(),
            sections.len()
        )));
    }

    let derived_file_size_limit_mb = (limits.total_time_max * config.serializer.bytes_per_pixel * t_b as f64)
        / (dt * f64::from(1u32 << 20));

    let mut geometry = Vec::with_capacity(sections.len());

    for ((section_id, (col_lo, col_hi)), &f_s_mb) in sections.iter().zip(&config.serializer.file_size_mb_list) {
        if f_s_mb > derived_file_size_limit_mb {
            return Err(config_error(format!(
                "section '{section_id}' file_size_mb {f_s_mb} exceeds the derived limit of {derived_file_size_limit_mb:.4} MiB"
            )));
        }

        let c_s = col_hi - col_lo;
        let k_s = ring_capacity(config.serializer.bytes_per_pixel, t_b, c_s, f_s_mb);
        if k_s < config.buffer_manager.buffer_size_lower_limit {
            return Err(config_error(format!(
                "section '{section_id}' derived K_s={k_s} is below buffer_size_lower_limit of {}",
                config.buffer_manager.buffer_size_lower_limit
            )));
        }

        let active_ref = active_ref_index(
            config.buffer_manager.start_margin_time,
            t_b,
            dt,
            config.buffer_manager.active_ref_offset,
        );
        let inactive_ref = inactive_ref_index(k_s, config.buffer_manager.end_margin_time, t_b, dt);

        if active_ref >= k_s {
            return Err(config_error(format!(
                "section '{section_id}' active_ref {active_ref} is outside [0, {k_s})"
            )));
        }
        if inactive_ref < 0 || inactive_ref as usize >= k_s {
            return Err(config_error(format!(
                "section '{section_id}' inactive_ref {inactive_ref} is outside [0, {k_s})"
            )));
        }

        geometry.push(Geometry {
            k_s,
            active_ref,
            inactive_ref,
        });
    }

    Ok(geometry)
}

fn config_error(message: String) -> Error {
    Error::ConfigValidation { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{
        BatchSourceConfig, BufferManagerConfig, Cutoff, DetectorMode, FilterType, SectionMap,
        SerializerConfig, SignalConfig, TrainDetectorConfig, ValidationLimits,
    };
    use std::path::PathBuf;

    fn base_config() -> Config {
        Config {
            signal: SignalConfig {
                n: 1,
                f_order: 4,
                wn: Cutoff::Single(0.8),
                btype: FilterType::Highpass,
                fs: 200.0,
            },
            section_map: SectionMap::new(vec![("S01".to_string(), (0, 100))]),
            batch_source: BatchSourceConfig {
                max_files: 10,
                waiting_time: 0.0,
                target_batch_seconds: 5.12,
            },
            train_detector: TrainDetectorConfig {
                mode: DetectorMode::Proportion,
                detection_threshold: 3.0,
                spatial_window: 5,
                validity_percentage: 0.5,
            },
            buffer_manager: BufferManagerConfig {
                spatial_resolution: 1.0,
                start_margin_time: 10.0,
                end_margin_time: 20.0,
                buffer_size_lower_limit: 4,
                active_ref_offset: 1,
            },
            serializer: SerializerConfig {
                file_size_mb_list: vec![2.0],
                bytes_per_pixel: 1.984,
                binary: false,
                sensor_name: "DAS_TEST".to_string(),
                output_root: PathBuf::from("/tmp/out"),
            },
            limits: ValidationLimits {
                section_limit: 10,
                section_index_limit: 1000,
                total_time_max_limit: 300.0,
                total_time_max: 300.0,
            },
        }
    }

    #[test]
    fn test_valid_config_derives_geometry() {
        let config = base_config();
        let geometry = validate_config(&config, 1024, 0.005).expect("should validate");
        assert_eq!(geometry.len(), 1);
        assert_eq!(geometry[0].k_s, 10);
    }

    #[test]
    fn test_rejects_too_many_sections() {
        let mut config = base_config();
        config.limits.section_limit = 0;
        assert!(validate_config(&config, 1024, 0.005).is_err());
    }

    #[test]
    fn test_rejects_section_index_over_limit() {
        let mut config = base_config();
        config.section_map = SectionMap::new(vec![("S01".to_string(), (0, 1000))]);
        assert!(validate_config(&config, 1024, 0.005).is_err());
    }

    #[test]
    fn test_rejects_total_time_max_over_limit() {
        let mut config = base_config();
        config.limits.total_time_max = 301.0;
        assert!(validate_config(&config, 1024, 0.005).is_err());
    }

    #[test]
    fn test_rejects_mismatched_file_size_list_length() {
        let mut config = base_config();
        config.serializer.file_size_mb_list = vec![2.0, 2.0];
        assert!(validate_config(&config, 1024, 0.005).is_err());
    }

    #[test]
    fn test_rejects_file_size_over_derived_limit() {
        let mut config = base_config();
        config.serializer.file_size_mb_list = vec![1_000_000.0];
        assert!(validate_config(&config, 1024, 0.005).is_err());
    }

    #[test]
    fn test_rejects_k_s_below_lower_limit() {
        let mut config = base_config();
        config.serializer.file_size_mb_list = vec![0.01];
        let result = validate_config(&config, 1024, 0.005);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("buffer_size_lower_limit"));
    }

    #[test]
    fn test_rejects_active_ref_outside_bounds() {
        let mut config = base_config();
        config.buffer_manager.start_margin_time = 1000.0;
        assert!(validate_config(&config, 1024, 0.005).is_err());
    }

    #[test]
    fn test_rejects_inactive_ref_outside_bounds() {
        let mut config = base_config();
        config.buffer_manager.end_margin_time = 1000.0;
        assert!(validate_config(&config, 1024, 0.005).is_err());
    }
}
