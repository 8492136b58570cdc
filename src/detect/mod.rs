//! Train detector (component C): per-section RMS-threshold classification
//! of one batch.

use crate::config::types::{DetectorMode, SectionMap, TrainDetectorConfig};
use crate::model::{AnnotatedSectionBatch, Batch};
use ndarray::Axis;
use std::collections::HashMap;

/// Classifies each configured section of a batch as "train present" or not.
#[derive(Debug, Clone)]
pub struct TrainDetector {
    config: TrainDetectorConfig,
}

impl TrainDetector {
    /// Build a detector from its configuration.
    #[must_use]
    pub fn new(config: TrainDetectorConfig) -> Self {
        Self { config }
    }

    /// Classify every section of `batch`. `timestamp` must be read from the
    /// wall clock exactly once per batch by the caller and is shared,
    /// unchanged, across every section's result so that cross-section
    /// ordering stays consistent.
    pub fn detect(&self, batch: &Batch, sections: &SectionMap, timestamp: f64) -> Vec<AnnotatedSectionBatch> {
        sections
            .iter()
            .map(|(section_id, (col_lo, col_hi))| {
                let slice = batch.slice(ndarray::s![.., col_lo..col_hi]);
                let rms = column_rms(&slice.to_owned());
                let status = match self.config.mode {
                    DetectorMode::RunLength => {
                        detect_run_length(&rms, self.config.detection_threshold, self.config.spatial_window)
                    }
                    DetectorMode::Proportion => {
                        detect_proportion(&rms, self.config.detection_threshold, self.config.validity_percentage)
                    }
                };
                AnnotatedSectionBatch {
                    section_id: section_id.to_string(),
                    status,
                    initial_timestamp: timestamp,
                    data: slice.to_owned(),
                }
            })
            .collect()
    }
}

/// Per-column RMS over the batch's row axis (time).
fn column_rms(section: &ndarray::Array2<f64>) -> Vec<f64> {
    section
        .axis_iter(Axis(1))
        .map(|column| {
            let mean_sq = column.iter().map(|&x| x * x).sum::<f64>() / column.len() as f64;
            mean_sq.sqrt()
        })
        .collect()
}

/// Mode 0: most-frequent consecutive difference among above-threshold
/// column indices must occur at least `spatial_window` times. An empty or
/// singleton index set (no consecutive differences at all) returns `false`
/// — a degenerate, expected outcome, not an error.
fn detect_run_length(rms: &[f64], threshold: f64, spatial_window: usize) -> bool {
    let idx: Vec<i64> = rms
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v > threshold)
        .map(|(j, _)| j as i64)
        .collect();

    if idx.len() < 2 {
        return false;
    }

    let mut counts: HashMap<i64, usize> = HashMap::new();
    for pair in idx.windows(2) {
        *counts.entry(pair[1] - pair[0]).or_insert(0) += 1;
    }

    counts.values().copied().max().unwrap_or(0) >= spatial_window
}

/// Mode 1: strict majority of columns clearing the threshold.
fn detect_proportion(rms: &[f64], threshold: f64, validity_percentage: f64) -> bool {
    let valid_count = rms.iter().filter(|&&v| v >= threshold).count();
    valid_count as f64 > validity_percentage * rms.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn sections() -> SectionMap {
        SectionMap::new(vec![("S01".to_string(), (0, 4))])
    }

    #[test]
    fn test_detect_run_length_quiet_batch_is_not_detected() {
        let rms = vec![0.0, 0.0, 0.0, 0.0];
        assert!(!detect_run_length(&rms, 3.0, 2));
    }

    #[test]
    fn test_detect_run_length_degenerate_single_hit_is_false() {
        let rms = vec![10.0, 0.0, 0.0, 0.0];
        assert!(!detect_run_length(&rms, 3.0, 2));
    }

    #[test]
    fn test_detect_run_length_consecutive_hits_detected() {
        // idx = {0,1,2,3}, diffs = {1,1,1}, most frequent diff count = 3.
        let rms = vec![10.0, 10.0, 10.0, 10.0];
        assert!(detect_run_length(&rms, 3.0, 3));
        assert!(!detect_run_length(&rms, 3.0, 4));
    }

    #[test]
    fn test_detect_proportion_strict_inequality() {
        // 2 of 4 columns valid, validity_percentage = 0.5 -> 2 > 0.5*4=2 is false.
        let rms = vec![10.0, 10.0, 0.0, 0.0];
        assert!(!detect_proportion(&rms, 3.0, 0.5));
        // 3 of 4 columns valid -> 3 > 2.0 true.
        let rms = vec![10.0, 10.0, 10.0, 0.0];
        assert!(detect_proportion(&rms, 3.0, 0.5));
    }

    #[test]
    fn test_detector_shares_one_timestamp_across_sections() {
        let sections = SectionMap::new(vec![("S01".to_string(), (0, 2)), ("S02".to_string(), (2, 4))]);
        let batch = Array2::<f64>::zeros((8, 4));
        let detector = TrainDetector::new(TrainDetectorConfig {
            mode: DetectorMode::Proportion,
            detection_threshold: 3.0,
            spatial_window: 2,
            validity_percentage: 0.5,
        });
        let result = detector.detect(&batch, &sections, 1234.5);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|r| (r.initial_timestamp - 1234.5).abs() < 1e-12));
    }

    #[test]
    fn test_detector_produces_owned_section_slices() {
        let batch = Array2::<f64>::from_elem((4, 4), 1.0);
        let detector = TrainDetector::new(TrainDetectorConfig {
            mode: DetectorMode::RunLength,
            detection_threshold: 0.5,
            spatial_window: 2,
            validity_percentage: 0.5,
        });
        let result = detector.detect(&batch, &sections(), 0.0);
        assert_eq!(result[0].data.dim(), (4, 4));
    }
}
