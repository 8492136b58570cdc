//! Core data model shared across the pipeline stages.
//!
//! A [`Batch`] is produced by the signal preprocessor and delivered by the
//! batch source as float64 (the preprocessor promotes the raw 32-bit
//! acquisition samples to float64 for decimation/filtering precision, and
//! every downstream stage — detector, buffer manager, serializer — keeps
//! working in float64 until the chunk is finally cast down to float16 at
//! serialization time).

use ndarray::Array2;
use uuid::Uuid;

/// A preprocessed `(T_b, S_total)` matrix as delivered by the batch source.
pub type Batch = Array2<f64>;

/// One section's annotated slice of a batch, produced by the train
/// detector and consumed by the buffer manager. Immutable once produced.
#[derive(Debug, Clone)]
pub struct AnnotatedSectionBatch {
    /// Section identifier.
    pub section_id: String,
    /// Whether a train was detected in this section's slice of the batch.
    pub status: bool,
    /// Wall-clock seconds at which the parent batch was classified; shared
    /// by every section of one batch.
    pub initial_timestamp: f64,
    /// The section's column slice of the batch, `(T_b, col_hi - col_lo)`.
    pub data: Array2<f64>,
}

/// A chunk emitted by the buffer manager: a contiguous span of one
/// section's ring, tagged for persistence.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Section identifier.
    pub section_id: String,
    /// Capture identity, stable across every fragment of one train
    /// traversal.
    pub uuid: Uuid,
    /// Zero-based index of this emission within its capture.
    pub file_chunk_index: u32,
    /// Timestamp of the oldest batch in the ring at the capture's first
    /// emission, propagated unchanged to every continuation emission.
    pub initial_timestamp: f64,
    /// `true` only on the last emission of a capture (no train in the
    /// final buffered batch).
    pub complete: bool,
    /// Concatenated ring contents, `(rows, cols)`.
    pub data: Array2<f64>,
}
