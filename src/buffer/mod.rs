//! Buffer manager (component D): the per-section rolling-ring state machine
//! that turns a stream of annotated batches into emitted chunks.
//!
//! This is the core of the pipeline. Ring geometry (`K_s`, the active and
//! inactive reference indices) is derived once at startup from validated
//! configuration; see [`ring_capacity`], [`active_ref_index`] and
//! [`inactive_ref_index`], which [`crate::config::validate_config`] calls to
//! reject bad configurations and whose resulting [`Geometry`] values are fed
//! directly into [`BufferManager::new`] — the buffer manager never
//! re-derives geometry of its own, so a validated config and the one it is
//! built from cannot disagree.

use crate::config::Geometry;
use crate::config::types::SectionMap;
use crate::model::{AnnotatedSectionBatch, Chunk};
use ndarray::{Array2, Axis};
use std::collections::VecDeque;
use uuid::Uuid;

/// Ring capacity `K_s`: the number of batches that, once serialized, stay
/// within the section's file-size budget.
#[must_use]
pub fn ring_capacity(bytes_per_pixel: f64, t_b: usize, c_s: usize, f_s_mb: f64) -> usize {
    let bytes_per_batch = bytes_per_pixel * t_b as f64 * c_s as f64;
    ((f_s_mb * f64::from(1u32 << 20)) / bytes_per_batch).floor() as usize
}

/// Ring index marking the start-margin anchor. Defaults to the `+1`
/// variant (`offset = 1`); set `offset = 0` to reproduce the older
/// boundary check.
#[must_use]
pub fn active_ref_index(start_margin_time: f64, t_b: usize, dt: f64, offset: usize) -> usize {
    (start_margin_time / (t_b as f64 * dt)).floor() as usize + offset
}

/// Ring index marking the end-margin release threshold. Signed because an
/// invalid configuration can drive it negative; validation rejects that
/// before a [`BufferManager`] is ever built.
#[must_use]
pub fn inactive_ref_index(k_s: usize, end_margin_time: f64, t_b: usize, dt: f64) -> i64 {
    k_s as i64 - (end_margin_time / (t_b as f64 * dt)).floor() as i64 - 1
}

#[derive(Debug, Default)]
struct SectionState {
    ring: VecDeque<AnnotatedSectionBatch>,
    rebase_flag: bool,
    capture_active: bool,
    current_chunk_uuid: Option<Uuid>,
    file_chunk_counter: u32,
    capture_initial_timestamp: Option<f64>,
}

struct SectionGeometry {
    section_id: String,
    k_s: usize,
    active_ref: usize,
    inactive_ref: i64,
    state: SectionState,
}

/// Owns one [`SectionState`] per configured section and drives the
/// fill/rebase/emit state machine described in the component design.
pub struct BufferManager {
    sections: Vec<SectionGeometry>,
}

impl BufferManager {
    /// Build a buffer manager directly from the per-section [`Geometry`]
    /// returned by [`crate::config::validate_config`], in the same
    /// `SectionMap` order. The geometry is consumed as-is, never
    /// recomputed, so the manager is guaranteed to match whatever
    /// configuration was actually validated. `geometry` must come from
    /// validating this same `SectionMap`; a shorter slice silently drops
    /// the trailing sections.
    #[must_use]
    pub fn new(sections: &SectionMap, geometry: &[Geometry]) -> Self {
        let sections = sections
            .iter()
            .zip(geometry)
            .map(|((section_id, _), geometry)| SectionGeometry {
                section_id: section_id.to_string(),
                k_s: geometry.k_s,
                active_ref: geometry.active_ref,
                inactive_ref: geometry.inactive_ref,
                state: SectionState::default(),
            })
            .collect();

        Self { sections }
    }

    /// Process one batch's worth of annotated section slices, in
    /// `SectionMap` order, and return every chunk emitted this call (zero
    /// or one per section).
    pub fn process_batch(&mut self, annotated: Vec<AnnotatedSectionBatch>) -> Vec<Chunk> {
        self.sections
            .iter_mut()
            .zip(annotated)
            .filter_map(|(geometry, batch)| process_one(geometry, batch))
            .collect()
    }
}

fn process_one(geometry: &mut SectionGeometry, incoming: AnnotatedSectionBatch) -> Option<Chunk> {
    let state = &mut geometry.state;

    if state.ring.len() < geometry.k_s {
        state.ring.push_back(incoming);
        if state.ring.len() == geometry.k_s {
            state.rebase_flag = true;
        }
        return None;
    }

    state.rebase_flag = true;
    let chunk = try_emit(geometry);

    // A successful emission clears the ring; the incoming batch that
    // triggered this cycle is then dropped rather than appended, matching
    // the original roll guard (`if batch_buffer: pop+append`).
    let state = &mut geometry.state;
    if !state.ring.is_empty() {
        state.ring.pop_front();
        state.ring.push_back(incoming);
    }

    chunk
}

fn try_emit(geometry: &mut SectionGeometry) -> Option<Chunk> {
    let state = &mut geometry.state;
    let statuses: Vec<bool> = state.ring.iter().map(|b| b.status).collect();

    let Some(min_index) = statuses.iter().position(|&s| s) else {
        state.capture_active = false;
        return None;
    };
    let max_index = statuses.iter().rposition(|&s| s).expect("min_index implies at least one true");
    let complete = !statuses[geometry.k_s - 1];

    if !state.capture_active {
        if min_index != geometry.active_ref {
            return None;
        }

        let initial_timestamp = state.ring.front().expect("ring is full").initial_timestamp;
        let data = concat_ring(&state.ring);
        let uuid = Uuid::new_v4();
        state.current_chunk_uuid = Some(uuid);
        state.file_chunk_counter = 0;
        state.capture_initial_timestamp = Some(initial_timestamp);
        if !complete {
            state.capture_active = true;
        }
        state.ring.clear();
        state.rebase_flag = false;

        Some(Chunk {
            section_id: geometry.section_id.clone(),
            uuid,
            file_chunk_index: 0,
            initial_timestamp,
            complete,
            data,
        })
    } else {
        let data = concat_ring(&state.ring);
        let uuid = state.current_chunk_uuid.expect("an active capture always has a uuid");
        state.file_chunk_counter += 1;
        let initial_timestamp = state
            .capture_initial_timestamp
            .expect("an active capture always has an initial timestamp");

        if i64::try_from(max_index).unwrap_or(i64::MAX) <= geometry.inactive_ref {
            state.capture_active = false;
        }
        state.ring.clear();
        state.rebase_flag = false;

        Some(Chunk {
            section_id: geometry.section_id.clone(),
            uuid,
            file_chunk_index: state.file_chunk_counter,
            initial_timestamp,
            complete,
            data,
        })
    }
}

fn concat_ring(ring: &VecDeque<AnnotatedSectionBatch>) -> Array2<f64> {
    let views: Vec<_> = ring.iter().map(|b| b.data.view()).collect();
    ndarray::concatenate(Axis(0), &views).expect("every ring entry shares the same column count")
}
