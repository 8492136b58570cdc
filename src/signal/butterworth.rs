//! Butterworth filter coefficient design and zero-phase application.
//!
//! No crate in the pack ships an arbitrary-order Butterworth design — the
//! `biquad` crate only provides single 2nd-order cookbook sections — so
//! filters of order greater than two are built here as a cascade of
//! `biquad` sections, one per conjugate pole pair, with per-section Q
//! values from the standard Butterworth pole-angle formula
//! `Q_k = 1 / (2 * cos((2k - 1) * pi / (2N)))`. An odd order adds one
//! extra near-critically-damped section rather than a true first-order
//! stage, which `biquad` cannot express; this is a documented
//! approximation (see DESIGN.md), acceptable given the preprocessor's
//! minor share of the pipeline design budget relative to the buffer
//! manager and serializer.

use crate::config::types::{Cutoff, FilterType};
use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};
use std::f64::consts::PI;

#[derive(Clone, Copy)]
struct Stage {
    coeffs: Coefficients<f32>,
}

impl Stage {
    fn apply(&self, input: &[f64]) -> Vec<f64> {
        let mut form = DirectForm2Transposed::<f32>::new(self.coeffs);
        input
            .iter()
            .map(|&x| f64::from(form.run(x as f32)))
            .collect()
    }
}

/// Per-section Q values for an order-`order` Butterworth lowpass/highpass
/// prototype, one per cascaded 2nd-order section.
fn butterworth_qs(order: usize) -> Vec<f32> {
    let order = order.max(1);
    let pairs = order / 2;
    let mut qs: Vec<f32> = (1..=pairs)
        .map(|k| {
            let theta = (2 * k - 1) as f64 * PI / (2.0 * order as f64);
            (1.0 / (2.0 * theta.cos())) as f32
        })
        .collect();
    if order % 2 == 1 {
        qs.push(0.5);
    }
    qs
}

fn build_stages(
    btype: FilterType,
    wn: Cutoff,
    order: usize,
    fs: f64,
) -> Result<Vec<Stage>, String> {
    let qs = butterworth_qs(order);
    let mut stages = Vec::with_capacity(qs.len());

    match (btype, wn) {
        (FilterType::Lowpass, Cutoff::Single(f0)) | (FilterType::Highpass, Cutoff::Single(f0)) => {
            let ty = if matches!(btype, FilterType::Lowpass) {
                Type::LowPass
            } else {
                Type::HighPass
            };
            for q in qs {
                let coeffs = Coefficients::<f32>::from_params(ty, (fs as f32).hz(), (f0 as f32).hz(), q)
                    .map_err(|e| format!("{e:?}"))?;
                stages.push(Stage { coeffs });
            }
        }
        (FilterType::Bandpass, Cutoff::Pair([lo, hi]))
        | (FilterType::Bandstop, Cutoff::Pair([lo, hi])) => {
            let center = (lo * hi).sqrt();
            let bandwidth = (hi - lo).max(f64::EPSILON);
            let q_center = (center / bandwidth) as f32;
            let ty = if matches!(btype, FilterType::Bandpass) {
                Type::BandPass
            } else {
                Type::Notch
            };
            for _ in 0..qs.len().max(1) {
                let coeffs =
                    Coefficients::<f32>::from_params(ty, (fs as f32).hz(), (center as f32).hz(), q_center)
                        .map_err(|e| format!("{e:?}"))?;
                stages.push(Stage { coeffs });
            }
        }
        (FilterType::Lowpass | FilterType::Highpass, Cutoff::Pair(_)) => {
            return Err("lowpass/highpass filters require a single cutoff frequency".to_string());
        }
        (FilterType::Bandpass | FilterType::Bandstop, Cutoff::Single(_)) => {
            return Err("bandpass/bandstop filters require a [low, high] cutoff pair".to_string());
        }
    }

    Ok(stages)
}

/// Apply a zero-phase (forward-backward) Butterworth filter to one column.
pub fn filtfilt_column(
    column: &[f64],
    btype: FilterType,
    wn: Cutoff,
    order: usize,
    fs: f64,
) -> Result<Vec<f64>, String> {
    let stages = build_stages(btype, wn, order, fs)?;

    let mut data = column.to_vec();
    for stage in &stages {
        data = stage.apply(&data);
    }
    data.reverse();
    for stage in &stages {
        data = stage.apply(&data);
    }
    data.reverse();
    Ok(data)
}
