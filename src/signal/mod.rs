//! Signal preprocessor (component A): moving-mean downsampling followed by
//! zero-phase Butterworth filtering.

mod butterworth;

use crate::config::types::SignalConfig;
use ndarray::{Array2, Axis};

/// Moving-mean decimation by `n` along axis 0 (time). Block `i` averages
/// input rows `[i*n, min((i+1)*n, rows))`; the tail block may average
/// fewer than `n` rows.
fn movmean_downsample(data: &Array2<f32>, n: usize) -> Array2<f64> {
    let (rows, cols) = data.dim();
    let out_rows = rows.div_ceil(n);
    let mut out = Array2::<f64>::zeros((out_rows, cols));

    for (block, mut out_row) in out.axis_iter_mut(Axis(0)).enumerate() {
        let start = block * n;
        let end = (start + n).min(rows);
        let width = (end - start) as f64;
        for c in 0..cols {
            let mut sum = 0.0_f64;
            for r in start..end {
                sum += f64::from(data[(r, c)]);
            }
            out_row[c] = sum / width;
        }
    }

    out
}

/// Run the full preprocessing chain on a raw `(T, S)` matrix: decimate by
/// `signal.n`, then zero-phase Butterworth filter each column
/// independently. Returns a `(ceil(T/N), S)` float64 matrix.
pub fn preprocess(data: &Array2<f32>, signal: &SignalConfig) -> crate::error::Result<Array2<f64>> {
    let reduced = movmean_downsample(data, signal.n.max(1));
    let (rows, cols) = reduced.dim();
    let fs = 1.0 / signal.dt();

    let mut filtered = Array2::<f64>::zeros((rows, cols));
    for c in 0..cols {
        let column: Vec<f64> = reduced.column(c).to_vec();
        let out = butterworth::filtfilt_column(&column, signal.btype, signal.wn, signal.f_order, fs)
            .map_err(|message| crate::error::Error::SourceDecode {
                path: std::path::PathBuf::from("<signal preprocessor>"),
                message,
            })?;
        for (r, value) in out.into_iter().enumerate() {
            filtered[(r, c)] = value;
        }
    }

    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{Cutoff, FilterType};

    #[test]
    fn test_movmean_downsample_exact_divisor() {
        let data = Array2::from_shape_vec((4, 1), vec![1.0_f32, 3.0, 5.0, 7.0]).expect("shape");
        let out = movmean_downsample(&data, 2);
        assert_eq!(out.dim(), (2, 1));
        assert!((out[(0, 0)] - 2.0).abs() < 1e-9);
        assert!((out[(1, 0)] - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_movmean_downsample_tail_block_shorter() {
        let data = Array2::from_shape_vec((5, 1), vec![1.0_f32, 1.0, 1.0, 1.0, 10.0]).expect("shape");
        let out = movmean_downsample(&data, 2);
        assert_eq!(out.dim(), (3, 1));
        // Tail block averages a single row, not padded with zeros.
        assert!((out[(2, 0)] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_preprocess_output_shape() {
        let data = Array2::<f32>::zeros((100, 4));
        let signal = SignalConfig {
            n: 5,
            f_order: 4,
            wn: Cutoff::Single(0.8),
            btype: FilterType::Highpass,
            fs: 1000.0,
        };
        let out = preprocess(&data, &signal).expect("preprocess should succeed");
        assert_eq!(out.dim(), (20, 4));
    }
}
