//! Batch source (component B): iterate source files, preprocess each, and
//! deliver paced fixed-length sub-batches.
//!
//! The raw source-file reader is an external collaborator (see the
//! pipeline design notes): this module depends only on the [`MatrixReader`]
//! trait boundary, never on a concrete file format. [`RawF32MatrixReader`]
//! is the reference implementation used by tests and the bundled binary;
//! production deployments swap in their own reader.

use crate::config::types::{BatchSourceConfig, SignalConfig};
use crate::error::{Error, Result};
use crate::model::Batch;
use crate::signal;
use ndarray::{Array2, Axis};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Decodes one opaque source file into a raw `(T, S)` float matrix.
pub trait MatrixReader {
    /// Decode `path` into a matrix.
    fn read(&self, path: &Path) -> Result<Array2<f32>>;
}

/// Reference [`MatrixReader`]: `(u32 LE rows)(u32 LE cols)(rows*cols f32 LE,
/// row-major)`. Used by tests and the bundled binary; not a production
/// interrogator format.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawF32MatrixReader;

impl MatrixReader for RawF32MatrixReader {
    fn read(&self, path: &Path) -> Result<Array2<f32>> {
        let bytes = std::fs::read(path)?;
        if bytes.len() < 8 {
            return Err(Error::SourceDecode {
                path: path.to_path_buf(),
                message: "file shorter than the 8-byte shape header".to_string(),
            });
        }
        let rows = u32::from_le_bytes(bytes[0..4].try_into().unwrap_or_default()) as usize;
        let cols = u32::from_le_bytes(bytes[4..8].try_into().unwrap_or_default()) as usize;
        let expected_len = 8 + rows * cols * 4;
        if bytes.len() != expected_len {
            return Err(Error::SourceDecode {
                path: path.to_path_buf(),
                message: format!(
                    "expected {expected_len} bytes for a {rows}x{cols} matrix, found {}",
                    bytes.len()
                ),
            });
        }

        let mut data = Vec::with_capacity(rows * cols);
        for chunk in bytes[8..].chunks_exact(4) {
            let Ok(raw) = chunk.try_into() else {
                continue;
            };
            data.push(f32::from_le_bytes(raw));
        }

        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::SourceDecode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Find the divisor of `n` closest to `target`.
///
/// Mirrors the original implementation's search, which only considers
/// divisors `n / i` for `i` in `1..=floor(sqrt(n))` — the "large" half of
/// each divisor pair — rather than every divisor of `n`. This can miss a
/// closer small divisor when `target` is small relative to `n`, but is
/// reproduced faithfully since downstream buffer geometry is derived from
/// this exact choice.
fn closest_divisor(n: usize, target: usize) -> usize {
    if n == 0 {
        return 1;
    }
    let limit = (n as f64).sqrt() as usize;
    let mut best = n;
    let mut best_diff = target.abs_diff(best);
    for i in 1..=limit.max(1) {
        if n % i == 0 {
            let candidate = n / i;
            let diff = target.abs_diff(candidate);
            if diff < best_diff {
                best = candidate;
                best_diff = diff;
            }
        }
    }
    best
}

/// Lazy, finite, non-restartable sequence of preprocessed `(T_b, S_total)`
/// batches, paced by a wall-clock sleep between yields.
pub struct BatchSource<R: MatrixReader> {
    reader: R,
    signal: SignalConfig,
    waiting_time: f64,
    target_batch_seconds: f64,
    files: VecDeque<PathBuf>,
    pending: VecDeque<Batch>,
    yielded_any: bool,
    exhausted_by_error: bool,
}

impl<R: MatrixReader> BatchSource<R> {
    /// Build a batch source over `data_path`, reading at most
    /// `config.max_files` entries in directory-listing order.
    pub fn new(data_path: &Path, reader: R, signal: SignalConfig, config: &BatchSourceConfig) -> Result<Self> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(data_path)
            .map_err(|source| Error::SourceDirRead {
                path: data_path.to_path_buf(),
                source,
            })?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file())
            .collect();
        files.truncate(config.max_files);

        Ok(Self {
            reader,
            signal,
            waiting_time: config.waiting_time,
            target_batch_seconds: config.target_batch_seconds,
            files: files.into(),
            pending: VecDeque::new(),
            yielded_any: false,
            exhausted_by_error: false,
        })
    }

    fn load_next_file(&mut self) -> Result<bool> {
        let Some(path) = self.files.pop_front() else {
            return Ok(false);
        };

        let raw = self.reader.read(&path)?;
        let filtered = signal::preprocess(&raw, &self.signal)?;
        let dt = self.signal.dt();
        let target_rows = (self.target_batch_seconds / dt).round().max(1.0) as usize;
        let rows = filtered.nrows();
        let batch_rows = closest_divisor(rows, target_rows).max(1);

        let mut start = 0;
        while start < rows {
            let end = (start + batch_rows).min(rows);
            let slice = filtered.slice_axis(Axis(0), (start..end).into());
            self.pending.push_back(slice.to_owned());
            start = end;
        }

        Ok(true)
    }
}

impl<R: MatrixReader> Iterator for BatchSource<R> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted_by_error {
            return None;
        }

        loop {
            if let Some(batch) = self.pending.pop_front() {
                if self.yielded_any && self.waiting_time > 0.0 {
                    std::thread::sleep(Duration::from_secs_f64(self.waiting_time));
                }
                self.yielded_any = true;
                return Some(Ok(batch));
            }

            match self.load_next_file() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(e) => {
                    self.exhausted_by_error = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{Cutoff, FilterType};
    use std::io::Write;
    use tempfile::tempdir;

    fn write_raw_matrix(path: &Path, rows: u32, cols: u32, fill: f32) {
        let mut file = std::fs::File::create(path).expect("create file");
        file.write_all(&rows.to_le_bytes()).expect("write rows");
        file.write_all(&cols.to_le_bytes()).expect("write cols");
        for _ in 0..(rows * cols) {
            file.write_all(&fill.to_le_bytes()).expect("write sample");
        }
    }

    #[test]
    fn test_closest_divisor_exact_match() {
        assert_eq!(closest_divisor(100, 20), 20);
    }

    #[test]
    fn test_raw_reader_round_trips_shape() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("a.bin");
        write_raw_matrix(&path, 10, 3, 1.5);
        let matrix = RawF32MatrixReader.read(&path).expect("read");
        assert_eq!(matrix.dim(), (10, 3));
        assert!((matrix[(0, 0)] - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_batch_source_yields_fixed_width_batches() {
        let dir = tempdir().expect("tempdir");
        write_raw_matrix(&dir.path().join("a.bin"), 100, 2, 0.0);

        let signal = SignalConfig {
            n: 1,
            f_order: 2,
            wn: Cutoff::Single(0.4),
            btype: FilterType::Lowpass,
            fs: 100.0,
        };
        let config = BatchSourceConfig {
            max_files: 4,
            waiting_time: 0.0,
            target_batch_seconds: 0.2,
        };

        let source = BatchSource::new(dir.path(), RawF32MatrixReader, signal, &config).expect("build source");
        let batches: Vec<_> = source.collect::<Result<Vec<_>>>().expect("no source errors");
        assert!(!batches.is_empty());
        let width = batches[0].nrows();
        assert!(batches.iter().all(|b| b.nrows() == width));
        assert_eq!(batches.iter().map(ndarray::Array2::nrows).sum::<usize>(), 100);
    }

    #[test]
    fn test_batch_source_respects_max_files() {
        let dir = tempdir().expect("tempdir");
        for i in 0..5 {
            write_raw_matrix(&dir.path().join(format!("f{i}.bin")), 10, 2, 0.0);
        }
        let signal = SignalConfig {
            n: 1,
            f_order: 2,
            wn: Cutoff::Single(0.4),
            btype: FilterType::Lowpass,
            fs: 100.0,
        };
        let config = BatchSourceConfig {
            max_files: 2,
            waiting_time: 0.0,
            target_batch_seconds: 0.1,
        };
        let source = BatchSource::new(dir.path(), RawF32MatrixReader, signal, &config).expect("build source");
        assert_eq!(source.files.len(), 2);
    }
}
