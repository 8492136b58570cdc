//! Chunk serializer (component E): write one [`Chunk`] as a self-describing
//! JSON fragment or a compact header+NPY binary fragment, and read either
//! format back.

mod npy;

use crate::config::types::{BufferManagerConfig, SerializerConfig, SignalConfig};
use crate::error::{Error, Result};
use crate::model::Chunk;
use base64::Engine as _;
use chrono::{DateTime, Datelike, Timelike, Utc};
use half::f16;
use ndarray::Array2;
use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The `info` object shared by both fragment formats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentInfo {
    /// Name of the sensor/interrogator that produced the underlying signal.
    pub sensor_name: String,
    /// Capture identity, shared by every fragment of one capture.
    pub uuid: Uuid,
    /// Effective sampling rate (Hz) after preprocessing, rounded to an integer.
    pub sampling_rate: u64,
    /// Spatial resolution (meters per column), rounded to an integer.
    pub spatial_resolution: u64,
    /// Row count of this fragment's matrix.
    pub temporal_samples: usize,
    /// Column count of this fragment's matrix.
    pub spatial_samples: usize,
    /// Wall-clock Unix timestamp of the capture's first buffered batch.
    pub initial_timestamp: f64,
    /// Section identifier this fragment belongs to.
    #[serde(rename = "zone_ID")]
    pub zone_id: String,
    /// Zero-based index of this fragment within its capture.
    pub file_chunk: u32,
    /// Total fragment count for the capture, when known at write time.
    pub total_chunks: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonDocument {
    info: FragmentInfo,
    strain: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BinaryHeader {
    info: FragmentInfo,
}

/// Writes chunks to durable storage in one of two formats. Holds the
/// per-run constants (sensor name, sampling rate, spatial resolution) that
/// populate every fragment's header.
pub struct ChunkSerializer {
    output_root: PathBuf,
    binary: bool,
    sensor_name: String,
    sampling_rate: u64,
    spatial_resolution: u64,
}

impl ChunkSerializer {
    /// Build a serializer from the run's static configuration.
    #[must_use]
    pub fn new(config: &SerializerConfig, signal: &SignalConfig, buffer: &BufferManagerConfig) -> Self {
        Self {
            output_root: config.output_root.clone(),
            binary: config.binary,
            sensor_name: config.sensor_name.clone(),
            sampling_rate: signal.fs.round() as u64,
            spatial_resolution: buffer.spatial_resolution.round() as u64,
        }
    }

    /// Write one chunk as one fragment, returning the path written.
    pub fn write(&self, chunk: &Chunk, total_chunks: Option<u32>) -> Result<PathBuf> {
        let info = FragmentInfo {
            sensor_name: self.sensor_name.clone(),
            uuid: chunk.uuid,
            sampling_rate: self.sampling_rate,
            spatial_resolution: self.spatial_resolution,
            temporal_samples: chunk.data.nrows(),
            spatial_samples: chunk.data.ncols(),
            initial_timestamp: chunk.initial_timestamp,
            zone_id: chunk.section_id.clone(),
            file_chunk: chunk.file_chunk_index,
            total_chunks,
        };

        let path = fragment_path(&self.output_root, chunk, self.binary)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| Error::OutputDirCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        if self.binary {
            write_binary_fragment(&path, &info, &chunk.data)?;
        } else {
            write_json_fragment(&path, &info, &chunk.data)?;
        }

        Ok(path)
    }
}

fn fragment_path(output_root: &Path, chunk: &Chunk, binary: bool) -> Result<PathBuf> {
    let secs = chunk.initial_timestamp.floor() as i64;
    let nanos = (chunk.initial_timestamp.fract().max(0.0) * 1e9) as u32;
    let timestamp: DateTime<Utc> = DateTime::from_timestamp(secs, nanos).ok_or_else(|| Error::FragmentEncode {
        source: serde::de::Error::custom("initial_timestamp is out of range for a Unix timestamp"),
    })?;

    let ext = if binary { "bin" } else { "json" };
    let filename = format!(
        "{:02}_{:02}_{:02}_{}_part_{:02}.{ext}",
        timestamp.hour(),
        timestamp.minute(),
        timestamp.second(),
        chunk.section_id,
        chunk.file_chunk_index,
    );

    Ok(output_root
        .join(timestamp.year().to_string())
        .join(format!("{:02}", timestamp.month()))
        .join(format!("{:02}", timestamp.day()))
        .join(filename))
}

fn matrix_to_f16_bytes(data: &Array2<f64>) -> Vec<u8> {
    let standard = data.as_standard_layout();
    let mut bytes = Vec::with_capacity(standard.len() * 2);
    for &value in standard.iter() {
        bytes.extend_from_slice(&f16::from_f64(value).to_le_bytes());
    }
    bytes
}

fn write_json_fragment(path: &Path, info: &FragmentInfo, data: &Array2<f64>) -> Result<()> {
    let strain = base64::engine::general_purpose::STANDARD.encode(matrix_to_f16_bytes(data));
    let document = JsonDocument {
        info: info.clone(),
        strain: Some(strain),
    };
    let bytes = serde_json::to_vec(&document).map_err(|source| Error::FragmentEncode { source })?;
    std::fs::write(path, bytes).map_err(|source| Error::FragmentWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn write_binary_fragment(path: &Path, info: &FragmentInfo, data: &Array2<f64>) -> Result<()> {
    let header = BinaryHeader { info: info.clone() };
    let header_bytes = serde_json::to_vec(&header).map_err(|source| Error::FragmentEncode { source })?;
    let header_len: u16 = header_bytes.len().try_into().map_err(|_| Error::FragmentDecode {
        path: path.to_path_buf(),
        message: "fragment header exceeds the 65535-byte u16 length field".to_string(),
    })?;

    let mut file = std::fs::File::create(path).map_err(|source| Error::FragmentWrite {
        path: path.to_path_buf(),
        source,
    })?;
    let write_all = |file: &mut std::fs::File| -> std::io::Result<()> {
        file.write_all(&header_len.to_le_bytes())?;
        file.write_all(&header_bytes)?;
        npy::write_f16(file, data)
    };
    write_all(&mut file).map_err(|source| Error::FragmentWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// One fragment decoded from disk, reunited with its header.
#[derive(Debug, Clone)]
pub struct DecodedFragment {
    /// The fragment's header.
    pub info: FragmentInfo,
    /// The decoded matrix, cast back up from float16.
    pub data: Array2<f64>,
}

/// Read back either fragment format, selecting by file extension.
pub fn read_fragment(path: &Path) -> Result<DecodedFragment> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("bin") => read_binary_fragment(path),
        Some("json") => read_json_fragment(path),
        _ => Err(Error::FragmentDecode {
            path: path.to_path_buf(),
            message: "unrecognized fragment extension, expected .json or .bin".to_string(),
        }),
    }
}

fn read_json_fragment(path: &Path) -> Result<DecodedFragment> {
    let bytes = std::fs::read(path)?;
    let document: JsonDocument = serde_json::from_slice(&bytes).map_err(|e| Error::FragmentDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let strain = document.strain.ok_or_else(|| Error::FragmentDecode {
        path: path.to_path_buf(),
        message: "JSON fragment is missing its strain field".to_string(),
    })?;
    let raw = base64::engine::general_purpose::STANDARD
        .decode(strain)
        .map_err(|e| Error::FragmentDecode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    let data = f16_bytes_to_matrix(&raw, document.info.temporal_samples, document.info.spatial_samples, path)?;
    Ok(DecodedFragment { info: document.info, data })
}

fn read_binary_fragment(path: &Path) -> Result<DecodedFragment> {
    let mut file = std::fs::File::open(path)?;
    let mut len_bytes = [0u8; 2];
    file.read_exact(&mut len_bytes).map_err(|e| Error::FragmentDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let header_len = u16::from_le_bytes(len_bytes) as usize;

    let mut header_bytes = vec![0u8; header_len];
    file.read_exact(&mut header_bytes).map_err(|e| Error::FragmentDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let header: BinaryHeader = serde_json::from_slice(&header_bytes).map_err(|e| Error::FragmentDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let data = npy::read_f16(&mut file, path)?;
    Ok(DecodedFragment { info: header.info, data })
}

fn f16_bytes_to_matrix(raw: &[u8], rows: usize, cols: usize, path: &Path) -> Result<Array2<f64>> {
    if raw.len() != rows * cols * 2 {
        return Err(Error::FragmentDecode {
            path: path.to_path_buf(),
            message: format!("expected {} bytes of strain data, found {}", rows * cols * 2, raw.len()),
        });
    }
    let values: Vec<f64> = raw
        .chunks_exact(2)
        .map(|chunk| f64::from(f16::from_le_bytes([chunk[0], chunk[1]])))
        .collect();
    Array2::from_shape_vec((rows, cols), values).map_err(|e| Error::FragmentDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_chunk() -> Chunk {
        Chunk {
            section_id: "S01".to_string(),
            uuid: Uuid::new_v4(),
            file_chunk_index: 0,
            initial_timestamp: 1_724_313_254.0,
            complete: true,
            data: Array2::from_shape_fn((3, 4), |(r, c)| (r * 4 + c) as f64 * 0.5),
        }
    }

    fn serializer(output_root: PathBuf, binary: bool) -> ChunkSerializer {
        ChunkSerializer {
            output_root,
            binary,
            sensor_name: "DAS_TEST".to_string(),
            sampling_rate: 1000,
            spatial_resolution: 5,
        }
    }

    #[test]
    fn test_json_round_trip_matches_within_f16_precision() {
        let dir = tempdir().expect("tempdir");
        let chunk = sample_chunk();
        let path = serializer(dir.path().to_path_buf(), false).write(&chunk, None).expect("write");

        let decoded = read_fragment(&path).expect("read");
        assert_eq!(decoded.info.uuid, chunk.uuid);
        assert_eq!(decoded.data.dim(), chunk.data.dim());
        for (a, b) in decoded.data.iter().zip(chunk.data.iter()) {
            assert!((a - b).abs() < 1e-2);
        }
    }

    #[test]
    fn test_binary_round_trip_matches_within_f16_precision() {
        let dir = tempdir().expect("tempdir");
        let chunk = sample_chunk();
        let path = serializer(dir.path().to_path_buf(), true).write(&chunk, None).expect("write");

        let decoded = read_fragment(&path).expect("read");
        assert_eq!(decoded.info.zone_id, "S01");
        for (a, b) in decoded.data.iter().zip(chunk.data.iter()) {
            assert!((a - b).abs() < 1e-2);
        }
    }

    #[test]
    fn test_json_and_binary_decode_to_equal_matrices() {
        let dir = tempdir().expect("tempdir");
        let chunk = sample_chunk();
        let json_path = serializer(dir.path().to_path_buf(), false).write(&chunk, None).expect("write json");
        let bin_path = serializer(dir.path().to_path_buf(), true).write(&chunk, None).expect("write bin");

        let json_decoded = read_fragment(&json_path).expect("read json");
        let bin_decoded = read_fragment(&bin_path).expect("read bin");
        assert_eq!(json_decoded.data, bin_decoded.data);
    }

    #[test]
    fn test_fragment_path_uses_date_derived_directories() {
        let dir = tempdir().expect("tempdir");
        let chunk = sample_chunk();
        let path = serializer(dir.path().to_path_buf(), false).write(&chunk, None).expect("write");
        assert!(path.starts_with(dir.path()));
        assert!(path.to_string_lossy().contains("S01_part_00.json"));
    }
}
