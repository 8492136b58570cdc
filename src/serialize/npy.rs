//! Minimal NPY v1.0 encoder/decoder for a 2-D `<f2` (little-endian
//! float16) array.
//!
//! No crate in the pack offers an NPY codec, so this is hand-rolled
//! against the documented format: an 8-byte magic+version prefix, a
//! little-endian `u16` header length, an ASCII Python-dict-literal header
//! padded to a 64-byte boundary and newline-terminated, then raw
//! row-major sample bytes.

use crate::error::Error;
use half::f16;
use ndarray::Array2;
use std::io::{Read, Write};
use std::path::Path;

const MAGIC: &[u8; 6] = b"\x93NUMPY";

pub(super) fn write_f16<W: Write>(writer: &mut W, data: &Array2<f64>) -> std::io::Result<()> {
    let (rows, cols) = data.dim();
    let mut header = format!("{{'descr': '<f2', 'fortran_order': False, 'shape': ({rows}, {cols}), }}");

    // Magic (6) + version (2) + header-length field (2) + header + '\n' must
    // land on a 64-byte boundary, matching NumPy's own writer.
    let prefix_len = 6 + 2 + 2;
    let unpadded_total = prefix_len + header.len() + 1;
    let padded_total = unpadded_total.div_ceil(64) * 64;
    header.extend(std::iter::repeat_n(' ', padded_total - unpadded_total));
    header.push('\n');

    writer.write_all(MAGIC)?;
    writer.write_all(&[1u8, 0u8])?;
    writer.write_all(&(header.len() as u16).to_le_bytes())?;
    writer.write_all(header.as_bytes())?;

    let standard = data.as_standard_layout();
    for &value in standard.iter() {
        writer.write_all(&f16::from_f64(value).to_le_bytes())?;
    }
    Ok(())
}

pub(super) fn read_f16<R: Read>(reader: &mut R, path: &Path) -> crate::error::Result<Array2<f64>> {
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic).map_err(|e| Error::FragmentDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if &magic != MAGIC {
        return Err(Error::FragmentDecode {
            path: path.to_path_buf(),
            message: "missing NPY magic prefix".to_string(),
        });
    }

    let mut version = [0u8; 2];
    reader.read_exact(&mut version).map_err(|e| Error::FragmentDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut len_bytes = [0u8; 2];
    reader.read_exact(&mut len_bytes).map_err(|e| Error::FragmentDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let header_len = u16::from_le_bytes(len_bytes) as usize;

    let mut header_bytes = vec![0u8; header_len];
    reader.read_exact(&mut header_bytes).map_err(|e| Error::FragmentDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let header = String::from_utf8_lossy(&header_bytes);
    let (rows, cols) = parse_shape(&header).ok_or_else(|| Error::FragmentDecode {
        path: path.to_path_buf(),
        message: format!("could not parse NPY shape from header: {header}"),
    })?;

    let mut raw = vec![0u8; rows * cols * 2];
    reader.read_exact(&mut raw).map_err(|e| Error::FragmentDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let values: Vec<f64> = raw
        .chunks_exact(2)
        .map(|chunk| f64::from(f16::from_le_bytes([chunk[0], chunk[1]])))
        .collect();
    Array2::from_shape_vec((rows, cols), values).map_err(|e| Error::FragmentDecode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Extract `(rows, cols)` from a `'shape': (rows, cols)` fragment of an NPY
/// header dict literal.
fn parse_shape(header: &str) -> Option<(usize, usize)> {
    let marker = "'shape':";
    let start = header.find(marker)? + marker.len();
    let open = header[start..].find('(')? + start + 1;
    let close = header[open..].find(')')? + open;
    let inner = &header[open..close];
    let mut parts = inner.split(',').map(str::trim).filter(|s| !s.is_empty());
    let rows: usize = parts.next()?.parse().ok()?;
    let cols: usize = parts.next()?.parse().ok()?;
    Some((rows, cols))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_round_trips_shape_and_values() {
        let data = Array2::from_shape_fn((5, 3), |(r, c)| (r * 3 + c) as f64 * 0.25);
        let mut buf = Vec::new();
        write_f16(&mut buf, &data).expect("write");

        let decoded = read_f16(&mut buf.as_slice(), Path::new("test.npy")).expect("read");
        assert_eq!(decoded.dim(), (5, 3));
        for (a, b) in decoded.iter().zip(data.iter()) {
            assert!((a - b).abs() < 1e-2);
        }
    }

    #[test]
    fn test_header_is_padded_to_64_byte_boundary() {
        let data = Array2::<f64>::zeros((2, 2));
        let mut buf = Vec::new();
        write_f16(&mut buf, &data).expect("write");
        let header_len = u16::from_le_bytes([buf[8], buf[9]]) as usize;
        assert_eq!((10 + header_len) % 64, 0);
    }

    #[test]
    fn test_parse_shape_handles_spacing() {
        let header = "{'descr': '<f2', 'fortran_order': False, 'shape': (12, 34), }";
        assert_eq!(parse_shape(header), Some((12, 34)));
    }
}
