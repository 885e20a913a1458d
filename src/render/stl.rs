//! Binary STL output.
//!
//! Layout: 80-byte header, little-endian u32 triangle count, then per
//! triangle a normal, three vertices (f32 × 3 each) and a zero u16.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::Unit;
use crate::error::{CamoError, Result};
use crate::types::Solid;

const HEADER_LEN: usize = 80;

/// Header text for a layer solid, truncated to fit.
pub fn header(layer: u32, unit: Unit) -> [u8; HEADER_LEN] {
    let text = format!("camo layer {} units={}", layer, unit);
    let mut header = [b' '; HEADER_LEN];
    let bytes = text.as_bytes();
    let n = bytes.len().min(HEADER_LEN);
    header[..n].copy_from_slice(&bytes[..n]);
    header
}

/// Write `solid` as binary STL.
pub fn write_stl_to<W: Write>(out: &mut W, solid: &Solid, header: &[u8; HEADER_LEN]) -> std::io::Result<()> {
    out.write_all(header)?;
    out.write_all(&(solid.faces.len() as u32).to_le_bytes())?;

    for face in &solid.faces {
        for value in solid.face_normal(face) {
            out.write_all(&(value as f32).to_le_bytes())?;
        }
        for &index in face {
            for value in solid.vertices[index as usize] {
                out.write_all(&(value as f32).to_le_bytes())?;
            }
        }
        out.write_all(&0u16.to_le_bytes())?;
    }
    Ok(())
}

/// Write a layer solid to `path`.
pub fn write_stl(solid: &Solid, layer: u32, unit: Unit, path: &Path) -> Result<()> {
    let io_error = |e: std::io::Error| CamoError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to write STL: {}", e),
    };
    let file = File::create(path).map_err(io_error)?;
    let mut out = BufWriter::new(file);
    write_stl_to(&mut out, solid, &header(layer, unit)).map_err(io_error)?;
    out.flush().map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn triangle() -> Solid {
        Solid {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            faces: vec![[0, 1, 2]],
        }
    }

    fn f32_at(bytes: &[u8], offset: usize) -> f32 {
        f32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn test_binary_layout() {
        let mut bytes = Vec::new();
        write_stl_to(&mut bytes, &triangle(), &header(2, Unit::Mm)).unwrap();

        assert_eq!(bytes.len(), 80 + 4 + 50);
        assert!(bytes.starts_with(b"camo layer 2 units=mm"));
        assert_eq!(u32::from_le_bytes(bytes[80..84].try_into().unwrap()), 1);
        // Normal points up for a counter-clockwise triangle
        assert_eq!(f32_at(&bytes, 84 + 8), 1.0);
        // Second vertex x
        assert_eq!(f32_at(&bytes, 84 + 24), 1.0);
    }

    #[test]
    fn test_header_is_padded() {
        let h = header(1, Unit::In);
        assert_eq!(h.len(), 80);
        assert_eq!(h[79], b' ');
    }

    #[test]
    fn test_write_stl_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("layer.stl");
        write_stl(&triangle(), 1, Unit::Mm, &path).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 134);
    }
}
