//! SVG output for layer outlines.
//!
//! One `<path>` per polygon: the outer ring and its holes as sub-paths,
//! filled with the even-odd rule so holes stay open.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::{CamoError, Result};
use crate::types::{open_ring, LayerOutline};

/// Render a layer's outlines as an SVG document sized `width × height` px.
pub fn render_svg(outline: &LayerOutline, width: u32, height: u32) -> String {
    let mut out = String::new();
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    );

    for polygon in &outline.polygons {
        let mut d = String::new();
        sub_path(&mut d, &open_ring(polygon.exterior()));
        for hole in polygon.interiors() {
            d.push(' ');
            sub_path(&mut d, &open_ring(hole));
        }
        let _ = writeln!(
            out,
            r#"  <path d="{}" fill="{}" fill-rule="evenodd" stroke="none"/>"#,
            d, outline.colour
        );
    }

    out.push_str("</svg>\n");
    out
}

fn sub_path(d: &mut String, ring: &[[f64; 2]]) {
    for (i, [x, y]) in ring.iter().enumerate() {
        if i == 0 {
            let _ = write!(d, "M {},{}", x, y);
        } else {
            let _ = write!(d, " L {},{}", x, y);
        }
    }
    d.push_str(" Z");
}

/// Write a layer's SVG to `path`.
pub fn write_svg(outline: &LayerOutline, width: u32, height: u32, path: &Path) -> Result<()> {
    std::fs::write(path, render_svg(outline, width, height)).map_err(|e| CamoError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to write SVG: {}", e),
    })
}
