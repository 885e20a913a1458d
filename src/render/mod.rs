//! Output sinks: SVG outlines, STL solids, preview PNGs and the JSON report.
//!
//! Sinks take already-computed geometry; file names come from the name
//! template in [`naming`].

pub mod naming;
mod png;
mod report;
mod stl;
mod svg;

pub use png::{render_combined, render_layer, write_png};
pub use report::{LayerReport, Outcome, RunReport};
pub use stl::{header as stl_header, write_stl, write_stl_to};
pub use svg::{render_svg, write_svg};
