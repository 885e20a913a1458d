//! camo - Turn photographs into flat-colour layers
//!
//! A library for splitting an image into a small set of colour layers and
//! exporting each layer as vector outlines, stencil plates or relief solids.

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod types;

pub use config::{ExportConfig, ProcessConfig, ProjectFile, Unit};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{CamoError, Result};
pub use pipeline::{
    build_solids, extract_outlines, process, CancelToken, LayerOutcome, LayerSolid,
    ProcessedImage, Progress, RunContext, RunInput, RunLock, StageOutput,
};
pub use render::{render_svg, write_stl, write_svg, RunReport};
pub use types::{Colour, LabelGrid, LayerMask, LayerOutline, Palette, PaletteEntry, Solid};
