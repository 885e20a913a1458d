//! Core domain types for camo.
//!
//! This module contains the fundamental types used throughout the pipeline:
//! - `Colour` - RGB colour values
//! - `Palette` - Reference colours with layer assignments
//! - `LabelGrid` / `LayerMask` - Raster intermediates
//! - `LayerOutline` - Vector polygons for one layer
//! - `Solid` - Extruded triangle meshes

mod colour;
mod mask;
mod outline;
mod palette;
mod solid;

pub use colour::Colour;
pub use mask::{count_on, LabelGrid, LayerMask, ON};
pub use outline::{open_ring, LayerOutline};
pub use palette::{Palette, PaletteEntry};
pub use solid::Solid;
