//! JSON run report.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Unit;
use crate::diagnostics::Diagnostics;
use crate::error::{CamoError, Result};
use crate::types::Colour;

/// What happened to one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Exported,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerReport {
    pub layer: u32,
    pub index: usize,
    pub colour: Colour,
    pub orphan: bool,
    pub pixels: usize,
    pub polygons: usize,
    pub holes: usize,
    pub outcome: Outcome,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input: PathBuf,
    pub width: u32,
    pub height: u32,
    pub unit: Unit,
    pub stencil: bool,
    pub layers: Vec<LayerReport>,
    pub diagnostics: Diagnostics,
}

impl RunReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CamoError::Parse {
            message: format!("Failed to serialize report: {}", e),
            help: None,
        })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?).map_err(|e| CamoError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to write report: {}", e),
        })
    }
}
