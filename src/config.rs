//! Project configuration (camo.yaml) parsing.
//!
//! The project file holds processing settings, 3D export settings, the
//! output file name template and the palette. Everything a run needs is
//! copied out of here into plain values before the run starts.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CamoError, Result};
use crate::types::Palette;

/// Default project file name.
pub const PROJECT_FILENAME: &str = "camo.yaml";

/// Default output file name template.
pub const DEFAULT_TEMPLATE: &str = "%INPUTFILENAME%-%COLOR%-%INDEX%";

/// Settings for turning pixels into layer masks and outlines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessConfig {
    /// Cluster count in auto mode.
    pub max_colors: usize,
    /// Images wider than this are downscaled before processing.
    pub max_width: u32,
    /// Blur/morphology kernel size in pixels; 0 disables both.
    pub denoise: u32,
    /// Connected components smaller than this many pixels are dropped.
    pub min_blob: usize,
    /// Contour simplification tolerance as a fraction of ring perimeter.
    pub smoothing: f64,
    /// Give uncovered area its own layer.
    pub orphans: bool,
    /// Seed for clustering and orphan colour search. Random when unset.
    pub seed: Option<u64>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            max_colors: 3,
            max_width: 4096,
            denoise: 3,
            min_blob: 100,
            smoothing: 0.0001,
            orphans: false,
            seed: None,
        }
    }
}

impl ProcessConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_colors == 0 {
            return Err(CamoError::config(
                "process.max_colors must be at least 1",
                "Set max_colors to the number of layers auto mode should find",
            ));
        }
        if self.max_width == 0 {
            return Err(CamoError::config(
                "process.max_width must be at least 1",
                "Use a large value such as 4096 to keep full resolution",
            ));
        }
        if !self.smoothing.is_finite() || !(0.0..1.0).contains(&self.smoothing) {
            return Err(CamoError::config(
                format!("process.smoothing = {} is outside [0, 1)", self.smoothing),
                "Typical values are between 0.0001 and 0.005",
            ));
        }
        Ok(())
    }
}

/// Physical unit for 3D output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Mm,
    In,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Mm => write!(f, "mm"),
            Unit::In => write!(f, "in"),
        }
    }
}

impl FromStr for Unit {
    type Err = CamoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mm" | "millimeters" | "millimetres" => Ok(Unit::Mm),
            "in" | "inch" | "inches" => Ok(Unit::In),
            _ => Err(CamoError::Parse {
                message: format!("Unknown unit: {}", s),
                help: Some("Use 'mm' or 'in'".to_string()),
            }),
        }
    }
}

/// Settings for 3D solids. Lengths are in `unit`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub unit: Unit,
    /// Physical width the image maps onto.
    pub width: f64,
    /// Extrusion height.
    pub height: f64,
    /// Frame width around the image area.
    pub border: f64,
    /// Width of stencil bridges; 0 disables bridging.
    pub bridge: f64,
    /// Cut blobs out of a plate instead of raising them.
    pub stencil: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            unit: Unit::Mm,
            width: 100.0,
            height: 2.0,
            border: 5.0,
            bridge: 2.0,
            stencil: true,
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("border", self.border),
            ("bridge", self.bridge),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CamoError::config(
                    format!("export.{} = {} must be a non-negative number", name, value),
                    format!("Set export.{} in {}", name, self.unit),
                ));
            }
        }
        if self.width == 0.0 {
            return Err(CamoError::config(
                "export.width must be greater than 0",
                "The image is scaled so its width matches export.width",
            ));
        }
        if self.height == 0.0 {
            return Err(CamoError::config(
                "export.height must be greater than 0",
                "Solids need a non-zero extrusion height",
            ));
        }
        Ok(())
    }
}

/// Project file loaded from camo.yaml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectFile {
    pub process: ProcessConfig,
    pub export: ExportConfig,
    /// Output file name template.
    pub template: String,
    /// Output directory for exported files.
    pub output: PathBuf,
    /// Reference colours; empty selects auto mode.
    pub palette: Palette,
}

fn default_output() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for ProjectFile {
    fn default() -> Self {
        Self {
            process: ProcessConfig::default(),
            export: ExportConfig::default(),
            template: DEFAULT_TEMPLATE.to_string(),
            output: default_output(),
            palette: Palette::new(),
        }
    }
}

impl ProjectFile {
    /// Load a project file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CamoError::Io {
            path: path.to_path_buf(),
            message: format!("Failed to read project file: {}", e),
        })?;

        Self::parse(&content)
    }

    /// Parse a project file from a YAML string.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| CamoError::Parse {
            message: format!("Invalid project file: {}", e),
            help: Some(format!("Check {} syntax", PROJECT_FILENAME)),
        })
    }

    /// Serialize back to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| CamoError::Parse {
            message: format!("Failed to serialize project file: {}", e),
            help: None,
        })
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.process.validate()?;
        self.export.validate()?;
        self.palette.validate()?;
        if self.template.trim().is_empty() {
            return Err(CamoError::config(
                "template must not be empty",
                format!("The default is {}", DEFAULT_TEMPLATE),
            ));
        }
        Ok(())
    }
}
