pub mod build;
pub mod completions;
pub mod init;
pub mod palette;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use image::RgbImage;
use log::LevelFilter;

use crate::config::{ProjectFile, PROJECT_FILENAME};
use crate::error::{CamoError, Result};

/// camo - Turn photos into flat-colour stencil layers
#[derive(Parser, Debug)]
#[command(name = "camo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log level selected by `-v` / `-q`.
    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Error
        } else {
            LevelFilter::Warn
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Split images into layers and export outlines and solids
    Build(build::BuildArgs),

    /// Suggest a palette for an image
    Palette(palette::PaletteArgs),

    /// Create a camo.yaml project file
    Init(init::InitArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Load the project file at `path`, or `camo.yaml` in the current directory
/// if present, or defaults.
pub fn load_project(path: Option<&Path>) -> Result<ProjectFile> {
    let project = match path {
        Some(path) => ProjectFile::load(path)?,
        None => {
            let default = PathBuf::from(PROJECT_FILENAME);
            if default.exists() {
                ProjectFile::load(&default)?
            } else {
                ProjectFile::default()
            }
        }
    };
    project.validate()?;
    Ok(project)
}

/// Decode an image file to RGB.
pub fn open_image(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|e| CamoError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to open image: {}", e),
    })?;
    Ok(img.to_rgb8())
}
