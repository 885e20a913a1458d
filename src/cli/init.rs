//! Init command implementation.
//!
//! Writes a `camo.yaml` project file with every setting at its default.

use std::fs;
use std::path::PathBuf;

use clap::Args;

use crate::config::{ProjectFile, PROJECT_FILENAME};
use crate::error::{CamoError, Result};
use crate::output::{display_path, Printer};

/// Create a camo.yaml project file
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project directory (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite an existing camo.yaml
    #[arg(long)]
    pub force: bool,
}

const HEADER: &str = "\
# camo project file
#
# An empty palette clusters each image into process.max_colors layers.
# List colours to assign layers yourself, for example:
#
# palette:
#   - colour: \"#556b2f\"
#     layer: 1
#
# `camo palette <image>` suggests a palette block.

";

pub fn run(args: InitArgs, printer: &Printer) -> Result<()> {
    let project_path = args.path.join(PROJECT_FILENAME);

    if project_path.exists() && !args.force {
        return Err(CamoError::config(
            format!("{} already exists", display_path(&project_path)),
            "Use --force to overwrite",
        ));
    }

    fs::create_dir_all(&args.path).map_err(|e| CamoError::Io {
        path: args.path.clone(),
        message: format!("Failed to create directory: {}", e),
    })?;

    let yaml = format!("{}{}", HEADER, ProjectFile::default().to_yaml()?);
    fs::write(&project_path, yaml).map_err(|e| CamoError::Io {
        path: project_path.clone(),
        message: format!("Failed to write {}: {}", PROJECT_FILENAME, e),
    })?;

    printer.status("Created", &display_path(&project_path));
    Ok(())
}
