//! Palette command: suggest reference colours for an image.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::error::{CamoError, Result};
use crate::output::{display_path, plural, Printer};
use crate::pipeline::discover::discover_palette;
use crate::pipeline::make_rng;
use crate::types::Palette;

/// Suggest a palette for an image
#[derive(Args, Debug)]
pub struct PaletteArgs {
    /// Image to sample
    #[arg(required = true)]
    pub file: PathBuf,

    /// Maximum number of layers to group colours into
    #[arg(long, default_value = "3")]
    pub max: usize,

    /// Seed for colour clustering
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Serialize)]
struct PaletteBlock<'a> {
    palette: &'a Palette,
}

/// The palette as a `palette:` block ready to paste into camo.yaml.
pub fn palette_yaml(palette: &Palette) -> Result<String> {
    serde_yaml::to_string(&PaletteBlock { palette }).map_err(|e| CamoError::Parse {
        message: format!("Failed to serialize palette: {}", e),
        help: None,
    })
}

pub fn run(args: PaletteArgs, printer: &Printer) -> Result<()> {
    let image = crate::cli::open_image(&args.file)?;
    let mut rng = make_rng(args.seed);
    let palette = discover_palette(&image, args.max, &mut rng)?;

    let groups = palette.layer_groups();
    printer.status(
        "Sampled",
        &format!(
            "{} in {} from {}",
            plural(palette.len(), "colour", "colours"),
            plural(groups.len(), "layer", "layers"),
            display_path(&args.file)
        ),
    );
    for (layer, indices) in &groups {
        let swatches: Vec<String> = indices
            .iter()
            .map(|&i| {
                let colour = palette.entries()[i].colour;
                printer.swatch(colour.to_rgb(), &colour.to_string())
            })
            .collect();
        printer.info(&format!("Layer {}", layer), &swatches.join(" "));
    }

    print!("{}", palette_yaml(&palette)?);
    Ok(())
}
