//! Build command implementation.
//!
//! Runs the pipeline on each input image and writes the selected outputs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};

use clap::Args;
use walkdir::WalkDir;

use crate::config::{ProjectFile, Unit};
use crate::diagnostics::Diagnostics;
use crate::error::{CamoError, Result};
use crate::output::{display_path, plural, Printer};
use crate::pipeline::{
    build_solids, extract_outlines, process, CancelToken, LayerSolid, Progress, RunContext,
    RunInput, RunLock,
};
use crate::render::{self, naming, LayerReport, Outcome, RunReport};
use crate::types::LayerOutline;

/// Image extensions picked up when walking directories.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// Split images into layers and export outlines and solids
#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Image files or directories to process
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Project file (default: ./camo.yaml when present)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Output directory
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Write SVG outlines (default when no format is chosen)
    #[arg(long)]
    pub svg: bool,

    /// Write STL solids
    #[arg(long)]
    pub stl: bool,

    /// Cut layers out of a plate
    #[arg(long, conflicts_with = "relief")]
    pub stencil: bool,

    /// Extrude layers as raised shapes
    #[arg(long)]
    pub relief: bool,

    /// Write preview PNGs
    #[arg(long)]
    pub previews: bool,

    /// Write a JSON report per image
    #[arg(long)]
    pub report: bool,

    /// Seed for clustering and orphan colours
    #[arg(long)]
    pub seed: Option<u64>,

    /// Colour count in auto mode
    #[arg(long)]
    pub max_colors: Option<usize>,

    /// Downscale images wider than this
    #[arg(long)]
    pub max_width: Option<u32>,

    /// Blur and morphology kernel size (0 disables)
    #[arg(long)]
    pub denoise: Option<u32>,

    /// Minimum blob area in pixels
    #[arg(long)]
    pub min_blob: Option<usize>,

    /// Outline simplification as a fraction of ring perimeter
    #[arg(long)]
    pub smoothing: Option<f64>,

    /// Add a layer for uncovered area
    #[arg(long)]
    pub orphans: bool,

    /// Unit for 3D output (mm or in)
    #[arg(long)]
    pub unit: Option<Unit>,

    /// Physical width of the image area
    #[arg(long)]
    pub width: Option<f64>,

    /// Extrusion height
    #[arg(long)]
    pub thickness: Option<f64>,

    /// Frame width around the image area
    #[arg(long)]
    pub border: Option<f64>,

    /// Stencil bridge width (0 disables)
    #[arg(long)]
    pub bridge: Option<f64>,

    /// Output file name template
    #[arg(long)]
    pub template: Option<String>,
}

impl BuildArgs {
    /// Apply command-line overrides on top of the project file.
    pub fn apply(&self, project: &mut ProjectFile) {
        let process = &mut project.process;
        if let Some(v) = self.seed {
            process.seed = Some(v);
        }
        if let Some(v) = self.max_colors {
            process.max_colors = v;
        }
        if let Some(v) = self.max_width {
            process.max_width = v;
        }
        if let Some(v) = self.denoise {
            process.denoise = v;
        }
        if let Some(v) = self.min_blob {
            process.min_blob = v;
        }
        if let Some(v) = self.smoothing {
            process.smoothing = v;
        }
        if self.orphans {
            process.orphans = true;
        }

        let export = &mut project.export;
        if let Some(v) = self.unit {
            export.unit = v;
        }
        if let Some(v) = self.width {
            export.width = v;
        }
        if let Some(v) = self.thickness {
            export.height = v;
        }
        if let Some(v) = self.border {
            export.border = v;
        }
        if let Some(v) = self.bridge {
            export.bridge = v;
        }
        if self.stencil {
            export.stencil = true;
        }
        if self.relief {
            export.stencil = false;
        }

        if let Some(t) = &self.template {
            project.template = t.clone();
        }
        if let Some(o) = &self.output {
            project.output = o.clone();
        }
    }
}

/// Prints progress in 25% steps at debug level.
struct LogProgress {
    last: AtomicU8,
}

impl Progress for LogProgress {
    fn report(&self, percent: u8) {
        let step = percent / 25 * 25;
        if self.last.fetch_max(step, Ordering::SeqCst) < step {
            log::debug!("progress {}%", step);
        }
    }
}

pub fn run(args: BuildArgs, printer: &Printer) -> Result<()> {
    let mut project = crate::cli::load_project(args.config.as_deref())?;
    args.apply(&mut project);
    project.validate()?;

    let images = collect_images(&args.inputs)?;
    if images.is_empty() {
        return Err(CamoError::Io {
            path: args.inputs.first().cloned().unwrap_or_default(),
            message: "no images found".to_string(),
        });
    }

    fs::create_dir_all(&project.output).map_err(|e| CamoError::Io {
        path: project.output.clone(),
        message: format!("Failed to create output directory: {}", e),
    })?;

    let mut written = 0;
    let mut warnings = 0;
    for image in &images {
        let summary = build_one(image, &project, &args, printer)?;
        written += summary.files;
        warnings += summary.warnings;
    }

    let mut message = format!(
        "{} from {} to {}",
        plural(written, "file", "files"),
        plural(images.len(), "image", "images"),
        display_path(&project.output)
    );
    if warnings > 0 {
        message.push_str(&format!(" ({})", plural(warnings, "warning", "warnings")));
    }
    printer.status("Finished", &message);
    Ok(())
}

struct Summary {
    files: usize,
    warnings: usize,
}

fn build_one(path: &Path, project: &ProjectFile, args: &BuildArgs, printer: &Printer) -> Result<Summary> {
    let _lock = RunLock::acquire(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()))?;
    printer.status("Processing", &display_path(path));

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image")
        .to_string();
    let out_dir = &project.output;
    let write_svg = args.svg || !args.stl;
    let export = project.export;

    let progress = LogProgress {
        last: AtomicU8::new(0),
    };
    let ctx = RunContext::new(CancelToken::new(), &progress);
    let input = RunInput::new(
        crate::cli::open_image(path)?,
        project.palette.clone(),
        project.process.clone(),
    );

    let processed = process(&input, &ctx)?;
    let stage = extract_outlines(&processed, project.process.smoothing, &ctx)?;
    let outlines: Vec<LayerOutline> = stage.done().cloned().collect();

    let mut diagnostics = Diagnostics::new();
    diagnostics.merge(processed.diagnostics.clone());
    diagnostics.merge(stage.diagnostics.clone());

    let mut files: Vec<(u32, PathBuf)> = Vec::new();

    if write_svg {
        for outline in &outlines {
            let name = naming::svg_name(&project.template, &stem, outline.colour, outline.index);
            let target = out_dir.join(name);
            render::write_svg(outline, processed.width, processed.height, &target)?;
            printer.info("Writing", &display_path(&target));
            files.push((outline.layer, target));
        }
    }

    let mut solids: Vec<LayerSolid> = Vec::new();
    if args.stl {
        let stage = build_solids(&outlines, processed.width, processed.height, &export, &ctx)?;
        diagnostics.merge(stage.diagnostics.clone());
        solids = stage.done().cloned().collect();
        for solid in &solids {
            let name = naming::stl_name(
                &project.template,
                &stem,
                solid.colour,
                solid.index,
                export.stencil,
            );
            let target = out_dir.join(name);
            render::write_stl(&solid.solid, solid.layer, export.unit, &target)?;
            printer.info(
                "Writing",
                &format!(
                    "{} ({})",
                    display_path(&target),
                    plural(solid.solid.triangle_count(), "triangle", "triangles")
                ),
            );
            files.push((solid.layer, target));
        }
    }

    if args.previews {
        let combined = out_dir.join(format!("{}-preview.png", stem));
        render::write_png(
            &render::render_combined(&processed.layers, processed.width, processed.height),
            &combined,
        )?;
        files.push((0, combined));
        for (i, layer) in processed.layers.iter().enumerate() {
            let name = naming::expand_template(&project.template, &stem, layer.colour, i + 1);
            let target = out_dir.join(format!("{}.png", name));
            render::write_png(&render::render_layer(layer), &target)?;
            files.push((layer.layer, target));
        }
    }

    for diagnostic in diagnostics.iter() {
        printer.diagnostic(diagnostic);
    }

    if args.report {
        let report = build_report(path, project, &processed, &outlines, &solids, &files, write_svg, diagnostics.clone());
        let target = out_dir.join(format!("{}-report.json", stem));
        report.write(&target)?;
        files.push((0, target));
    }

    for layer in &processed.layers {
        let label = format!("layer {} {}", layer.layer, if layer.orphan { "(orphan)" } else { "" });
        log::info!("{}", printer.swatch(layer.colour.to_rgb(), label.trim_end()));
    }

    Ok(Summary {
        files: files.len(),
        warnings: diagnostics.warning_count() + diagnostics.error_count(),
    })
}

#[allow(clippy::too_many_arguments)]
fn build_report(
    input: &Path,
    project: &ProjectFile,
    processed: &crate::pipeline::ProcessedImage,
    outlines: &[LayerOutline],
    solids: &[LayerSolid],
    files: &[(u32, PathBuf)],
    svg: bool,
    diagnostics: Diagnostics,
) -> RunReport {
    let layers = processed
        .layers
        .iter()
        .enumerate()
        .map(|(i, layer)| {
            let outline = outlines.iter().find(|o| o.layer == layer.layer);
            let exported =
                (svg && outline.is_some()) || solids.iter().any(|s| s.layer == layer.layer);
            LayerReport {
                layer: layer.layer,
                index: i + 1,
                colour: layer.colour,
                orphan: layer.orphan,
                pixels: layer.pixel_count(),
                polygons: outline.map_or(0, |o| o.polygons.len()),
                holes: outline.map_or(0, |o| o.hole_count()),
                outcome: if exported {
                    Outcome::Exported
                } else {
                    Outcome::Skipped
                },
                files: files
                    .iter()
                    .filter(|(id, _)| *id == layer.layer)
                    .map(|(_, p)| p.clone())
                    .collect(),
            }
        })
        .collect();

    RunReport {
        input: input.to_path_buf(),
        width: processed.width,
        height: processed.height,
        unit: project.export.unit,
        stencil: project.export.stencil,
        layers,
        diagnostics,
    }
}

/// Expand directories into the image files beneath them, sorted.
pub fn collect_images(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .map(|e| e.into_path())
                .filter(|p| p.is_file() && is_image(p))
                .collect();
            found.sort();
            images.extend(found);
        } else if input.is_file() {
            images.push(input.clone());
        } else {
            return Err(CamoError::Io {
                path: input.clone(),
                message: "No such file or directory".to_string(),
            });
        }
    }
    Ok(images)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_collect_images_walks_directories() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("shots");
        fs::create_dir(&nested).unwrap();
        for name in ["b.PNG", "a.jpg", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::write(nested.join("c.webp"), b"").unwrap();

        let images = collect_images(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<String> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "c.webp"]);
    }

    #[test]
    fn test_collect_images_missing_path() {
        assert!(collect_images(&[PathBuf::from("/definitely/not/here.png")]).is_err());
    }

    #[test]
    fn test_flags_override_project() {
        let mut project = ProjectFile::default();
        let args = BuildArgs {
            seed: Some(9),
            denoise: Some(0),
            relief: true,
            thickness: Some(1.5),
            output: Some(PathBuf::from("out")),
            ..Default::default()
        };
        args.apply(&mut project);

        assert_eq!(project.process.seed, Some(9));
        assert_eq!(project.process.denoise, 0);
        assert!(!project.export.stencil);
        assert_eq!(project.export.height, 1.5);
        assert_eq!(project.output, PathBuf::from("out"));
        assert_eq!(project.process.max_colors, 3);
    }
}
