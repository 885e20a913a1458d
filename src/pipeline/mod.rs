//! The processing pipeline.
//!
//! A run is a pure function of an image, a palette and settings:
//!
//! 1. [`process`] - resize and blur, assign colours, build layer masks,
//!    optionally add an orphan layer
//! 2. [`extract_outlines`] - trace masks into polygons with holes
//! 3. [`build_solids`] - bridge (stencil mode) and extrude per layer
//!
//! Per-layer stages run on rayon's pool. A layer with no outline still flows
//! through to [`build_solids`], which gives it a bare plate or frame. A layer
//! whose solid cannot be built is reported as [`LayerOutcome::Skipped`] and
//! never aborts the rest of the run; run-level problems are returned as
//! [`CamoError`].

pub mod bridge;
pub mod classify;
pub mod contours;
pub mod discover;
pub mod kmeans;
pub mod masks;
pub mod mesh;
pub mod morphology;
pub mod orphans;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use image::imageops::FilterType;
use image::RgbImage;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::config::{ExportConfig, ProcessConfig};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{CamoError, Result};
use crate::types::{count_on, Colour, LayerMask, LayerOutline, Palette, Solid};

use masks::{Cleanup, LayerSpec};
use mesh::{MeshError, MeshParams};

/// Frozen inputs for one run.
#[derive(Debug, Clone)]
pub struct RunInput {
    pub image: RgbImage,
    pub palette: Palette,
    pub config: ProcessConfig,
}

impl RunInput {
    pub fn new(image: RgbImage, palette: Palette, config: ProcessConfig) -> Self {
        Self {
            image,
            palette,
            config,
        }
    }
}

/// Shared flag for stopping a run between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(CamoError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Receives run progress as a percentage.
pub trait Progress: Sync {
    fn report(&self, percent: u8);
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&self, _percent: u8) {}
}

/// Cancellation and progress for a run.
#[derive(Clone)]
pub struct RunContext<'a> {
    pub cancel: CancelToken,
    pub progress: &'a dyn Progress,
}

impl<'a> RunContext<'a> {
    pub fn new(cancel: CancelToken, progress: &'a dyn Progress) -> Self {
        Self { cancel, progress }
    }

    fn step(&self, percent: u8) -> Result<()> {
        self.cancel.check()?;
        self.progress.report(percent);
        Ok(())
    }
}

impl Default for RunContext<'static> {
    fn default() -> Self {
        Self {
            cancel: CancelToken::new(),
            progress: &NoProgress,
        }
    }
}

fn active_runs() -> &'static Mutex<HashSet<PathBuf>> {
    static ACTIVE: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    ACTIVE.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Holds the run slot for one image until dropped.
#[derive(Debug)]
pub struct RunLock {
    key: PathBuf,
}

impl RunLock {
    /// Claim the slot for `key`, or fail with `Busy` if a run holds it.
    pub fn acquire(key: impl Into<PathBuf>) -> Result<Self> {
        let key = key.into();
        let mut active = active_runs().lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(key.clone()) {
            return Err(CamoError::Busy(key.display().to_string()));
        }
        Ok(Self { key })
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let mut active = active_runs().lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.key);
    }
}

/// Seeded generator, or one seeded from the OS when `seed` is `None`.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Result of one layer in a per-layer stage.
#[derive(Debug, Clone)]
pub enum LayerOutcome<T> {
    Done(T),
    Skipped(Diagnostic),
}

impl<T> LayerOutcome<T> {
    pub fn done(&self) -> Option<&T> {
        match self {
            LayerOutcome::Done(value) => Some(value),
            LayerOutcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, LayerOutcome::Skipped(_))
    }
}

/// Per-layer outcomes in layer order plus every diagnostic raised, including
/// the ones attached to skipped layers.
#[derive(Debug, Clone)]
pub struct StageOutput<T> {
    pub outcomes: Vec<LayerOutcome<T>>,
    pub diagnostics: Diagnostics,
}

impl<T> StageOutput<T> {
    fn collect(results: Vec<(LayerOutcome<T>, Diagnostics)>) -> Self {
        let mut diagnostics = Diagnostics::new();
        let mut outcomes = Vec::with_capacity(results.len());
        for (outcome, extra) in results {
            diagnostics.merge(extra);
            if let LayerOutcome::Skipped(d) = &outcome {
                diagnostics.push(d.clone());
            }
            outcomes.push(outcome);
        }
        Self {
            outcomes,
            diagnostics,
        }
    }

    /// Successful layers in order.
    pub fn done(&self) -> impl Iterator<Item = &T> {
        self.outcomes.iter().filter_map(LayerOutcome::done)
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }
}

/// Layer masks for a processed image.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// Processing resolution, after any downscale.
    pub width: u32,
    pub height: u32,
    /// Layers in output order; an orphan layer comes last.
    pub layers: Vec<LayerMask>,
    pub diagnostics: Diagnostics,
}

/// Downscale to `max_width` and apply the pre-blur.
pub fn prepare_image(image: &RgbImage, config: &ProcessConfig) -> RgbImage {
    let (width, height) = image.dimensions();
    let mut prepared = if width > config.max_width && width > 0 {
        let new_height =
            ((height as u64 * config.max_width as u64) / width as u64).max(1) as u32;
        log::debug!("resizing {}x{} to {}x{}", width, height, config.max_width, new_height);
        image::imageops::resize(image, config.max_width, new_height, FilterType::Triangle)
    } else {
        image.clone()
    };

    if config.denoise > 0 && prepared.width() > 0 && prepared.height() > 0 {
        prepared = image::imageops::blur(&prepared, blur_sigma(config.denoise));
    }
    prepared
}

/// Gaussian sigma for an odd kernel grown from `denoise`.
pub fn blur_sigma(denoise: u32) -> f32 {
    let k = if denoise % 2 == 0 { denoise + 1 } else { denoise };
    0.3 * ((k as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Turn an image into per-layer masks.
///
/// An empty palette clusters the image into `max_colors` layers; otherwise
/// pixels go to their nearest palette colour and colours sharing a layer id
/// are merged.
pub fn process(input: &RunInput, ctx: &RunContext) -> Result<ProcessedImage> {
    let config = &input.config;
    config.validate()?;
    input.palette.validate()?;
    ctx.step(0)?;

    let image = prepare_image(&input.image, config);
    let (width, height) = image.dimensions();
    ctx.step(10)?;

    let mut rng = make_rng(config.seed);
    let mut diagnostics = Diagnostics::new();

    let (grid, specs): (_, Vec<LayerSpec>) = if input.palette.is_empty() {
        let auto = classify::assign_auto(&image, config.max_colors, &mut rng)?;
        diagnostics.merge(auto.diagnostics);
        let specs = masks::auto_specs(&auto.colours);
        (auto.grid, specs)
    } else {
        let colours = input.palette.colours();
        let grid = classify::assign_manual(&image, &colours)?;
        (grid, masks::manual_specs(&input.palette.layer_groups(), &colours))
    };
    ctx.step(25)?;

    let cleanup = Cleanup {
        kernel: config.denoise,
        min_blob: config.min_blob,
    };
    let mut layers = masks::build_masks(&grid, &specs, cleanup);
    ctx.step(40)?;

    if config.orphans {
        let mask = orphans::find_orphans(&layers, width, height, cleanup);
        let pixels = count_on(&mask);
        if pixels > 0 {
            let existing: Vec<Colour> = layers.iter().map(|l| l.colour).collect();
            let pick = orphans::pick_orphan_colour(&existing, &mut rng);
            let id = layers.iter().map(|l| l.layer).max().unwrap_or(0) + 1;
            if pick.fallback {
                log::warn!("no distinct orphan colour found; using {}", pick.colour);
                diagnostics.push(
                    Diagnostic::warning(
                        "camo::orphan::fallback-colour",
                        format!("orphan layer uses fallback colour {}", pick.colour),
                    )
                    .for_layer(id),
                );
            }
            log::debug!("orphan layer {}: {} px, {}", id, pixels, pick.colour);
            let mut orphan = LayerMask::new(id, pick.colour, mask);
            orphan.orphan = true;
            layers.push(orphan);
        }
    }
    ctx.step(50)?;

    Ok(ProcessedImage {
        width,
        height,
        layers,
        diagnostics,
    })
}

/// Trace every layer mask into outlines in pixel coordinates.
///
/// Every layer yields an outline. A layer that is empty after cleanup, or
/// whose rings all collapse below 3 points, gets an outline with no polygons
/// and a warning; exports still produce its blank SVG and its plate or frame.
pub fn extract_outlines(
    processed: &ProcessedImage,
    smoothing: f64,
    ctx: &RunContext,
) -> Result<StageOutput<LayerOutline>> {
    ctx.cancel.check()?;

    let results = processed
        .layers
        .par_iter()
        .enumerate()
        .map(|(i, layer)| {
            let mut diagnostics = Diagnostics::new();
            let polygons = if layer.is_empty() {
                diagnostics.push(
                    Diagnostic::warning(
                        "camo::layer::empty",
                        format!("layer {} has no pixels after cleanup", layer.layer),
                    )
                    .with_help("Lower process.min_blob or process.denoise")
                    .for_layer(layer.layer),
                );
                Vec::new()
            } else {
                let polygons = contours::trace_polygons(&layer.mask, smoothing);
                if polygons.is_empty() {
                    diagnostics.push(
                        Diagnostic::warning(
                            "camo::layer::degenerate",
                            format!("layer {} has no outline with 3 or more points", layer.layer),
                        )
                        .for_layer(layer.layer),
                    );
                }
                polygons
            };
            for d in diagnostics.iter() {
                log::warn!("{}", d.message);
            }
            let outline = LayerOutline {
                layer: layer.layer,
                index: i + 1,
                colour: layer.colour,
                polygons,
            };
            (LayerOutcome::Done(outline), diagnostics)
        })
        .collect();

    ctx.step(75)?;
    Ok(StageOutput::collect(results))
}

/// A layer's extruded solid.
#[derive(Debug, Clone)]
pub struct LayerSolid {
    pub layer: u32,
    pub index: usize,
    pub colour: Colour,
    pub solid: Solid,
    /// Holes opened by bridging.
    pub bridged: usize,
}

/// Bridge (stencil mode) and extrude each outline into a solid.
///
/// `width` and `height` are the processing resolution the outlines were
/// traced at.
pub fn build_solids(
    outlines: &[LayerOutline],
    width: u32,
    height: u32,
    export: &ExportConfig,
    ctx: &RunContext,
) -> Result<StageOutput<LayerSolid>> {
    export.validate()?;
    ctx.cancel.check()?;
    if width == 0 || height == 0 {
        return Err(CamoError::Geometry {
            message: format!("cannot scale outlines traced at {}x{}", width, height),
        });
    }

    let scale = contours::model_scale(width, export.width);
    let params = MeshParams {
        width: export.width,
        height: height as f64 * scale,
        thickness: export.height,
        border: export.border,
        stencil: export.stencil,
    };

    let results = outlines
        .par_iter()
        .map(|outline| solid_for(outline, width, height, export, &params))
        .collect();

    ctx.step(100)?;
    Ok(StageOutput::collect(results))
}

fn solid_for(
    outline: &LayerOutline,
    width: u32,
    height: u32,
    export: &ExportConfig,
    params: &MeshParams,
) -> (LayerOutcome<LayerSolid>, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let mut polygons = contours::to_model_space(&outline.polygons, width, height, export.width);
    let mut bridged = 0;

    if export.stencil && export.bridge > 0.0 {
        let mut pieces = Vec::with_capacity(polygons.len());
        for polygon in &polygons {
            let result = bridge::bridge_polygon(polygon, export.bridge);
            bridged += result.bridged;
            for failure in result.failures {
                log::warn!("layer {}: {}", outline.layer, failure);
                diagnostics.push(
                    Diagnostic::warning("camo::bridge::failed", failure)
                        .with_help("Try a smaller export.bridge width")
                        .for_layer(outline.layer),
                );
            }
            pieces.extend(result.pieces);
        }
        polygons = pieces;
    }

    let outcome = match mesh::build_solid(&polygons, params) {
        Ok(solid) => LayerOutcome::Done(LayerSolid {
            layer: outline.layer,
            index: outline.index,
            colour: outline.colour,
            solid,
            bridged,
        }),
        Err(e) => {
            log::warn!("layer {}: skipping solid: {}", outline.layer, e);
            let message = format!("layer {} solid skipped: {}", outline.layer, e);
            let diagnostic = match e {
                MeshError::Empty => Diagnostic::warning("camo::mesh::empty", message)
                    .with_help("Set export.border to print a frame for empty relief layers"),
                MeshError::Invalid(_) => Diagnostic::error("camo::mesh::invalid", message),
            };
            LayerOutcome::Skipped(diagnostic.for_layer(outline.layer))
        }
    };

    (outcome, diagnostics)
}
