//! Per-pixel colour assignment.

use std::collections::HashSet;

use image::RgbImage;
use rand::Rng;
use rayon::prelude::*;

use super::kmeans::{KMeans, Point};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{CamoError, Result};
use crate::types::{Colour, LabelGrid};

/// Labels and cluster colours from automatic clustering.
#[derive(Debug, Clone)]
pub struct AutoAssignment {
    pub grid: LabelGrid,
    /// Centre colour per label.
    pub colours: Vec<Colour>,
    pub diagnostics: Diagnostics,
}

/// Assign every pixel the index of its nearest reference colour.
///
/// Squared RGB distance; ties go to the lowest index.
pub fn assign_manual(image: &RgbImage, references: &[Colour]) -> Result<LabelGrid> {
    if references.is_empty() {
        return Err(CamoError::config(
            "manual assignment needs at least one palette colour",
            "Add colours to the palette or leave it empty for auto mode",
        ));
    }

    let labels: Vec<u32> = image
        .as_raw()
        .par_chunks_exact(3)
        .map(|px| {
            let colour = Colour::rgb(px[0], px[1], px[2]);
            let mut best = 0;
            let mut best_dist = u32::MAX;
            for (i, reference) in references.iter().enumerate() {
                let d = colour.dist_sq(*reference);
                if d < best_dist {
                    best = i;
                    best_dist = d;
                }
            }
            best as u32
        })
        .collect();

    Ok(LabelGrid::new(image.width(), image.height(), labels))
}

/// Cluster the pixels into `k` colours with k-means.
///
/// `k` is clamped to the number of distinct colours in the image, with a
/// warning diagnostic when that happens.
pub fn assign_auto<R: Rng>(image: &RgbImage, k: usize, rng: &mut R) -> Result<AutoAssignment> {
    if k == 0 {
        return Err(CamoError::Cluster {
            message: "cluster count must be at least 1".to_string(),
            help: Some("Set process.max_colors to 1 or more".to_string()),
        });
    }

    let points = to_points(image);
    let distinct = distinct_colours(image);
    if distinct == 0 {
        return Err(CamoError::Cluster {
            message: "image has no pixels".to_string(),
            help: None,
        });
    }

    let mut diagnostics = Diagnostics::new();
    let k = if k > distinct {
        log::warn!("image has only {} distinct colours; using {} clusters", distinct, distinct);
        diagnostics.push(
            Diagnostic::warning(
                "camo::cluster::clamped",
                format!("requested {} clusters but the image has {} distinct colours", k, distinct),
            )
            .with_help("Lower process.max_colors"),
        );
        distinct
    } else {
        k
    };

    let clustering = KMeans::new(k).run(&points, rng)?;
    let colours = clustering.centres.iter().map(|c| centre_colour(*c)).collect();

    Ok(AutoAssignment {
        grid: LabelGrid::new(image.width(), image.height(), clustering.labels),
        colours,
        diagnostics,
    })
}

pub(crate) fn to_points(image: &RgbImage) -> Vec<Point> {
    image
        .pixels()
        .map(|p| [p.0[0] as f32, p.0[1] as f32, p.0[2] as f32])
        .collect()
}

pub(crate) fn distinct_colours(image: &RgbImage) -> usize {
    image.pixels().map(|p| p.0).collect::<HashSet<[u8; 3]>>().len()
}

/// Truncate a centre to an 8-bit colour.
pub(crate) fn centre_colour(c: Point) -> Colour {
    let channel = |v: f32| v.clamp(0.0, 255.0) as u8;
    Colour::rgb(channel(c[0]), channel(c[1]), channel(c[2]))
}
