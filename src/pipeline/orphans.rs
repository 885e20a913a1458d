//! Uncovered area detection and orphan colour selection.

use image::{GrayImage, Luma};
use rand::Rng;

use super::masks::{clean_orphan, Cleanup};
use crate::types::{Colour, LayerMask, ON};

/// Colour used when no candidate is far enough from the existing layers.
pub const FALLBACK_COLOUR: Colour = Colour::rgb(0, 255, 0);

/// Candidate draws before falling back.
pub const MAX_ATTEMPTS: usize = 50;

/// Minimum squared distance a candidate must exceed for this many layers.
///
/// The bar drops once ten layers exist so the search still converges.
pub fn distance_threshold(layer_count: usize) -> u32 {
    if layer_count < 10 {
        2000
    } else {
        500
    }
}

/// Pixels not claimed by any layer, cleaned with open, close and the blob filter.
pub fn find_orphans(layers: &[LayerMask], width: u32, height: u32, cleanup: Cleanup) -> GrayImage {
    let mut uncovered = GrayImage::from_pixel(width, height, Luma([ON]));
    for layer in layers {
        for (out, covered) in uncovered.pixels_mut().zip(layer.mask.pixels()) {
            if covered.0[0] != 0 {
                *out = Luma([0]);
            }
        }
    }
    clean_orphan(&uncovered, cleanup)
}

/// A chosen orphan colour and whether the search gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrphanColour {
    pub colour: Colour,
    pub fallback: bool,
}

/// Draw random colours until one is far enough from every existing colour.
pub fn pick_orphan_colour<R: Rng>(existing: &[Colour], rng: &mut R) -> OrphanColour {
    let threshold = distance_threshold(existing.len());

    for _ in 0..MAX_ATTEMPTS {
        let candidate = Colour::rgb(rng.gen(), rng.gen(), rng.gen());
        let accepted = existing
            .iter()
            .map(|c| c.dist_sq(candidate))
            .min()
            .map_or(true, |d| d > threshold);
        if accepted {
            return OrphanColour {
                colour: candidate,
                fallback: false,
            };
        }
    }

    OrphanColour {
        colour: FALLBACK_COLOUR,
        fallback: true,
    }
}
