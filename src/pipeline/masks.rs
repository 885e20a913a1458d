//! Layer mask construction: merge labels, smooth, drop small blobs.

use std::collections::BTreeMap;

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use rayon::prelude::*;

use super::morphology::{self, Kernel};
use crate::types::{Colour, LabelGrid, LayerMask};

/// One layer to build: its id, the label values it merges and its colour.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub layer: u32,
    pub labels: Vec<u32>,
    pub colour: Colour,
}

/// Mask cleanup settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cleanup {
    /// Elliptical kernel size; 0 disables morphology.
    pub kernel: u32,
    /// Components below this many pixels are removed; 0 keeps everything.
    pub min_blob: usize,
}

impl Cleanup {
    fn kernel(&self) -> Option<Kernel> {
        (self.kernel > 0).then(|| Kernel::ellipse(self.kernel))
    }
}

/// Layer specs for a manual palette: one per layer id, ascending.
///
/// The colour is the truncating mean of the entries' colours.
pub fn manual_specs(groups: &BTreeMap<u32, Vec<usize>>, colours: &[Colour]) -> Vec<LayerSpec> {
    groups
        .iter()
        .map(|(&layer, indices)| LayerSpec {
            layer,
            labels: indices.iter().map(|&i| i as u32).collect(),
            colour: Colour::mean(indices.iter().filter_map(|&i| colours.get(i).copied()))
                .unwrap_or(Colour::BLACK),
        })
        .collect()
}

/// Layer specs for auto mode: cluster `i` becomes layer `i + 1`.
pub fn auto_specs(colours: &[Colour]) -> Vec<LayerSpec> {
    colours
        .iter()
        .enumerate()
        .map(|(i, &colour)| LayerSpec {
            layer: i as u32 + 1,
            labels: vec![i as u32],
            colour,
        })
        .collect()
}

/// Build every layer's mask in parallel, returned in the order given.
///
/// Masks are independent: a pixel can end up in more than one layer after
/// smoothing.
pub fn build_masks(grid: &LabelGrid, specs: &[LayerSpec], cleanup: Cleanup) -> Vec<LayerMask> {
    specs
        .par_iter()
        .map(|spec| {
            let raw = grid.mask_of(&spec.labels);
            let mask = clean_layer(&raw, cleanup);
            log::debug!(
                "layer {}: {} colour(s), {} px",
                spec.layer,
                spec.labels.len(),
                crate::types::count_on(&mask)
            );
            LayerMask::new(spec.layer, spec.colour, mask)
        })
        .collect()
}

/// Close, open, then drop small components.
pub fn clean_layer(mask: &GrayImage, cleanup: Cleanup) -> GrayImage {
    let smoothed = match cleanup.kernel() {
        Some(kernel) => morphology::open(&morphology::close(mask, &kernel), &kernel),
        None => mask.clone(),
    };
    filter_small_blobs(&smoothed, cleanup.min_blob)
}

/// Open, close, then drop small components. Used for uncovered area, where
/// speckle removal comes first.
pub fn clean_orphan(mask: &GrayImage, cleanup: Cleanup) -> GrayImage {
    let smoothed = match cleanup.kernel() {
        Some(kernel) => morphology::close(&morphology::open(mask, &kernel), &kernel),
        None => mask.clone(),
    };
    filter_small_blobs(&smoothed, cleanup.min_blob)
}

/// Zero every 8-connected component smaller than `min_area` pixels.
pub fn filter_small_blobs(mask: &GrayImage, min_area: usize) -> GrayImage {
    if min_area <= 1 {
        return mask.clone();
    }

    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));
    let mut areas: Vec<usize> = Vec::new();
    for p in labels.pixels() {
        let label = p.0[0] as usize;
        if label == 0 {
            continue;
        }
        if label >= areas.len() {
            areas.resize(label + 1, 0);
        }
        areas[label] += 1;
    }

    let mut out = mask.clone();
    for (pixel, label) in out.pixels_mut().zip(labels.pixels()) {
        let label = label.0[0] as usize;
        if label != 0 && areas[label] < min_area {
            *pixel = Luma([0]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{count_on, ON};

    fn grid_from_rows(rows: &[&str]) -> LabelGrid {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let labels = rows
            .iter()
            .flat_map(|r| r.bytes().map(|b| (b - b'0') as u32))
            .collect();
        LabelGrid::new(width, height, labels)
    }

    fn components(mask: &GrayImage) -> Vec<usize> {
        let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));
        let mut areas = std::collections::BTreeMap::new();
        for p in labels.pixels().filter(|p| p.0[0] != 0) {
            *areas.entry(p.0[0]).or_insert(0usize) += 1;
        }
        areas.into_values().collect()
    }

    #[test]
    fn test_manual_specs_merge_and_average() {
        let mut groups = BTreeMap::new();
        groups.insert(2, vec![0]);
        groups.insert(1, vec![1, 2]);
        let colours = [Colour::rgb(9, 9, 9), Colour::rgb(10, 0, 0), Colour::rgb(21, 0, 0)];

        let specs = manual_specs(&groups, &colours);
        assert_eq!(specs[0].layer, 1);
        assert_eq!(specs[0].labels, vec![1, 2]);
        assert_eq!(specs[0].colour, Colour::rgb(15, 0, 0));
        assert_eq!(specs[1].layer, 2);
    }

    #[test]
    fn test_build_masks_unions_labels() {
        let grid = grid_from_rows(&["0011", "0122", "2222"]);
        let specs = vec![
            LayerSpec {
                layer: 1,
                labels: vec![0, 1],
                colour: Colour::BLACK,
            },
            LayerSpec {
                layer: 2,
                labels: vec![2],
                colour: Colour::WHITE,
            },
        ];
        let masks = build_masks(&grid, &specs, Cleanup { kernel: 0, min_blob: 0 });
        assert_eq!(masks.len(), 2);
        assert_eq!(masks[0].pixel_count(), 6);
        assert_eq!(masks[1].pixel_count(), 6);
    }

    #[test]
    fn test_filter_small_blobs_threshold() {
        let mut mask = GrayImage::new(10, 10);
        // 2x2 blob, a diagonal pair (one 8-connected blob) and a 3x3 blob
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1), (5, 0), (6, 1)] {
            mask.put_pixel(x, y, Luma([ON]));
        }
        for y in 6..9 {
            for x in 6..9 {
                mask.put_pixel(x, y, Luma([ON]));
            }
        }

        assert_eq!(count_on(&filter_small_blobs(&mask, 0)), 15);
        assert_eq!(components(&filter_small_blobs(&mask, 3)), vec![4, 9]);
        assert_eq!(components(&filter_small_blobs(&mask, 5)), vec![9]);
        assert_eq!(count_on(&filter_small_blobs(&mask, 10)), 0);
    }

    #[test]
    fn test_no_component_below_threshold() {
        let mask = GrayImage::from_fn(32, 32, |x, y| {
            if (x * 7 + y * 13) % 5 == 0 || (x / 8 + y / 8) % 2 == 0 {
                Luma([ON])
            } else {
                Luma([0])
            }
        });
        for threshold in [0, 1, 2, 5, 20, 100] {
            let filtered = clean_layer(&mask, Cleanup { kernel: 3, min_blob: threshold });
            assert!(components(&filtered).iter().all(|&a| a >= threshold));
        }
    }
}
