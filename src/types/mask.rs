//! Raster intermediates: per-pixel colour labels and per-layer masks.

use image::{GrayImage, Luma};

use super::Colour;

/// Foreground value in binary masks.
pub const ON: u8 = 255;

/// Width×height grid of colour indices, one per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelGrid {
    width: u32,
    height: u32,
    labels: Vec<u32>,
}

impl LabelGrid {
    /// Wrap a row-major label buffer.
    ///
    /// # Panics
    ///
    /// Panics if `labels.len() != width * height`.
    pub fn new(width: u32, height: u32, labels: Vec<u32>) -> Self {
        assert_eq!(labels.len(), width as usize * height as usize, "label buffer size");
        Self {
            width,
            height,
            labels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Label at a pixel, if in bounds.
    pub fn get(&self, x: u32, y: u32) -> Option<u32> {
        if x < self.width && y < self.height {
            Some(self.labels[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    /// Row-major labels.
    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    /// Binary mask of the pixels carrying any of the given labels.
    pub fn mask_of(&self, indices: &[u32]) -> GrayImage {
        let mut mask = GrayImage::new(self.width, self.height);
        for (pixel, label) in mask.pixels_mut().zip(&self.labels) {
            if indices.contains(label) {
                *pixel = Luma([ON]);
            }
        }
        mask
    }
}

/// The accepted pixel set of one output layer.
#[derive(Debug, Clone)]
pub struct LayerMask {
    /// Layer id (palette layer id, or cluster number in auto mode).
    pub layer: u32,
    /// Representative fill colour.
    pub colour: Colour,
    /// Binary raster, `ON` for accepted pixels.
    pub mask: GrayImage,
    /// True for the layer synthesized from uncovered area.
    pub orphan: bool,
}

impl LayerMask {
    pub fn new(layer: u32, colour: Colour, mask: GrayImage) -> Self {
        Self {
            layer,
            colour,
            mask,
            orphan: false,
        }
    }

    /// Number of accepted pixels.
    pub fn pixel_count(&self) -> usize {
        count_on(&self.mask)
    }

    pub fn is_empty(&self) -> bool {
        self.mask.pixels().all(|p| p.0[0] == 0)
    }
}

/// Count non-zero pixels in a mask.
pub fn count_on(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p.0[0] != 0).count()
}
