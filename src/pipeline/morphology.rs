//! Binary morphology with an elliptical structuring element.
//!
//! Out-of-image neighbours are ignored, so dilation never grows from the
//! border and erosion never eats into it.

use image::GrayImage;
use rayon::prelude::*;

/// Elliptical structuring element stored as offsets from its anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kernel {
    size: u32,
    offsets: Vec<(i32, i32)>,
}

impl Kernel {
    /// Ellipse inscribed in a `size × size` box, anchored at its centre.
    ///
    /// Each row spans `c ± round(c * sqrt((r² - dy²) / r²))` columns, the
    /// usual raster ellipse rule. Size 1 is a single pixel.
    pub fn ellipse(size: u32) -> Self {
        let k = size.max(1) as i32;
        let r = k / 2;
        let c = k / 2;
        let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };

        let mut offsets = Vec::new();
        for i in 0..k {
            let dy = i - r;
            if dy.abs() > r {
                continue;
            }
            let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as i32;
            let j1 = (c - dx).max(0);
            let j2 = (c + dx + 1).min(k);
            for j in j1..j2 {
                offsets.push((j - c, i - r));
            }
        }

        Self {
            size: k as u32,
            offsets,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Maximum over the kernel footprint.
pub fn dilate(mask: &GrayImage, kernel: &Kernel) -> GrayImage {
    apply(mask, kernel, 0, u8::max)
}

/// Minimum over the kernel footprint.
pub fn erode(mask: &GrayImage, kernel: &Kernel) -> GrayImage {
    apply(mask, kernel, u8::MAX, u8::min)
}

/// Dilate then erode: fills gaps narrower than the kernel.
pub fn close(mask: &GrayImage, kernel: &Kernel) -> GrayImage {
    erode(&dilate(mask, kernel), kernel)
}

/// Erode then dilate: removes specks smaller than the kernel.
pub fn open(mask: &GrayImage, kernel: &Kernel) -> GrayImage {
    dilate(&erode(mask, kernel), kernel)
}

fn apply(mask: &GrayImage, kernel: &Kernel, init: u8, pick: fn(u8, u8) -> u8) -> GrayImage {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return mask.clone();
    }

    let src: &[u8] = mask.as_raw();
    let mut out = GrayImage::new(width, height);
    let (w, h) = (width as i32, height as i32);

    out.par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i32;
            for (x, value) in row.iter_mut().enumerate() {
                let x = x as i32;
                let mut acc = init;
                for &(dx, dy) in &kernel.offsets {
                    let (sx, sy) = (x + dx, y + dy);
                    if sx < 0 || sy < 0 || sx >= w || sy >= h {
                        continue;
                    }
                    acc = pick(acc, src[(sy * w + sx) as usize]);
                }
                *value = acc;
            }
        });

    out
}
