//! Preview PNGs of layer masks.

use std::path::Path;

use image::{Rgb, RgbImage};

use crate::error::{CamoError, Result};
use crate::types::{Colour, LayerMask};

/// All layers painted in order onto white; later layers win where they overlap.
pub fn render_combined(layers: &[LayerMask], width: u32, height: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(width, height, Rgb(Colour::WHITE.to_rgb()));
    for layer in layers {
        paint(&mut img, layer);
    }
    img
}

/// One layer in its colour on white.
pub fn render_layer(layer: &LayerMask) -> RgbImage {
    let (width, height) = layer.mask.dimensions();
    let mut img = RgbImage::from_pixel(width, height, Rgb(Colour::WHITE.to_rgb()));
    paint(&mut img, layer);
    img
}

fn paint(img: &mut RgbImage, layer: &LayerMask) {
    let fill = Rgb(layer.colour.to_rgb());
    for (x, y, p) in layer.mask.enumerate_pixels() {
        if p.0[0] != 0 && x < img.width() && y < img.height() {
            img.put_pixel(x, y, fill);
        }
    }
}

/// Write an image as PNG.
pub fn write_png(img: &RgbImage, path: &Path) -> Result<()> {
    img.save(path).map_err(|e| CamoError::Io {
        path: path.to_path_buf(),
        message: format!("Failed to write PNG: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ON;
    use image::{GrayImage, Luma};
    use tempfile::tempdir;

    fn layer(colour: Colour, on: impl Fn(u32) -> bool) -> LayerMask {
        let mask = GrayImage::from_fn(4, 1, |x, _| if on(x) { Luma([ON]) } else { Luma([0]) });
        LayerMask::new(1, colour, mask)
    }

    #[test]
    fn test_combined_paints_in_order() {
        let red = layer(Colour::rgb(255, 0, 0), |x| x < 2);
        let blue = layer(Colour::rgb(0, 0, 255), |x| x == 1 || x == 2);
        let img = render_combined(&[red, blue], 4, 1);

        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(1, 0).0, [0, 0, 255]);
        assert_eq!(img.get_pixel(2, 0).0, [0, 0, 255]);
        assert_eq!(img.get_pixel(3, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_write_layer_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("layer.png");
        write_png(&render_layer(&layer(Colour::BLACK, |x| x == 3)), &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (4, 1));
        assert_eq!(img.get_pixel(3, 0).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255]);
    }
}
