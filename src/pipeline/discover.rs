//! Palette discovery: suggest reference colours and layer groups for an image.

use std::collections::BTreeSet;

use image::imageops::FilterType;
use image::RgbImage;
use rand::Rng;

use super::classify::{centre_colour, to_points};
use super::kmeans::{KMeans, Point};
use crate::error::{CamoError, Result};
use crate::types::{Colour, Palette, PaletteEntry};

/// Width images are reduced to before discovery.
pub const DISCOVERY_WIDTH: u32 = 300;

/// Images with at most this many colours keep them exactly.
pub const EXACT_COLOUR_LIMIT: usize = 64;

/// Colour count when quantizing larger images.
pub const QUANTIZED_COLOURS: usize = 32;

/// Suggest a palette for `image`, grouped into at most `max_layers` layers.
///
/// Colours are sorted brightest first. When there are more colours than
/// layers, the colours are clustered and groups are numbered by descending
/// brightness of their centre.
pub fn discover_palette<R: Rng>(image: &RgbImage, max_layers: usize, rng: &mut R) -> Result<Palette> {
    if image.width() == 0 || image.height() == 0 {
        return Err(CamoError::Cluster {
            message: "cannot discover colours in an empty image".to_string(),
            help: None,
        });
    }
    if max_layers == 0 {
        return Err(CamoError::config(
            "palette discovery needs at least one layer",
            "Pass --max 1 or more",
        ));
    }

    let small = downsample(image);
    let distinct: BTreeSet<[u8; 3]> = small.pixels().map(|p| p.0).collect();

    let colours: Vec<Colour> = if distinct.len() <= EXACT_COLOUR_LIMIT {
        distinct.into_iter().map(Colour::from_rgb).collect()
    } else {
        log::debug!("quantizing {} colours to {}", distinct.len(), QUANTIZED_COLOURS);
        let clustering = KMeans::new(QUANTIZED_COLOURS).run(&to_points(&small), rng)?;
        clustering.centres.iter().map(|c| centre_colour(*c)).collect()
    };

    let mut palette = Palette::new();
    for colour in colours {
        palette.push(colour);
    }
    palette.reorder_by_brightness();

    if palette.len() > max_layers {
        palette = group_layers(&palette, max_layers, rng)?;
    }
    Ok(palette)
}

/// Cluster palette colours into `groups` layers numbered by descending
/// centre brightness.
pub fn group_layers<R: Rng>(palette: &Palette, groups: usize, rng: &mut R) -> Result<Palette> {
    let points: Vec<Point> = palette
        .colours()
        .iter()
        .map(|c| {
            let [r, g, b] = c.to_rgb();
            [r as f32, g as f32, b as f32]
        })
        .collect();
    let clustering = KMeans::new(groups.min(points.len())).run(&points, rng)?;

    // Cluster index sorted by brightness, brightest first
    let mut order: Vec<usize> = (0..clustering.centres.len()).collect();
    let brightness = |i: usize| clustering.centres[i].iter().sum::<f32>();
    order.sort_by(|&a, &b| brightness(b).total_cmp(&brightness(a)));
    let mut rank = vec![0u32; order.len()];
    for (n, &cluster) in order.iter().enumerate() {
        rank[cluster] = n as u32 + 1;
    }

    let entries = palette
        .entries()
        .iter()
        .zip(&clustering.labels)
        .map(|(entry, &label)| PaletteEntry::new(entry.colour, rank[label as usize]))
        .collect();
    let mut grouped = Palette::from_entries(entries);
    grouped.compact_layer_ids();
    Ok(grouped)
}

fn downsample(image: &RgbImage) -> RgbImage {
    if image.width() <= DISCOVERY_WIDTH {
        return image.clone();
    }
    let height = ((image.height() as u64 * DISCOVERY_WIDTH as u64) / image.width() as u64).max(1) as u32;
    image::imageops::resize(image, DISCOVERY_WIDTH, height, FilterType::Triangle)
}
