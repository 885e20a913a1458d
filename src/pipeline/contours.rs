//! Mask tracing into polygons with one level of holes.

use geo::{Coord, LineString, MapCoords, Polygon};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};

/// Trace a binary mask into simplified polygons in pixel coordinates.
///
/// Each outer border becomes one polygon carrying the hole borders directly
/// inside it. Rings are simplified with a tolerance of `smoothing` times
/// their perimeter; rings left with fewer than 3 vertices are dropped.
///
/// The mask is traced inside a one pixel background frame, so shapes that
/// touch the image edge still come back as outer borders.
pub fn trace_polygons(mask: &GrayImage, smoothing: f64) -> Vec<Polygon<f64>> {
    let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
    image::imageops::replace(&mut padded, mask, 1, 1);
    let contours: Vec<Contour<i32>> = find_contours(&padded);
    let mut polygons = Vec::new();

    for (i, contour) in contours.iter().enumerate() {
        if contour.border_type != BorderType::Outer {
            continue;
        }
        let Some(outer) = simplified(contour, smoothing) else {
            continue;
        };
        let holes: Vec<LineString<f64>> = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Hole && c.parent == Some(i))
            .filter_map(|c| simplified(c, smoothing))
            .map(to_line_string)
            .collect();
        polygons.push(Polygon::new(to_line_string(outer), holes));
    }

    polygons
}

fn simplified(contour: &Contour<i32>, smoothing: f64) -> Option<Vec<[f64; 2]>> {
    let points: Vec<[f64; 2]> = contour
        .points
        .iter()
        .map(|p| [(p.x - 1) as f64, (p.y - 1) as f64])
        .collect();
    let ring = simplify_ring(&points, smoothing * perimeter(&points));
    (ring.len() >= 3).then_some(ring)
}

fn to_line_string(points: Vec<[f64; 2]>) -> LineString<f64> {
    LineString::from(points.into_iter().map(|[x, y]| (x, y)).collect::<Vec<_>>())
}

/// Length of a closed ring.
pub fn perimeter(points: &[[f64; 2]]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| distance(*a, *b))
        .sum()
}

/// Douglas-Peucker on a closed ring.
///
/// The ring is split at its first point and the point farthest from it, and
/// both halves are simplified as open chains.
pub fn simplify_ring(points: &[[f64; 2]], epsilon: f64) -> Vec<[f64; 2]> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = points[0];
    let (split, far) = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, distance(first, *p)))
        .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
    if far == 0.0 {
        return vec![first];
    }

    let mut second_half: Vec<[f64; 2]> = points[split..].to_vec();
    second_half.push(first);

    let mut ring = simplify_chain(&points[..=split], epsilon);
    ring.pop();
    let mut tail = simplify_chain(&second_half, epsilon);
    tail.pop();
    ring.extend(tail);
    ring
}

/// Douglas-Peucker on an open chain; both endpoints are kept.
pub fn simplify_chain(points: &[[f64; 2]], epsilon: f64) -> Vec<[f64; 2]> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0, n - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }
        let mut max_dist = 0.0;
        let mut index = start;
        for i in start + 1..end {
            let d = segment_distance(points[i], points[start], points[end]);
            if d > max_dist {
                max_dist = d;
                index = i;
            }
        }
        if max_dist > epsilon {
            keep[index] = true;
            stack.push((start, index));
            stack.push((index, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Map pixel coordinates onto a model plane `target_width` wide with y up.
pub fn to_model_space(
    polygons: &[Polygon<f64>],
    image_width: u32,
    image_height: u32,
    target_width: f64,
) -> Vec<Polygon<f64>> {
    let scale = model_scale(image_width, target_width);
    let target_height = image_height as f64 * scale;
    polygons
        .iter()
        .map(|p| {
            p.map_coords(|c| Coord {
                x: c.x * scale,
                y: target_height - c.y * scale,
            })
        })
        .collect()
}

/// Model units per pixel.
pub fn model_scale(image_width: u32, target_width: f64) -> f64 {
    if image_width == 0 {
        0.0
    } else {
        target_width / image_width as f64
    }
}

fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

/// Distance from `p` to the segment `a`-`b`.
pub(crate) fn segment_distance(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return distance(p, a);
    }
    let t = (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len_sq).clamp(0.0, 1.0);
    distance(p, [a[0] + t * dx, a[1] + t * dy])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{open_ring, ON};
    use geo::{Area, Contains, Point};
    use image::Luma;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn mask_with(width: u32, height: u32, on: impl Fn(u32, u32) -> bool) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| if on(x, y) { Luma([ON]) } else { Luma([0]) })
    }

    /// Plate covering the whole mask with square holes scattered one per
    /// 12 px cell, so no hole touches another or the edge.
    fn swiss_cheese(seed: u64) -> (GrayImage, Vec<(u32, u32)>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut holes = Vec::new();
        for cy in 0..4 {
            for cx in 0..5 {
                if rng.gen_bool(0.7) {
                    let x = cx * 12 + rng.gen_range(2..6);
                    let y = cy * 12 + rng.gen_range(2..6);
                    holes.push((x, y));
                }
            }
        }
        let mask = mask_with(60, 48, |x, y| {
            !holes
                .iter()
                .any(|&(hx, hy)| (hx..hx + 5).contains(&x) && (hy..hy + 5).contains(&y))
        });
        (mask, holes)
    }

    fn on(mask: &GrayImage, x: u32, y: u32) -> bool {
        mask.get_pixel(x, y).0[0] == ON
    }

    /// Pixels whose 3x3 neighbourhood lies in the mask and shares their value.
    fn settled_pixels(mask: &GrayImage) -> impl Iterator<Item = (u32, u32, bool)> + '_ {
        let (w, h) = mask.dimensions();
        (1..h.saturating_sub(1))
            .flat_map(move |y| (1..w.saturating_sub(1)).map(move |x| (x, y)))
            .filter(move |&(x, y)| {
                let value = on(mask, x, y);
                (x - 1..=x + 1).all(|nx| (y - 1..=y + 1).all(|ny| on(mask, nx, ny) == value))
            })
            .map(move |(x, y)| (x, y, on(mask, x, y)))
    }

    fn assert_outlines_cover(mask: &GrayImage, polygons: &[Polygon<f64>]) {
        for (x, y, value) in settled_pixels(mask) {
            let point = Point::new(x as f64, y as f64);
            let inside = polygons.iter().any(|p| p.contains(&point));
            assert_eq!(inside, value, "pixel ({}, {})", x, y);
        }
    }

    #[test]
    fn test_rectangle_traces_to_four_corners() {
        let mask = mask_with(64, 64, |x, _| x < 32);
        let polygons = trace_polygons(&mask, 0.0001);

        assert_eq!(polygons.len(), 1);
        let ring = open_ring(polygons[0].exterior());
        assert_eq!(ring.len(), 4);
        for corner in [[0.0, 0.0], [31.0, 0.0], [31.0, 63.0], [0.0, 63.0]] {
            assert!(ring.contains(&corner), "missing corner {:?}", corner);
        }
        assert!(polygons[0].interiors().is_empty());
    }

    #[test]
    fn test_hole_attached_to_its_outer() {
        // Frame with a hole, plus a separate blob
        let mask = mask_with(30, 20, |x, y| {
            let frame = (1..12).contains(&x) && (1..12).contains(&y);
            let hole = (4..8).contains(&x) && (4..8).contains(&y);
            let blob = (18..25).contains(&x) && (5..15).contains(&y);
            (frame && !hole) || blob
        });
        let polygons = trace_polygons(&mask, 0.0);

        assert_eq!(polygons.len(), 2);
        let holes: Vec<usize> = polygons.iter().map(|p| p.interiors().len()).collect();
        assert_eq!(holes.iter().sum::<usize>(), 1);
        let framed = polygons.iter().find(|p| !p.interiors().is_empty()).unwrap();
        assert!(framed.exterior().coords().any(|c| c.x == 1.0 && c.y == 1.0));
    }

    #[test]
    fn test_shapes_touching_the_edge_are_traced() {
        let mask = mask_with(40, 40, |x, y| !((15..25).contains(&x) && (15..25).contains(&y)));
        let polygons = trace_polygons(&mask, 0.0);

        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].interiors().len(), 1);
        let ring = open_ring(polygons[0].exterior());
        for corner in [[0.0, 0.0], [39.0, 0.0], [39.0, 39.0], [0.0, 39.0]] {
            assert!(ring.contains(&corner), "missing corner {:?}", corner);
        }
        assert_outlines_cover(&mask, &polygons);
    }

    #[test]
    fn test_blobs_on_every_edge() {
        let mask = mask_with(30, 30, |x, y| {
            (x < 5 && (5..10).contains(&y))
                || (x >= 25 && (12..20).contains(&y))
                || (y < 4 && (12..18).contains(&x))
                || (y >= 26 && x >= 20)
        });
        let polygons = trace_polygons(&mask, 0.0);

        assert_eq!(polygons.len(), 4);
        assert!(polygons.iter().all(|p| p.interiors().is_empty()));
        assert_outlines_cover(&mask, &polygons);
    }

    #[test]
    fn test_swiss_cheese_keeps_its_topology() {
        for seed in [3, 17, 42] {
            let (mask, holes) = swiss_cheese(seed);
            let polygons = trace_polygons(&mask, 0.0);

            assert_eq!(polygons.len(), 1, "seed {}", seed);
            assert_eq!(polygons[0].interiors().len(), holes.len(), "seed {}", seed);
            assert_outlines_cover(&mask, &polygons);
        }
    }

    #[test]
    fn test_single_pixels_are_dropped() {
        let mask = mask_with(8, 8, |x, y| x == 3 && y == 3);
        assert!(trace_polygons(&mask, 0.0).is_empty());
    }

    #[test]
    fn test_empty_mask() {
        assert!(trace_polygons(&GrayImage::new(4, 4), 0.001).is_empty());
    }

    #[test]
    fn test_simplify_chain_keeps_corners() {
        let chain = [[0.0, 0.0], [1.0, 0.05], [2.0, 0.0], [2.0, 2.0]];
        assert_eq!(
            simplify_chain(&chain, 0.1),
            vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0]]
        );
        assert_eq!(simplify_chain(&chain, 0.01).len(), 4);
    }

    #[test]
    fn test_simplify_ring_removes_collinear_points() {
        let ring = [
            [0.0, 0.0],
            [1.0, 0.0],
            [2.0, 0.0],
            [2.0, 1.0],
            [2.0, 2.0],
            [1.0, 2.0],
            [0.0, 2.0],
            [0.0, 1.0],
        ];
        let simplified = simplify_ring(&ring, 0.0);
        assert_eq!(simplified, vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]);
    }

    #[test]
    fn test_perimeter() {
        assert_eq!(perimeter(&[[0.0, 0.0], [3.0, 0.0], [3.0, 4.0]]), 12.0);
    }

    #[test]
    fn test_model_space_scales_and_flips() {
        let mask = mask_with(10, 5, |x, y| x < 4 && y < 2);
        let polygons = trace_polygons(&mask, 0.0);
        let model = to_model_space(&polygons, 10, 5, 100.0);

        let ring = open_ring(model[0].exterior());
        assert!(ring.contains(&[0.0, 50.0]));
        assert!(ring.contains(&[30.0, 40.0]));
        assert!((model[0].unsigned_area() - 300.0).abs() < 1e-9);
    }
}
