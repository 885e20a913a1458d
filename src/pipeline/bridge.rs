//! Stencil bridging: cut a narrow channel from each hole to the outer
//! boundary so islands stay attached to the surrounding material.

use geo::{
    BooleanOps, Contains, InteriorPoint, LineString, MultiPolygon, Point, Polygon, Validation,
};

use super::contours::segment_distance;

/// Outcome of bridging one polygon.
#[derive(Debug, Clone, Default)]
pub struct Bridged {
    /// Resulting pieces; a cut that splits the shape yields several.
    pub pieces: Vec<Polygon<f64>>,
    /// Holes that were opened.
    pub bridged: usize,
    /// One message per hole that could not be bridged.
    pub failures: Vec<String>,
}

/// Bridge every hole of `polygon` to its outer boundary, in hole order.
///
/// Each connector is a `width`-wide strip centred on the shortest segment
/// between the current outer ring and the hole, extended by half the width
/// at both ends. Holes already merged by an earlier cut are skipped.
pub fn bridge_polygon(polygon: &Polygon<f64>, width: f64) -> Bridged {
    let mut result = Bridged::default();
    if width <= 0.0 || polygon.interiors().is_empty() {
        result.pieces.push(polygon.clone());
        return result;
    }

    let mut working = MultiPolygon::new(vec![polygon.clone()]);

    for (n, hole) in polygon.interiors().iter().enumerate() {
        let Some(marker) = Polygon::new(hole.clone(), vec![]).interior_point() else {
            result.failures.push(format!("hole {} is degenerate", n + 1));
            continue;
        };
        let Some((piece, ring)) = find_hole(&working, &marker) else {
            log::debug!("hole {} already open", n + 1);
            continue;
        };

        let Some((p, q)) = closest_pair(piece.exterior(), &ring) else {
            result.failures.push(format!("hole {} has no boundary to bridge to", n + 1));
            continue;
        };

        let connector = MultiPolygon::new(vec![connector(p, q, width)]);
        let mut cut = working.difference(&connector);
        if !cut.is_valid() {
            log::debug!("repairing cut for hole {}", n + 1);
            cut = cut.union(&MultiPolygon::new(vec![]));
        }

        if cut.0.is_empty() {
            result.failures.push(format!("bridge for hole {} removed the whole shape", n + 1));
        } else if find_hole(&cut, &marker).is_some() {
            result.failures.push(format!("bridge for hole {} did not open it", n + 1));
        } else {
            working = cut;
            result.bridged += 1;
        }
    }

    result.pieces = working.0;
    result
}

/// The working piece and ring still enclosing the hole marker, if any.
fn find_hole(
    working: &MultiPolygon<f64>,
    marker: &Point<f64>,
) -> Option<(Polygon<f64>, LineString<f64>)> {
    working.0.iter().find_map(|piece| {
        piece
            .interiors()
            .iter()
            .find(|ring| Polygon::new((*ring).clone(), vec![]).contains(marker))
            .map(|ring| (piece.clone(), ring.clone()))
    })
}

/// Closest points between two rings, searching every vertex against every
/// segment of the other ring.
pub fn closest_pair(a: &LineString<f64>, b: &LineString<f64>) -> Option<([f64; 2], [f64; 2])> {
    let a: Vec<[f64; 2]> = a.coords().map(|c| [c.x, c.y]).collect();
    let b: Vec<[f64; 2]> = b.coords().map(|c| [c.x, c.y]).collect();
    if a.is_empty() || b.is_empty() {
        return None;
    }

    let mut best: Option<(f64, [f64; 2], [f64; 2])> = None;
    let mut consider = |d: f64, p: [f64; 2], q: [f64; 2]| {
        if best.map_or(true, |(bd, _, _)| d < bd) {
            best = Some((d, p, q));
        }
    };

    for &p in &a {
        for seg in segments(&b) {
            let q = project(p, seg.0, seg.1);
            consider(segment_distance(p, seg.0, seg.1), p, q);
        }
    }
    for &q in &b {
        for seg in segments(&a) {
            let p = project(q, seg.0, seg.1);
            consider(segment_distance(q, seg.0, seg.1), p, q);
        }
    }

    best.map(|(_, p, q)| (p, q))
}

fn segments(ring: &[[f64; 2]]) -> impl Iterator<Item = ([f64; 2], [f64; 2])> + '_ {
    let single = (ring.len() == 1).then(|| (ring[0], ring[0]));
    ring.windows(2).map(|w| (w[0], w[1])).chain(single)
}

fn project(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return a;
    }
    let t = (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len_sq).clamp(0.0, 1.0);
    [a[0] + t * dx, a[1] + t * dy]
}

/// Rectangle of `width` centred on `p`-`q`, extended by `width / 2` past both
/// ends. Coincident points give an axis-aligned square.
pub fn connector(p: [f64; 2], q: [f64; 2], width: f64) -> Polygon<f64> {
    let half = width / 2.0;
    let (dx, dy) = (q[0] - p[0], q[1] - p[1]);
    let len = dx.hypot(dy);

    let corners = if len < 1e-12 {
        vec![
            (p[0] - half, p[1] - half),
            (p[0] + half, p[1] - half),
            (p[0] + half, p[1] + half),
            (p[0] - half, p[1] + half),
        ]
    } else {
        let (ux, uy) = (dx / len, dy / len);
        let (nx, ny) = (-uy * half, ux * half);
        let start = (p[0] - ux * half, p[1] - uy * half);
        let end = (q[0] + ux * half, q[1] + uy * half);
        vec![
            (start.0 + nx, start.1 + ny),
            (end.0 + nx, end.1 + ny),
            (end.0 - nx, end.1 - ny),
            (start.0 - nx, start.1 - ny),
        ]
    };
    Polygon::new(LineString::from(corners), vec![])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::contours::{to_model_space, trace_polygons};
    use crate::types::ON;
    use geo::Area;
    use image::{GrayImage, Luma};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> LineString<f64> {
        LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)])
    }

    fn total_area(pieces: &[Polygon<f64>]) -> f64 {
        pieces.iter().map(|p| p.unsigned_area()).sum()
    }

    #[test]
    fn test_single_hole_is_opened() {
        let polygon = Polygon::new(square(0.0, 0.0, 10.0, 10.0), vec![square(4.0, 4.0, 6.0, 6.0)]);
        let result = bridge_polygon(&polygon, 1.0);

        assert_eq!(result.bridged, 1);
        assert!(result.failures.is_empty());
        assert!(result.pieces.iter().all(|p| p.interiors().is_empty()));
        let area = total_area(&result.pieces);
        assert!(area > 91.0 && area < 92.5, "area {}", area);
    }

    #[test]
    fn test_every_hole_is_opened() {
        let polygon = Polygon::new(
            square(0.0, 0.0, 30.0, 10.0),
            vec![
                square(3.0, 3.0, 7.0, 7.0),
                square(13.0, 3.0, 17.0, 7.0),
                square(23.0, 3.0, 27.0, 7.0),
            ],
        );
        let result = bridge_polygon(&polygon, 0.5);

        assert_eq!(result.bridged, 3);
        assert!(!result.pieces.is_empty());
        assert!(result.pieces.iter().all(|p| p.interiors().is_empty()));
    }

    #[test]
    fn test_traced_plate_with_scattered_holes_opens_fully() {
        let mut rng = StdRng::seed_from_u64(7);
        let holes: Vec<(u32, u32)> = (0..3u32)
            .flat_map(|cy| (0..4u32).map(move |cx| (cx, cy)))
            .map(|(cx, cy)| (cx * 12 + rng.gen_range(3..6), cy * 12 + rng.gen_range(3..6)))
            .collect();
        let mask = GrayImage::from_fn(48, 36, |x, y| {
            let in_hole = holes
                .iter()
                .any(|&(hx, hy)| (hx..hx + 4).contains(&x) && (hy..hy + 4).contains(&y));
            Luma([if in_hole { 0 } else { ON }])
        });

        let traced = trace_polygons(&mask, 0.0);
        assert_eq!(traced.len(), 1);
        assert_eq!(traced[0].interiors().len(), holes.len());

        let model = to_model_space(&traced, 48, 36, 96.0);
        let result = bridge_polygon(&model[0], 1.0);

        assert!(result.failures.is_empty(), "{:?}", result.failures);
        assert!(result.bridged >= 1 && result.bridged <= holes.len());
        assert!(result.pieces.iter().all(|p| p.interiors().is_empty()));
        assert!(MultiPolygon::new(result.pieces.clone()).is_valid());
        let area = total_area(&result.pieces);
        assert!(area > 0.0 && area < model[0].unsigned_area());
    }

    #[test]
    fn test_polygon_without_holes_is_untouched() {
        let polygon = Polygon::new(square(0.0, 0.0, 5.0, 5.0), vec![]);
        let result = bridge_polygon(&polygon, 1.0);
        assert_eq!(result.pieces, vec![polygon]);
        assert_eq!(result.bridged, 0);
    }

    #[test]
    fn test_zero_width_skips_bridging() {
        let polygon = Polygon::new(square(0.0, 0.0, 10.0, 10.0), vec![square(4.0, 4.0, 6.0, 6.0)]);
        let result = bridge_polygon(&polygon, 0.0);
        assert_eq!(result.pieces[0].interiors().len(), 1);
    }

    #[test]
    fn test_closest_pair() {
        let outer = square(0.0, 0.0, 10.0, 10.0);
        let hole = square(7.0, 4.0, 8.0, 6.0);
        let (p, q) = closest_pair(&outer, &hole).unwrap();
        assert_eq!(p[0], 10.0);
        assert_eq!(q[0], 8.0);
        assert!((p[1] - q[1]).abs() < 1e-12);
    }

    #[test]
    fn test_connector_extends_past_both_ends() {
        let rect = connector([0.0, 0.0], [4.0, 0.0], 2.0);
        assert!((rect.unsigned_area() - 12.0).abs() < 1e-9);
        let square = connector([1.0, 1.0], [1.0, 1.0], 2.0);
        assert!((square.unsigned_area() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_cut_pieces_are_valid() {
        let polygon = Polygon::new(
            square(0.0, 0.0, 20.0, 10.0),
            vec![square(3.0, 3.0, 7.0, 7.0), square(12.0, 3.0, 16.0, 7.0)],
        );
        let result = bridge_polygon(&polygon, 1.0);

        assert_eq!(result.bridged, 2);
        assert!(MultiPolygon::new(result.pieces).is_valid());
        let bowtie = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0)]),
            vec![],
        );
        assert!(!bowtie.is_valid());
    }
}
