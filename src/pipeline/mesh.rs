//! Extrusion of layer polygons into solids.

use earcutr::earcut;
use geo::orient::{Direction, Orient};
use geo::{BooleanOps, LineString, MultiPolygon, Polygon};
use thiserror::Error;

use crate::types::{open_ring, Solid};

/// Why a layer produced no solid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    #[error("no geometry left to extrude")]
    Empty,
    #[error("{0}")]
    Invalid(String),
}

/// Model-space dimensions for one export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshParams {
    /// Image area width in model units.
    pub width: f64,
    /// Image area height in model units.
    pub height: f64,
    /// Extrusion height.
    pub thickness: f64,
    /// Frame width around the image area.
    pub border: f64,
    /// Cut blobs out of a plate instead of raising them.
    pub stencil: bool,
}

/// Build the solid for one layer from its model-space polygons.
///
/// Relief: the blobs are extruded, plus a separate frame around the image
/// area when `border > 0`, even for a layer with no blobs. Stencil: the union of the blobs is cut out of a
/// plate covering the image area and border, and every remaining piece is
/// extruded.
pub fn build_solid(polygons: &[Polygon<f64>], params: &MeshParams) -> Result<Solid, MeshError> {
    let blobs = union_all(polygons);
    let mut solid = Solid::new();

    if params.stencil {
        let b = params.border;
        let plate = MultiPolygon::new(vec![rectangle(-b, -b, params.width + b, params.height + b)]);
        let pieces = if blobs.0.is_empty() {
            plate
        } else {
            plate.difference(&blobs)
        };
        for piece in &pieces.0 {
            solid.append(extrude_polygon(piece, params.thickness)?);
        }
    } else {
        for blob in &blobs.0 {
            solid.append(extrude_polygon(blob, params.thickness)?);
        }
        if params.border > 0.0 {
            solid.append(extrude_polygon(&frame(params), params.thickness)?);
        }
    }

    if solid.is_empty() {
        return Err(MeshError::Empty);
    }
    solid.check().map_err(MeshError::Invalid)?;
    Ok(solid)
}

/// Union of all polygons, folded pairwise.
pub fn union_all(polygons: &[Polygon<f64>]) -> MultiPolygon<f64> {
    polygons.iter().fold(MultiPolygon::new(vec![]), |acc, p| {
        acc.union(&MultiPolygon::new(vec![p.clone()]))
    })
}

/// Ring between the bordered outline and the image area.
fn frame(params: &MeshParams) -> Polygon<f64> {
    let b = params.border;
    let outer = rectangle(-b, -b, params.width + b, params.height + b);
    let inner = rectangle(0.0, 0.0, params.width, params.height);
    Polygon::new(outer.exterior().clone(), vec![inner.exterior().clone()])
}

fn rectangle(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)]),
        vec![],
    )
}

/// Extrude a polygon with holes from z = 0 to z = `height`.
///
/// Caps come from ear-clipping; walls are two triangles per ring edge.
/// Faces wind outward.
pub fn extrude_polygon(polygon: &Polygon<f64>, height: f64) -> Result<Solid, MeshError> {
    let polygon = polygon.orient(Direction::Default);

    let outer = open_ring(polygon.exterior());
    if outer.len() < 3 {
        return Err(MeshError::Invalid("outer ring has fewer than 3 points".to_string()));
    }
    let mut rings = vec![outer];
    rings.extend(
        polygon
            .interiors()
            .iter()
            .map(open_ring)
            .filter(|r| r.len() >= 3),
    );

    let mut coords: Vec<f64> = Vec::new();
    let mut hole_starts: Vec<usize> = Vec::new();
    let mut ring_starts: Vec<(usize, usize)> = Vec::new();
    for (i, ring) in rings.iter().enumerate() {
        let start = coords.len() / 2;
        if i > 0 {
            hole_starts.push(start);
        }
        ring_starts.push((start, ring.len()));
        coords.extend(ring.iter().flat_map(|p| [p[0], p[1]]));
    }

    let indices = earcut(&coords, &hole_starts, 2)
        .map_err(|_| MeshError::Invalid("triangulation failed".to_string()))?;
    if indices.len() < 3 || indices.len() % 3 != 0 {
        return Err(MeshError::Invalid("triangulation produced no triangles".to_string()));
    }

    let n = coords.len() / 2;
    let point = |i: usize| [coords[2 * i], coords[2 * i + 1]];

    let mut solid = Solid::new();
    for z in [0.0, height] {
        for i in 0..n {
            let [x, y] = point(i);
            solid.vertices.push([x, y, z]);
        }
    }

    let top = n as u32;
    for tri in indices.chunks_exact(3) {
        let (mut a, b, mut c) = (tri[0], tri[1], tri[2]);
        let area = signed_area(point(a), point(b), point(c));
        if area == 0.0 {
            continue;
        }
        if area < 0.0 {
            std::mem::swap(&mut a, &mut c);
        }
        let (a, b, c) = (a as u32, b as u32, c as u32);
        solid.faces.push([top + a, top + b, top + c]);
        solid.faces.push([c, b, a]);
    }

    for (start, len) in ring_starts {
        for k in 0..len {
            let a = (start + k) as u32;
            let b = (start + (k + 1) % len) as u32;
            solid.faces.push([a, b, top + b]);
            solid.faces.push([a, top + b, top + a]);
        }
    }

    Ok(solid)
}

fn signed_area(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    ((b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(stencil: bool, border: f64) -> MeshParams {
        MeshParams {
            width: 20.0,
            height: 10.0,
            thickness: 2.0,
            border,
            stencil,
        }
    }

    fn assert_outward(solid: &Solid) {
        assert!(solid.volume() > 0.0, "faces wind inward");
    }

    #[test]
    fn test_relief_rectangle_is_a_prism() {
        let solid = build_solid(&[rectangle(2.0, 3.0, 8.0, 7.0)], &params(false, 0.0)).unwrap();

        assert_eq!(solid.vertices.len(), 8);
        assert_eq!(solid.triangle_count(), 12);
        assert!((solid.volume() - 6.0 * 4.0 * 2.0).abs() < 1e-9);
        let (min, max) = solid.bounds().unwrap();
        assert_eq!(min, [2.0, 3.0, 0.0]);
        assert_eq!(max, [8.0, 7.0, 2.0]);
    }

    #[test]
    fn test_clockwise_input_still_winds_outward() {
        let cw = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]),
            vec![],
        );
        let solid = extrude_polygon(&cw, 1.0).unwrap();
        assert!((solid.volume() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_relief_with_hole_and_frame() {
        let ring = Polygon::new(
            rectangle(2.0, 2.0, 8.0, 8.0).exterior().clone(),
            vec![rectangle(4.0, 4.0, 6.0, 6.0).exterior().clone()],
        );
        let solid = build_solid(&[ring], &params(false, 1.0)).unwrap();

        let blob = (36.0 - 4.0) * 2.0;
        let frame = (22.0 * 12.0 - 20.0 * 10.0) * 2.0;
        assert!((solid.volume() - (blob + frame)).abs() < 1e-6);
        assert_outward(&solid);
    }

    #[test]
    fn test_stencil_without_blobs_is_the_plate() {
        let solid = build_solid(&[], &params(true, 5.0)).unwrap();

        assert_eq!(solid.vertices.len(), 8);
        assert_eq!(solid.triangle_count(), 12);
        assert!((solid.volume() - 30.0 * 20.0 * 2.0).abs() < 1e-9);
        let (min, max) = solid.bounds().unwrap();
        assert_eq!(min, [-5.0, -5.0, 0.0]);
        assert_eq!(max, [25.0, 15.0, 2.0]);
    }

    #[test]
    fn test_stencil_cuts_blobs_from_plate() {
        let blobs = [rectangle(2.0, 2.0, 6.0, 6.0), rectangle(10.0, 2.0, 14.0, 6.0)];
        let solid = build_solid(&blobs, &params(true, 0.0)).unwrap();

        let expected = (200.0 - 32.0) * 2.0;
        assert!((solid.volume() - expected).abs() < 1e-6);
        assert_outward(&solid);
    }

    #[test]
    fn test_relief_without_blobs_is_the_frame() {
        let solid = build_solid(&[], &params(false, 2.0)).unwrap();

        assert!((solid.volume() - (24.0 * 14.0 - 20.0 * 10.0) * 2.0).abs() < 1e-6);
        assert_outward(&solid);
        let (min, max) = solid.bounds().unwrap();
        assert_eq!(min, [-2.0, -2.0, 0.0]);
        assert_eq!(max, [22.0, 12.0, 2.0]);
    }

    #[test]
    fn test_relief_without_blobs_or_frame_is_empty() {
        assert_eq!(build_solid(&[], &params(false, 0.0)), Err(MeshError::Empty));
    }

    #[test]
    fn test_degenerate_polygon_is_rejected() {
        let line = Polygon::new(LineString::from(vec![(0.0, 0.0), (1.0, 0.0)]), vec![]);
        assert!(matches!(extrude_polygon(&line, 1.0), Err(MeshError::Invalid(_))));
    }
}
