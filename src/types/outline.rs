//! Vector outlines for one layer.

use geo::Polygon;

use super::Colour;

/// Closed rings (outer then holes, per polygon) plus a fill colour.
#[derive(Debug, Clone)]
pub struct LayerOutline {
    pub layer: u32,
    /// 1-based position in the run's layer list, used for file naming.
    pub index: usize,
    pub colour: Colour,
    pub polygons: Vec<Polygon<f64>>,
}

impl LayerOutline {
    /// Every ring as an open point list (no repeated closing point), each
    /// polygon's outer ring followed by its holes.
    pub fn rings(&self) -> Vec<Vec<[f64; 2]>> {
        let mut rings = Vec::new();
        for polygon in &self.polygons {
            rings.push(open_ring(polygon.exterior()));
            for hole in polygon.interiors() {
                rings.push(open_ring(hole));
            }
        }
        rings
    }

    pub fn hole_count(&self) -> usize {
        self.polygons.iter().map(|p| p.interiors().len()).sum()
    }

    /// A layer with nothing to draw. Stencil export still cuts a plate for it.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}

/// Ring points without the duplicated closing coordinate.
pub fn open_ring(ring: &geo::LineString<f64>) -> Vec<[f64; 2]> {
    let mut points: Vec<[f64; 2]> = ring.coords().map(|c| [c.x, c.y]).collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}
