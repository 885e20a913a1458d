//! Vertex/face meshes produced by extrusion.

/// A triangle mesh for one layer.
///
/// Faces index into `vertices` and wind counter-clockwise when viewed from
/// outside the solid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solid {
    pub vertices: Vec<[f64; 3]>,
    pub faces: Vec<[u32; 3]>,
}

impl Solid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Append another mesh without merging any vertices.
    pub fn append(&mut self, other: Solid) {
        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.faces
            .extend(other.faces.into_iter().map(|[a, b, c]| [a + base, b + base, c + base]));
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<([f64; 3], [f64; 3])> {
        let first = *self.vertices.first()?;
        let mut min = first;
        let mut max = first;
        for v in &self.vertices {
            for i in 0..3 {
                min[i] = min[i].min(v[i]);
                max[i] = max[i].max(v[i]);
            }
        }
        Some((min, max))
    }

    /// Enclosed volume via the divergence theorem.
    ///
    /// Positive when faces are wound outward.
    pub fn volume(&self) -> f64 {
        self.faces
            .iter()
            .map(|f| {
                let [a, b, c] = self.triangle(f);
                dot(a, cross(b, c)) / 6.0
            })
            .sum()
    }

    /// Unit normal of a face from its winding; zero for degenerate faces.
    pub fn face_normal(&self, face: &[u32; 3]) -> [f64; 3] {
        let [a, b, c] = self.triangle(face);
        let n = cross(sub(b, a), sub(c, a));
        let len = dot(n, n).sqrt();
        if len > 0.0 {
            [n[0] / len, n[1] / len, n[2] / len]
        } else {
            [0.0; 3]
        }
    }

    /// Structural checks: non-empty, indices in range, finite coordinates.
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.faces.is_empty() {
            return Err("mesh has no faces".to_string());
        }
        let n = self.vertices.len() as u32;
        if let Some(face) = self.faces.iter().find(|f| f.iter().any(|&i| i >= n)) {
            return Err(format!("face {:?} indexes past {} vertices", face, n));
        }
        if self.vertices.iter().flatten().any(|c| !c.is_finite()) {
            return Err("mesh has non-finite coordinates".to_string());
        }
        Ok(())
    }

    fn triangle(&self, face: &[u32; 3]) -> [[f64; 3]; 3] {
        [
            self.vertices[face[0] as usize],
            self.vertices[face[1] as usize],
            self.vertices[face[2] as usize],
        ]
    }
}

fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unit tetrahedron with outward winding.
    fn tetra() -> Solid {
        Solid {
            vertices: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            faces: vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        }
    }

    #[test]
    fn test_volume_of_tetrahedron() {
        assert!((tetra().volume() - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_append_offsets_indices() {
        let mut a = tetra();
        a.append(tetra());
        assert_eq!(a.vertices.len(), 8);
        assert_eq!(a.faces[4], [4, 6, 5]);
        assert!((a.volume() - 2.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_bounds() {
        let (min, max) = tetra().bounds().unwrap();
        assert_eq!(min, [0.0, 0.0, 0.0]);
        assert_eq!(max, [1.0, 1.0, 1.0]);
        assert!(Solid::new().bounds().is_none());
    }

    #[test]
    fn test_face_normal() {
        let t = tetra();
        assert_eq!(t.face_normal(&[0, 2, 1]), [0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_check() {
        assert!(tetra().check().is_ok());
        assert!(Solid::new().check().is_err());
        let mut bad = tetra();
        bad.faces.push([0, 1, 9]);
        assert!(bad.check().is_err());
    }
}
