//! In-memory triangle soup shared by the decoder, the encoders and the viewport.
//!
//! Every triangle contributes three vertices and the face normal is repeated
//! once per vertex, so `positions().len() == normals().len() == 3 * triangle_count()`
//! holds for every mesh this module hands out.

pub mod decode;
pub mod edges;
pub mod encode;
pub mod sample;

use glam::Vec3;

pub use decode::{decode, decode_binary, decode_text, detect_encoding, Encoding};

/// One facet: three corner positions plus the face normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub normal: [f32; 3],
    pub vertices: [[f32; 3]; 3],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(triangles: usize) -> Self {
        Self {
            positions: Vec::with_capacity(triangles * 3),
            normals: Vec::with_capacity(triangles * 3),
        }
    }

    pub fn from_triangles(triangles: impl IntoIterator<Item = Triangle>) -> Self {
        let mut mesh = Self::new();
        for t in triangles {
            mesh.push_triangle(t);
        }
        mesh
    }

    pub fn push_triangle(&mut self, triangle: Triangle) {
        for v in triangle.vertices {
            self.positions.push(v);
            self.normals.push(triangle.normal);
        }
    }

    /// Builds a mesh from per-vertex arrays. Returns `None` unless both arrays
    /// have the same length and that length is a multiple of three.
    pub fn from_vertices(positions: Vec<[f32; 3]>, normals: Vec<[f32; 3]>) -> Option<Self> {
        if positions.len() != normals.len() || positions.len() % 3 != 0 {
            return None;
        }
        Some(Self { positions, normals })
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Triangles in decode order.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.positions
            .chunks_exact(3)
            .zip(self.normals.chunks_exact(3))
            .map(|(p, n)| Triangle {
                normal: n[0],
                vertices: [p[0], p[1], p[2]],
            })
    }

    /// Axis-aligned bounds over all vertex positions, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<Aabb> {
        let mut points = self.positions.iter().map(|p| Vec3::from_array(*p));
        let first = points.next()?;
        Some(points.fold(Aabb { min: first, max: first }, |mut bb, p| {
            bb.min = bb.min.min(p);
            bb.max = bb.max.max(p);
            bb
        }))
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Width, height and depth.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn max_extent(&self) -> f32 {
        self.size().max_element()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Triangle {
        Triangle {
            normal: [0.0, 0.0, 1.0],
            vertices: [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        }
    }

    #[test]
    fn normals_are_replicated_per_vertex() {
        let mesh = Mesh::from_triangles([unit_triangle()]);
        assert_eq!(mesh.positions().len(), 3);
        assert_eq!(mesh.normals(), &[[0.0, 0.0, 1.0]; 3]);
        assert_eq!(mesh.triangles().next(), Some(unit_triangle()));
    }

    #[test]
    fn bounds_of_flat_triangle() {
        let mesh = Mesh::from_triangles([unit_triangle()]);
        let bb = mesh.bounds().unwrap();
        assert_eq!(bb.size(), Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(bb.center(), Vec3::new(0.5, 0.5, 0.0));
        assert_eq!(bb.max_extent(), 1.0);
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        assert!(Mesh::new().bounds().is_none());
        assert_eq!(Mesh::new().triangle_count(), 0);
    }

    #[test]
    fn from_vertices_rejects_mismatched_arrays() {
        assert!(Mesh::from_vertices(vec![[0.0; 3]; 3], vec![[0.0; 3]; 2]).is_none());
        assert!(Mesh::from_vertices(vec![[0.0; 3]; 2], vec![[0.0; 3]; 2]).is_none());
        assert!(Mesh::from_vertices(vec![[0.0; 3]; 3], vec![[0.0; 3]; 3]).is_some());
    }
}
