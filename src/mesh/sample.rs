use glam::Vec3;

use super::{Mesh, Triangle};

const CORNERS: [[f32; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
];

// Two triangles per face, wound outward.
const FACES: [[usize; 3]; 12] = [
    [0, 3, 1],
    [1, 3, 2],
    [0, 4, 7],
    [0, 7, 3],
    [4, 5, 6],
    [4, 6, 7],
    [5, 1, 2],
    [5, 2, 6],
    [2, 3, 6],
    [3, 7, 6],
    [0, 1, 5],
    [0, 5, 4],
];

/// Axis-aligned cube centred on the origin with corners at `±half_extent`.
pub fn cube(half_extent: f32) -> Mesh {
    Mesh::from_triangles(FACES.iter().map(|face| {
        let [a, b, c] = face.map(|i| Vec3::from_array(CORNERS[i]) * half_extent);
        Triangle {
            normal: face_normal(a, b, c).to_array(),
            vertices: [a.to_array(), b.to_array(), c.to_array()],
        }
    }))
}

/// Unit normal from the winding order, `+Z` for degenerate triangles.
pub fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).try_normalize().unwrap_or(Vec3::Z)
}
