//! Edge extraction for the wireframe overlay.
//!
//! Vertices are welded by quantised position so triangle soups share edges.
//! An edge is kept when only one face uses it or when its two faces meet at
//! more than the threshold angle; coplanar interior edges are dropped.

use std::collections::HashMap;

use glam::Vec3;

use super::Mesh;

type QuantizedPos = (i64, i64, i64);

fn quantize_position(pos: Vec3) -> QuantizedPos {
    let scale = 10000.0;
    (
        (pos.x * scale).round() as i64,
        (pos.y * scale).round() as i64,
        (pos.z * scale).round() as i64,
    )
}

fn edge_key(p1: QuantizedPos, p2: QuantizedPos) -> (QuantizedPos, QuantizedPos) {
    if p1 < p2 { (p1, p2) } else { (p2, p1) }
}

/// Line segments of the overlay, in mesh space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeSet {
    pub segments: Vec<[[f32; 3]; 2]>,
}

impl EdgeSet {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

struct EdgeEntry {
    start: Vec3,
    end: Vec3,
    normal: Vec3,
    other: Option<Vec3>,
    // Third and later faces on a non-manifold edge.
    extra_faces: bool,
}

pub fn feature_edges(mesh: &Mesh, threshold_degrees: f32) -> EdgeSet {
    let cos_threshold = threshold_degrees.to_radians().cos();
    let mut edge_map: HashMap<(QuantizedPos, QuantizedPos), EdgeEntry> = HashMap::new();
    let mut order = Vec::new();

    for tri in mesh.triangles() {
        let [v0, v1, v2] = tri.vertices.map(Vec3::from_array);
        let q = [v0, v1, v2].map(quantize_position);
        if q[0] == q[1] || q[1] == q[2] || q[2] == q[0] {
            continue;
        }
        let Some(normal) = (v1 - v0).cross(v2 - v0).try_normalize() else {
            continue;
        };

        for (qa, qb, va, vb) in [(q[0], q[1], v0, v1), (q[1], q[2], v1, v2), (q[2], q[0], v2, v0)] {
            let key = edge_key(qa, qb);
            match edge_map.get_mut(&key) {
                Some(entry) if entry.other.is_none() => entry.other = Some(normal),
                Some(entry) => entry.extra_faces = true,
                None => {
                    order.push(key);
                    edge_map.insert(
                        key,
                        EdgeEntry { start: va, end: vb, normal, other: None, extra_faces: false },
                    );
                }
            }
        }
    }

    // Walk in first-seen order so the overlay is deterministic.
    let segments = order
        .iter()
        .filter_map(|key| edge_map.get(key))
        .filter(|e| match e.other {
            None => true,
            Some(n2) => e.extra_faces || e.normal.dot(n2) <= cos_threshold,
        })
        .map(|e| [e.start.to_array(), e.end.to_array()])
        .collect();

    EdgeSet { segments }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{sample, Triangle};

    #[test]
    fn cube_keeps_only_the_twelve_box_edges() {
        let edges = feature_edges(&sample::cube(10.0), 1.0);
        assert_eq!(edges.len(), 12);
    }

    #[test]
    fn lone_triangle_is_all_boundary() {
        let mesh = Mesh::from_triangles([Triangle {
            normal: [0.0, 0.0, 1.0],
            vertices: [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        }]);
        assert_eq!(feature_edges(&mesh, 1.0).len(), 3);
    }

    #[test]
    fn degenerate_triangles_are_skipped() {
        let mesh = Mesh::from_triangles([Triangle {
            normal: [0.0, 0.0, 1.0],
            vertices: [[0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        }]);
        assert!(feature_edges(&mesh, 1.0).is_empty());
        assert!(feature_edges(&Mesh::new(), 1.0).is_empty());
    }
}
