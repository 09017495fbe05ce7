//! STL writers for the two layouts [`super::decode`] understands.

use std::fmt::Write as _;

use super::decode::{BINARY_HEADER_LEN, BINARY_PREAMBLE_LEN, BINARY_RECORD_LEN};
use super::Mesh;

/// Binary STL:
/// - 80-byte header (`header` truncated or zero-padded)
/// - u32 triangle count (little-endian)
/// - per triangle: 3×f32 normal + 3×(3×f32 vertex) + u16 attribute = 50 bytes
pub fn encode_binary(mesh: &Mesh, header: &str) -> Vec<u8> {
    let count = mesh.triangle_count();
    let mut buf = Vec::with_capacity(BINARY_PREAMBLE_LEN + count * BINARY_RECORD_LEN);

    let header = header.as_bytes();
    buf.extend_from_slice(&header[..header.len().min(BINARY_HEADER_LEN)]);
    buf.resize(BINARY_HEADER_LEN, 0u8);
    buf.extend_from_slice(&(count as u32).to_le_bytes());

    for tri in mesh.triangles() {
        for c in tri.normal {
            buf.extend_from_slice(&c.to_le_bytes());
        }
        for v in tri.vertices {
            for c in v {
                buf.extend_from_slice(&c.to_le_bytes());
            }
        }
        buf.extend_from_slice(&0u16.to_le_bytes());
    }
    buf
}

pub fn encode_text(mesh: &Mesh, name: &str) -> String {
    let mut out = String::with_capacity(mesh.triangle_count() * 256);
    let _ = writeln!(out, "solid {name}");
    for tri in mesh.triangles() {
        let [nx, ny, nz] = tri.normal;
        let _ = writeln!(out, "  facet normal {nx:e} {ny:e} {nz:e}");
        out.push_str("    outer loop\n");
        for [x, y, z] in tri.vertices {
            let _ = writeln!(out, "      vertex {x:e} {y:e} {z:e}");
        }
        out.push_str("    endloop\n");
        out.push_str("  endfacet\n");
    }
    let _ = writeln!(out, "endsolid {name}");
    out
}
