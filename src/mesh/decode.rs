//! STL decoding for both the fixed-width binary layout and the line-oriented
//! text layout. Input is untrusted: every offset is bounds-checked and a short
//! buffer is an error, never a partial mesh.

use super::{Mesh, Triangle};
use crate::error::DecodeError;

pub const BINARY_HEADER_LEN: usize = 80;
pub const BINARY_PREAMBLE_LEN: usize = BINARY_HEADER_LEN + 4;
pub const BINARY_RECORD_LEN: usize = 50;

const TEXT_SENTINEL: &[u8] = b"solid";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Binary,
    Text,
}

/// Classifies a buffer. Text only when the first five bytes spell `solid`
/// (any case), whatever the length; everything else is treated as binary.
pub fn detect_encoding(buf: &[u8]) -> Encoding {
    match buf.get(..TEXT_SENTINEL.len()) {
        Some(head) if head.eq_ignore_ascii_case(TEXT_SENTINEL) => Encoding::Text,
        _ => Encoding::Binary,
    }
}

/// Decodes either encoding, picking the parser with [`detect_encoding`].
pub fn decode(buf: &[u8]) -> Result<Mesh, DecodeError> {
    let encoding = detect_encoding(buf);
    let mesh = match encoding {
        Encoding::Binary => decode_binary(buf)?,
        Encoding::Text => {
            let mesh = decode_text(buf)?;
            if mesh.is_empty() { reinterpret_empty_text(buf, mesh)? } else { mesh }
        }
    };
    log::debug!(
        "decoded {:?} STL: {} bytes, {} triangles",
        encoding,
        buf.len(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

pub fn decode_binary(buf: &[u8]) -> Result<Mesh, DecodeError> {
    if buf.len() < BINARY_PREAMBLE_LEN {
        return Err(DecodeError::format(format!(
            "{} bytes is shorter than the {BINARY_PREAMBLE_LEN}-byte binary header",
            buf.len()
        )));
    }

    let count = read_u32(buf, BINARY_HEADER_LEN) as usize;
    let needed = count
        .checked_mul(BINARY_RECORD_LEN)
        .and_then(|body| body.checked_add(BINARY_PREAMBLE_LEN))
        .ok_or_else(|| DecodeError::format(format!("triangle count {count} overflows")))?;
    if buf.len() < needed {
        return Err(DecodeError::format(format!(
            "header declares {count} triangles ({needed} bytes) but buffer has {} bytes",
            buf.len()
        )));
    }

    let mut mesh = Mesh::with_capacity(count);
    for record in buf[BINARY_PREAMBLE_LEN..needed].chunks_exact(BINARY_RECORD_LEN) {
        // Trailing 2-byte attribute field is ignored.
        mesh.push_triangle(Triangle {
            normal: read_vec3(record, 0),
            vertices: [read_vec3(record, 12), read_vec3(record, 24), read_vec3(record, 36)],
        });
    }
    Ok(mesh)
}

pub fn decode_text(buf: &[u8]) -> Result<Mesh, DecodeError> {
    let text = String::from_utf8_lossy(buf);

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut current_normal: Option<[f32; 3]> = None;

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };

        if keyword.eq_ignore_ascii_case("facet") {
            if tokens.next().is_some_and(|t| t.eq_ignore_ascii_case("normal")) {
                current_normal = Some(parse_triple(tokens, line_no)?);
            }
        } else if keyword.eq_ignore_ascii_case("vertex") {
            let position = parse_triple(tokens, line_no)?;
            let normal = current_normal.ok_or(DecodeError::MissingNormal { line: line_no })?;
            positions.push(position);
            normals.push(normal);
        }
    }

    if positions.len() % 3 != 0 {
        return Err(DecodeError::format(format!(
            "{} vertices do not form whole triangles",
            positions.len()
        )));
    }
    Mesh::from_vertices(positions, normals)
        .ok_or_else(|| DecodeError::format("vertex and normal counts differ"))
}

/// A `solid` buffer without facets is a binary file whose header happens to
/// start with `solid`, an empty text solid, or not an STL at all.
fn reinterpret_empty_text(buf: &[u8], empty: Mesh) -> Result<Mesh, DecodeError> {
    if exact_binary_count(buf).is_some_and(|count| count > 0) {
        log::debug!("'solid' header on a binary-sized buffer, decoding as binary");
        return decode_binary(buf);
    }
    let structured = String::from_utf8_lossy(buf).lines().any(|line| {
        line.split_whitespace()
            .next()
            .is_some_and(|k| k.eq_ignore_ascii_case("endsolid") || k.eq_ignore_ascii_case("facet"))
    });
    if structured {
        Ok(empty)
    } else {
        Err(DecodeError::format("starts with 'solid' but has no facets or 'endsolid'"))
    }
}

/// The declared triangle count, when the buffer is exactly that many binary
/// records long.
fn exact_binary_count(buf: &[u8]) -> Option<usize> {
    if buf.len() < BINARY_PREAMBLE_LEN {
        return None;
    }
    let count = read_u32(buf, BINARY_HEADER_LEN) as usize;
    let expected = count.checked_mul(BINARY_RECORD_LEN)?.checked_add(BINARY_PREAMBLE_LEN)?;
    (expected == buf.len()).then_some(count)
}

fn parse_triple<'a>(
    mut tokens: impl Iterator<Item = &'a str>,
    line: usize,
) -> Result<[f32; 3], DecodeError> {
    let mut out = [0.0f32; 3];
    for slot in &mut out {
        let token = tokens.next().ok_or_else(|| {
            DecodeError::format(format!("line {line}: expected three coordinates"))
        })?;
        *slot = token.parse().map_err(|_| DecodeError::Parse {
            line,
            token: token.to_string(),
        })?;
    }
    Ok(out)
}

// Callers guarantee `offset + 4 <= buf.len()`.
fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_le_bytes(b)
}

fn read_f32(buf: &[u8], offset: usize) -> f32 {
    f32::from_bits(read_u32(buf, offset))
}

fn read_vec3(buf: &[u8], offset: usize) -> [f32; 3] {
    [
        read_f32(buf, offset),
        read_f32(buf, offset + 4),
        read_f32(buf, offset + 8),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_wins_over_length() {
        assert_eq!(detect_encoding(b"solid"), Encoding::Text);
        assert_eq!(detect_encoding(b"SoLiD x"), Encoding::Text);
        assert_eq!(detect_encoding(b"soli"), Encoding::Binary);
        assert_eq!(detect_encoding(&[0u8; 84]), Encoding::Binary);
        assert_eq!(detect_encoding(&[]), Encoding::Binary);
    }

    #[test]
    fn short_binary_is_format_error() {
        let err = decode_binary(&[0u8; 83]).unwrap_err();
        assert!(matches!(err, DecodeError::Format { .. }));
    }

    #[test]
    fn zero_triangles_is_empty_mesh() {
        let mesh = decode_binary(&[0u8; 84]).unwrap();
        assert!(mesh.is_empty());
    }

    #[test]
    fn truncated_record_is_rejected() {
        let mut buf = vec![0u8; 84 + 49];
        buf[80..84].copy_from_slice(&1u32.to_le_bytes());
        assert!(matches!(decode_binary(&buf), Err(DecodeError::Format { .. })));
    }

    #[test]
    fn huge_declared_count_does_not_allocate() {
        let mut buf = vec![0u8; 84];
        buf[80..84].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(decode_binary(&buf).is_err());
    }

    #[test]
    fn exact_binary_count_needs_matching_length() {
        let mut buf = vec![0u8; 84 + 100];
        buf[80..84].copy_from_slice(&2u32.to_le_bytes());
        assert_eq!(exact_binary_count(&buf), Some(2));
        buf.push(0);
        assert_eq!(exact_binary_count(&buf), None);
        assert_eq!(exact_binary_count(b"solid"), None);
    }

    #[test]
    fn text_tolerates_whitespace_runs() {
        let src = "solid t\n  facet   normal 0 0 1\n\touter loop\n vertex 0  0 0\r\nvertex 1 0 0\nvertex 0 1\t0\nendloop\nendfacet\nendsolid t";
        let mesh = decode_text(src.as_bytes()).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.positions()[2], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn text_vertex_before_normal_is_rejected() {
        let src = "solid t\nvertex 0 0 0\n";
        assert_eq!(
            decode_text(src.as_bytes()),
            Err(DecodeError::MissingNormal { line: 2 })
        );
    }

    #[test]
    fn text_bad_number_reports_line() {
        let src = "solid t\nfacet normal 0 0 1\nvertex 0 zero 0\n";
        assert_eq!(
            decode_text(src.as_bytes()),
            Err(DecodeError::Parse { line: 3, token: "zero".into() })
        );
    }

    #[test]
    fn text_missing_coordinate_is_format_error() {
        let src = "solid t\nfacet normal 0 0\n";
        assert!(matches!(decode_text(src.as_bytes()), Err(DecodeError::Format { .. })));
    }

    #[test]
    fn text_partial_triangle_is_rejected() {
        let src = "solid t\nfacet normal 0 0 1\nvertex 0 0 0\nvertex 1 0 0\n";
        assert!(matches!(decode_text(src.as_bytes()), Err(DecodeError::Format { .. })));
    }
}
