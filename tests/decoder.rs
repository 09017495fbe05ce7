use approx::assert_relative_eq;
use cadbridge_viewer::mesh::encode::{encode_binary, encode_text};
use cadbridge_viewer::mesh::{decode, sample, decode_binary, decode_text, detect_encoding, Encoding, Mesh, Triangle};
use cadbridge_viewer::DecodeError;
use proptest::prelude::*;

fn binary_single_triangle() -> Vec<u8> {
    let mut buf = vec![0u8; 80];
    buf.extend_from_slice(&1u32.to_le_bytes());
    for f in [0.0f32, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        buf.extend_from_slice(&f.to_le_bytes());
    }
    buf.extend_from_slice(&[0, 0]);
    buf
}

const TEXT_SINGLE_TRIANGLE: &str = "solid s\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\nendloop\nendfacet\nendsolid s\n";

#[test]
fn binary_triangle_decodes() {
    let buf = binary_single_triangle();
    assert_eq!(buf.len(), 134);
    assert_eq!(detect_encoding(&buf), Encoding::Binary);

    let mesh = decode(&buf).unwrap();
    assert_eq!(mesh.positions(), &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    assert_eq!(mesh.normals(), &[[0.0, 0.0, 1.0]; 3]);
    let size = mesh.bounds().unwrap().size();
    assert_eq!(size.to_array(), [1.0, 1.0, 0.0]);
}

#[test]
fn text_triangle_matches_binary() {
    assert_eq!(detect_encoding(TEXT_SINGLE_TRIANGLE.as_bytes()), Encoding::Text);
    let text = decode(TEXT_SINGLE_TRIANGLE.as_bytes()).unwrap();
    let binary = decode(&binary_single_triangle()).unwrap();
    assert_eq!(text, binary);
}

#[test]
fn sentinel_detection_ignores_case_and_length() {
    assert_eq!(detect_encoding(b"SoLiD"), Encoding::Text);
    assert_eq!(detect_encoding(b"solid"), Encoding::Text);
    assert_eq!(detect_encoding(b"sol"), Encoding::Binary);
    assert_eq!(detect_encoding(&[0u8; 84]), Encoding::Binary);
}

#[test]
fn zeroed_preamble_is_an_empty_mesh() {
    let mesh = decode(&[0u8; 84]).unwrap();
    assert!(mesh.is_empty());
    assert_eq!(mesh.bounds(), None);
}

#[test]
fn truncated_binary_is_a_format_error() {
    let mut buf = binary_single_triangle();
    buf.pop();
    assert!(matches!(decode_binary(&buf), Err(DecodeError::Format { .. })));
    assert!(matches!(decode(&buf[..40]), Err(DecodeError::Format { .. })));
}

#[test]
fn text_errors_are_surfaced() {
    let bad_number = TEXT_SINGLE_TRIANGLE.replace("vertex 1 0 0", "vertex 1 zero 0");
    match decode_text(bad_number.as_bytes()) {
        Err(DecodeError::Parse { line, token }) => {
            assert_eq!(line, 5);
            assert_eq!(token, "zero");
        }
        other => panic!("expected parse error, got {other:?}"),
    }

    let no_normal = "solid s\nvertex 0 0 0\nvertex 1 0 0\nvertex 0 1 0\nendsolid s\n";
    assert!(matches!(decode_text(no_normal.as_bytes()), Err(DecodeError::MissingNormal { line: 2 })));
}

#[test]
fn binary_with_solid_header_still_decodes() {
    let buf = encode_binary(&sample::cube(1.0), "solid part exported by CAD");
    assert_eq!(detect_encoding(&buf), Encoding::Text);
    assert_eq!(buf.len(), 84 + 12 * 50);

    let mesh = decode(&buf).unwrap();
    assert_eq!(mesh, decode_binary(&buf).unwrap());
    assert_eq!(mesh.triangle_count(), 12);
}

#[test]
fn solid_without_facets_is_not_an_empty_mesh() {
    assert!(matches!(decode(b"solid but nothing else"), Err(DecodeError::Format { .. })));
    assert!(matches!(decode(b"solid"), Err(DecodeError::Format { .. })));

    let empty = decode(b"solid empty\nendsolid empty\n").unwrap();
    assert!(empty.is_empty());
}

#[test]
fn binary_and_text_encoders_round_trip() {
    let mesh = Mesh::from_triangles([
        Triangle { normal: [0.0, 0.0, 1.0], vertices: [[0.5, -1.25, 3.0], [1e-3, 2.0, 0.0], [-7.5, 0.0, 1e4]] },
        Triangle { normal: [1.0, 0.0, 0.0], vertices: [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]] },
    ]);
    let from_binary = decode(&encode_binary(&mesh, "round trip")).unwrap();
    let from_text = decode(encode_text(&mesh, "round_trip").as_bytes()).unwrap();
    for decoded in [&from_binary, &from_text] {
        assert_eq!(decoded.normals(), mesh.normals());
        for (a, b) in decoded.positions().iter().zip(mesh.positions()) {
            for k in 0..3 {
                assert_relative_eq!(a[k], b[k], epsilon = 1e-6, max_relative = 1e-6);
            }
        }
    }
}

fn coord() -> impl Strategy<Value = f32> {
    -1.0e4f32..1.0e4f32
}

fn triangle() -> impl Strategy<Value = Triangle> {
    (prop::array::uniform3(coord()), prop::array::uniform3(prop::array::uniform3(coord())))
        .prop_map(|(normal, vertices)| Triangle { normal, vertices })
}

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..600)) {
        let _ = decode(&bytes);
        let _ = decode_text(&bytes);
    }

    #[test]
    fn binary_round_trip_replicates_normals(tris in prop::collection::vec(triangle(), 0..32)) {
        let mesh = Mesh::from_triangles(tris);
        let decoded = decode(&encode_binary(&mesh, "prop")).unwrap();
        prop_assert_eq!(decoded.positions().len(), 3 * mesh.triangle_count());
        prop_assert_eq!(decoded.normals().len(), 3 * mesh.triangle_count());
        for t in decoded.normals().chunks_exact(3) {
            prop_assert!(t[0] == t[1] && t[1] == t[2]);
        }
        prop_assert_eq!(decoded, mesh);
    }
}
