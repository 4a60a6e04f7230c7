//! Text mesh importer
//!
//! Reads the line-oriented `v` / `vn` / `f` subset of the Wavefront format.
//! Face corners are deduplicated by their `(position index, normal index)`
//! pair and every triangle is rewound so that its winding agrees with the
//! normal of its second corner.

use std::collections::HashMap;

use glam::Vec3;
use thiserror::Error;

use super::mesh::{Mesh, Vertex};

/// Color given to every imported vertex
pub const IMPORTED_VERTEX_COLOR: Vec3 = Vec3::new(0.9, 0.9, 0.9);

/// Errors produced while importing a mesh. Line numbers are 1-based.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshImportError {
    #[error("line {line}: invalid number '{token}'")]
    InvalidNumber { line: usize, token: String },
    #[error("line {line}: '{keyword}' needs {expected} components")]
    MissingComponent {
        line: usize,
        keyword: &'static str,
        expected: usize,
    },
    #[error("line {line}: {kind} index {index} is out of range (1..={available})")]
    IndexOutOfRange {
        line: usize,
        kind: &'static str,
        index: i64,
        available: usize,
    },
    #[error("line {line}: face is unterminated")]
    UnterminatedFace { line: usize },
    #[error("line {line}: face uses the same vertex twice")]
    DegenerateFace { line: usize },
    #[error("line {line}: faces with {corners} corners are not supported")]
    UnsupportedPolygon { line: usize, corners: usize },
    #[error("mesh file is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

type ImportResult<T> = Result<T, MeshImportError>;

/// Import a mesh from the full contents of a text mesh file.
pub fn import_mesh(name: &str, bytes: &[u8]) -> ImportResult<Mesh> {
    let text = std::str::from_utf8(bytes)?;
    let mut importer = Importer::new(name);
    for (number, line) in text.lines().enumerate() {
        importer.line(number + 1, line)?;
    }
    log::debug!(
        "Imported mesh '{}': {} vertices, {} triangles",
        name,
        importer.mesh.vertex_count(),
        importer.mesh.triangle_count()
    );
    Ok(importer.mesh)
}

struct Importer {
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    slots: HashMap<(usize, usize), u32>,
    mesh: Mesh,
}

impl Importer {
    fn new(name: &str) -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            slots: HashMap::new(),
            mesh: Mesh::new(name),
        }
    }

    fn line(&mut self, line: usize, text: &str) -> ImportResult<()> {
        let mut tokens = text.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let position = parse_vec3(line, "v", &mut tokens)?;
                self.positions.push(position);
            }
            Some("vn") => {
                let normal = parse_vec3(line, "vn", &mut tokens)?;
                self.normals.push(normal.normalize_or_zero());
            }
            Some("f") => {
                let corners: Vec<&str> = tokens.collect();
                match corners.len() {
                    0..=2 => return Err(MeshImportError::UnterminatedFace { line }),
                    3 => {}
                    n => return Err(MeshImportError::UnsupportedPolygon { line, corners: n }),
                }
                let mut slots = [0u32; 3];
                for (slot, corner) in slots.iter_mut().zip(&corners) {
                    *slot = self.corner(line, corner)?;
                }
                self.triangle(line, slots)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Resolve one `p/t/n` corner to its output slot, allocating on first sight.
    fn corner(&mut self, line: usize, corner: &str) -> ImportResult<u32> {
        let mut fields = corner.split('/');
        let position_field = fields.next().unwrap_or_default();
        // Texture coordinate slot, parsed over and discarded
        let _ = fields.next();
        let normal_field = match fields.next() {
            Some(field) if !field.is_empty() => field,
            _ => return Err(MeshImportError::UnterminatedFace { line }),
        };

        let position = resolve_index(line, "position", position_field, self.positions.len())?;
        let normal = resolve_index(line, "normal", normal_field, self.normals.len())?;

        if let Some(&slot) = self.slots.get(&(position, normal)) {
            return Ok(slot);
        }
        let slot = self.mesh.vertices.len() as u32;
        self.mesh.vertices.push(Vertex::new(
            self.positions[position],
            IMPORTED_VERTEX_COLOR,
            self.normals[normal],
        ));
        self.slots.insert((position, normal), slot);
        Ok(slot)
    }

    fn triangle(&mut self, line: usize, mut slots: [u32; 3]) -> ImportResult<()> {
        if slots[0] == slots[1] || slots[1] == slots[2] || slots[0] == slots[2] {
            return Err(MeshImportError::DegenerateFace { line });
        }
        let [v0, v1, v2] = slots.map(|s| self.mesh.vertices[s as usize]);
        let facing = (v2.position - v0.position)
            .cross(v1.position - v0.position)
            .dot(v1.normal);
        if facing < 0.0 {
            slots.swap(1, 2);
        }
        self.mesh.indices.extend_from_slice(&slots);
        Ok(())
    }
}

fn parse_vec3<'a>(
    line: usize,
    keyword: &'static str,
    tokens: &mut impl Iterator<Item = &'a str>,
) -> ImportResult<Vec3> {
    let mut components = [0.0f32; 3];
    for component in components.iter_mut() {
        let token = tokens.next().ok_or(MeshImportError::MissingComponent {
            line,
            keyword,
            expected: 3,
        })?;
        *component = token
            .parse::<f32>()
            .map_err(|_| MeshImportError::InvalidNumber {
                line,
                token: token.to_string(),
            })?;
    }
    Ok(Vec3::from_array(components))
}

/// Turn a 1-based index token into a 0-based index into `available` entries.
fn resolve_index(
    line: usize,
    kind: &'static str,
    token: &str,
    available: usize,
) -> ImportResult<usize> {
    let index = token
        .parse::<i64>()
        .map_err(|_| MeshImportError::InvalidNumber {
            line,
            token: token.to_string(),
        })?;
    if index < 1 || index as u64 > available as u64 {
        return Err(MeshImportError::IndexOutOfRange {
            line,
            kind,
            index,
            available,
        });
    }
    Ok(index as usize - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_POSITIONS: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\n";

    fn import(text: &str) -> ImportResult<Mesh> {
        import_mesh("test", text.as_bytes())
    }

    fn positions_in_index_order(mesh: &Mesh) -> Vec<Vec3> {
        mesh.indices
            .iter()
            .map(|&i| mesh.vertices[i as usize].position)
            .collect()
    }

    fn assert_winding(mesh: &Mesh) {
        for [i0, i1, i2] in mesh.triangles() {
            let v0 = mesh.vertices[i0 as usize];
            let v1 = mesh.vertices[i1 as usize];
            let v2 = mesh.vertices[i2 as usize];
            let facing = (v2.position - v0.position)
                .cross(v1.position - v0.position)
                .dot(v1.normal);
            assert!(facing >= 0.0, "triangle {:?} faces away from its normal", [i0, i1, i2]);
        }
    }

    #[test]
    fn test_single_triangle_imports_three_vertices() {
        let mesh = import(&format!("{}f 1/0/1 2/0/1 3/0/1", TRIANGLE_POSITIONS)).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh
            .vertices
            .iter()
            .all(|v| v.color == IMPORTED_VERTEX_COLOR && v.normal == Vec3::Z));
        assert_winding(&mesh);
    }

    #[test]
    fn test_both_corner_orders_resolve_to_the_same_winding() {
        let forward = import(&format!("{}f 1/0/1 2/0/1 3/0/1", TRIANGLE_POSITIONS)).unwrap();
        let reversed = import(&format!("{}f 1/0/1 3/0/1 2/0/1", TRIANGLE_POSITIONS)).unwrap();

        // (v2 - v0) x (v1 - v0) points down -Z for 1,2,3, so that order is swapped
        assert_eq!(forward.indices, vec![0, 2, 1]);
        assert_eq!(reversed.indices, vec![0, 1, 2]);
        assert_eq!(
            positions_in_index_order(&forward),
            positions_in_index_order(&reversed)
        );
        assert_eq!(
            positions_in_index_order(&forward),
            vec![Vec3::ZERO, Vec3::Y, Vec3::X]
        );
    }

    #[test]
    fn test_shared_corners_reuse_slots() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\n\
                    vn 0 0 1\nvn 0 0 -1\n\
                    f 1//1 3//1 2//1\n\
                    f 2//1 3//1 4//1\n\
                    f 1//2 2//2 3//2\n";
        let mesh = import(text).unwrap();

        // Four (position, normal) pairs with normal 1, three more with normal 2
        assert_eq!(mesh.vertex_count(), 7);
        assert_eq!(mesh.triangle_count(), 3);
        // Slots are allocated in first-seen order
        assert_eq!(mesh.vertices[0].position, Vec3::ZERO);
        assert_eq!(mesh.vertices[1].position, Vec3::Y);
        assert_eq!(mesh.vertices[2].position, Vec3::X);
        assert_eq!(mesh.vertices[3].position, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(mesh.vertices[4].normal, -Vec3::Z);
        assert_winding(&mesh);
    }

    #[test]
    fn test_identical_positions_via_different_indices_stay_distinct() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 0 0 0\nvn 0 0 1\n\
                    f 1//1 3//1 2//1\n\
                    f 4//1 3//1 2//1\n";
        let mesh = import(text).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn test_normals_are_normalized_and_unknown_lines_skipped() {
        let text = "# comment\no thing\nv 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0.5 0.5\n\
                    vn 0 0 5\ns off\n\nf 1/1/1 3/1/1 2/1/1\n";
        let mesh = import(text).unwrap();
        assert_eq!(mesh.vertices[0].normal, Vec3::Z);
    }

    #[test]
    fn test_malformed_number() {
        assert_eq!(
            import("v 0 zero 0"),
            Err(MeshImportError::InvalidNumber {
                line: 1,
                token: "zero".into()
            })
        );
    }

    #[test]
    fn test_missing_component() {
        assert_eq!(
            import("v 0 0 0\nvn 0 1"),
            Err(MeshImportError::MissingComponent {
                line: 2,
                keyword: "vn",
                expected: 3
            })
        );
    }

    #[test]
    fn test_forward_reference_is_out_of_range() {
        let text = "v 0 0 0\nv 1 0 0\nvn 0 0 1\nf 1//1 2//1 3//1\nv 0 1 0\n";
        assert_eq!(
            import(text),
            Err(MeshImportError::IndexOutOfRange {
                line: 4,
                kind: "position",
                index: 3,
                available: 2
            })
        );
    }

    #[test]
    fn test_zero_index_is_out_of_range() {
        let text = format!("{}f 1/0/0 2/0/1 3/0/1", TRIANGLE_POSITIONS);
        assert!(matches!(
            import(&text),
            Err(MeshImportError::IndexOutOfRange { kind: "normal", index: 0, .. })
        ));
    }

    #[test]
    fn test_unterminated_faces() {
        let short = format!("{}f 1/0/1 2/0/1", TRIANGLE_POSITIONS);
        assert_eq!(import(&short), Err(MeshImportError::UnterminatedFace { line: 5 }));

        let no_normal = format!("{}f 1/0/1 2/0 3/0/1", TRIANGLE_POSITIONS);
        assert_eq!(import(&no_normal), Err(MeshImportError::UnterminatedFace { line: 5 }));

        let bare = format!("{}f 1 2 3", TRIANGLE_POSITIONS);
        assert_eq!(import(&bare), Err(MeshImportError::UnterminatedFace { line: 5 }));
    }

    #[test]
    fn test_quads_are_rejected() {
        let text = format!("{}v 1 1 0\nf 1//1 2//1 4//1 3//1", TRIANGLE_POSITIONS);
        assert_eq!(
            import(&text),
            Err(MeshImportError::UnsupportedPolygon { line: 6, corners: 4 })
        );
    }

    #[test]
    fn test_repeated_corner_is_degenerate() {
        let text = format!("{}f 1//1 2//1 1//1", TRIANGLE_POSITIONS);
        assert_eq!(import(&text), Err(MeshImportError::DegenerateFace { line: 5 }));
    }

    #[test]
    fn test_invalid_utf8() {
        assert!(matches!(
            import_mesh("bin", &[b'v', b' ', 0xff, 0xfe]),
            Err(MeshImportError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_empty_file_is_an_empty_mesh() {
        let mesh = import("").unwrap();
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.index_count(), 0);
    }
}
