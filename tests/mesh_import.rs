//! Importer properties checked over whole files.

use std::collections::HashSet;
use std::fmt::Write;

use glam::Vec3;

use fogmap_renderer::assets::MODEL;
use fogmap_renderer::resources::{import_mesh, Mesh};

/// Every triangle faces the normal of its middle corner
fn assert_winding(mesh: &Mesh) {
    for [i0, i1, i2] in mesh.triangles() {
        let [v0, v1, v2] = [i0, i1, i2].map(|i| mesh.vertices[i as usize]);
        let facing = (v2.position - v0.position)
            .cross(v1.position - v0.position)
            .dot(v1.normal);
        assert!(facing >= 0.0, "triangle {:?} faces away ({})", [i0, i1, i2], facing);
    }
}

/// A height field of quads, each split into two triangles whose corner order
/// alternates, with one normal per row.
fn height_field(size: usize) -> String {
    let mut text = String::from("# generated\n");
    for z in 0..=size {
        for x in 0..=size {
            let height = ((x * 7 + z * 3) % 5) as f32 * 0.1;
            writeln!(text, "v {} {} {}", x, height, z).unwrap();
        }
    }
    for z in 0..size {
        writeln!(text, "vn 0 {} {}", 1.0, z as f32 * 0.05).unwrap();
    }
    let at = |x: usize, z: usize| z * (size + 1) + x + 1;
    for z in 0..size {
        let n = z + 1;
        for x in 0..size {
            let (a, b, c, d) = (at(x, z), at(x + 1, z), at(x, z + 1), at(x + 1, z + 1));
            if (x + z) % 2 == 0 {
                writeln!(text, "f {a}//{n} {b}//{n} {c}//{n}").unwrap();
                writeln!(text, "f {b}/7/{n} {d}/7/{n} {c}/7/{n}").unwrap();
            } else {
                writeln!(text, "f {a}//{n} {c}//{n} {b}//{n}").unwrap();
                writeln!(text, "f {b}//{n} {c}//{n} {d}//{n}").unwrap();
            }
        }
    }
    text
}

#[test]
fn test_both_corner_orders_agree() {
    let positions = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\n";
    let first = import_mesh("a", format!("{positions}f 1/0/1 2/0/1 3/0/1").as_bytes()).unwrap();
    let second = import_mesh("b", format!("{positions}f 1/0/1 3/0/1 2/0/1").as_bytes()).unwrap();

    assert_eq!(first.vertex_count(), 3);
    assert_eq!(first.triangle_count(), 1);
    assert_winding(&first);
    assert_winding(&second);

    let ordered = |mesh: &Mesh| -> Vec<Vec3> {
        mesh.indices
            .iter()
            .map(|&i| mesh.vertices[i as usize].position)
            .collect()
    };
    assert_eq!(ordered(&first), ordered(&second));
}

#[test]
fn test_generated_field_keeps_winding_and_identity() {
    let size = 6;
    let text = height_field(size);
    let mesh = import_mesh("field", text.as_bytes()).unwrap();

    assert_eq!(mesh.triangle_count(), 2 * size * size);
    assert_winding(&mesh);

    // One slot per distinct (position, normal) pair actually referenced
    let mut slots = HashSet::new();
    for line in text.lines().filter(|l| l.starts_with("f ")) {
        for corner in line.split_whitespace().skip(1) {
            let mut parts = corner.split('/');
            let position: usize = parts.next().unwrap().parse().unwrap();
            let normal: usize = parts.last().unwrap().parse().unwrap();
            slots.insert((position, normal));
        }
    }
    assert_eq!(mesh.vertex_count(), slots.len());
}

#[test]
fn test_bundled_model() {
    let mesh = import_mesh("model", MODEL.as_bytes()).unwrap();
    assert_eq!(mesh.vertex_count(), 24);
    assert_eq!(mesh.triangle_count(), 12);
    assert_winding(&mesh);
    assert!(mesh
        .vertices
        .iter()
        .all(|v| v.position.abs().max_element() == 1.0));
}
