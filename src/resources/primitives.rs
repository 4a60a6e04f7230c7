//! Built-in geometry
//!
//! Static vertex tables for the unit cube and the floor, and the generated
//! fog-cell grid drawn by the overlay pass. Everything here is data; the
//! importer never touches it.

use glam::{Vec2, Vec3};

use super::mesh::{CellVertex, Mesh, Vertex};

const fn v(position: [f32; 3], color: [f32; 3], normal: [f32; 3]) -> Vertex {
    Vertex {
        position: Vec3::from_array(position),
        color: Vec3::from_array(color),
        normal: Vec3::from_array(normal),
        _padding: 0.0,
    }
}

/// Unit cube centered on the origin, colored by corner position
const CUBE_VERTICES: [Vertex; 24] = [
    // -x
    v([-0.5, -0.5, -0.5], [0.0, 0.0, 0.0], [-1.0, 0.0, 0.0]),
    v([-0.5, -0.5, 0.5], [0.0, 0.0, 1.0], [-1.0, 0.0, 0.0]),
    v([-0.5, 0.5, -0.5], [0.0, 1.0, 0.0], [-1.0, 0.0, 0.0]),
    v([-0.5, 0.5, 0.5], [0.0, 1.0, 1.0], [-1.0, 0.0, 0.0]),
    // +x
    v([0.5, -0.5, -0.5], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
    v([0.5, -0.5, 0.5], [1.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
    v([0.5, 0.5, -0.5], [1.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
    v([0.5, 0.5, 0.5], [1.0, 1.0, 1.0], [1.0, 0.0, 0.0]),
    // -y
    v([-0.5, -0.5, -0.5], [0.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
    v([-0.5, -0.5, 0.5], [0.0, 0.0, 1.0], [0.0, -1.0, 0.0]),
    v([0.5, -0.5, -0.5], [1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
    v([0.5, -0.5, 0.5], [1.0, 0.0, 1.0], [0.0, -1.0, 0.0]),
    // +y
    v([-0.5, 0.5, -0.5], [0.0, 1.0, 0.0], [0.0, 1.0, 0.0]),
    v([-0.5, 0.5, 0.5], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0]),
    v([0.5, 0.5, -0.5], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]),
    v([0.5, 0.5, 0.5], [1.0, 1.0, 1.0], [0.0, 1.0, 0.0]),
    // -z
    v([-0.5, -0.5, -0.5], [0.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    v([-0.5, 0.5, -0.5], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]),
    v([0.5, -0.5, -0.5], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    v([0.5, 0.5, -0.5], [1.0, 1.0, 0.0], [0.0, 0.0, -1.0]),
    // +z
    v([-0.5, -0.5, 0.5], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]),
    v([-0.5, 0.5, 0.5], [0.0, 1.0, 1.0], [0.0, 0.0, 1.0]),
    v([0.5, -0.5, 0.5], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]),
    v([0.5, 0.5, 0.5], [1.0, 1.0, 1.0], [0.0, 0.0, 1.0]),
];

#[rustfmt::skip]
const CUBE_INDICES: [u32; 36] = [
    0, 2, 1, 1, 2, 3, // -x
    4, 5, 6, 5, 7, 6, // +x
    8, 9, 10, 10, 9, 11, // -y
    12, 14, 13, 15, 13, 14, // +y
    16, 18, 17, 17, 18, 19, // -z
    20, 21, 22, 21, 23, 22, // +z
];

/// Floor quad spanning [-4, 4] on X and Z at y = 0
const FLOOR_VERTICES: [Vertex; 4] = [
    v([-4.0, 0.0, -4.0], [1.0, 1.0, 1.0], [0.0, 1.0, 0.0]),
    v([-4.0, 0.0, 4.0], [1.0, 1.0, 1.0], [0.0, 1.0, 0.0]),
    v([4.0, 0.0, -4.0], [1.0, 1.0, 1.0], [0.0, 1.0, 0.0]),
    v([4.0, 0.0, 4.0], [1.0, 1.0, 1.0], [0.0, 1.0, 0.0]),
];

const FLOOR_INDICES: [u32; 6] = [0, 2, 1, 1, 2, 3];

pub fn cube() -> Mesh {
    Mesh {
        vertices: CUBE_VERTICES.to_vec(),
        indices: CUBE_INDICES.to_vec(),
        name: "cube".to_string(),
    }
}

pub fn floor() -> Mesh {
    Mesh {
        vertices: FLOOR_VERTICES.to_vec(),
        indices: FLOOR_INDICES.to_vec(),
        name: "floor".to_string(),
    }
}

/// Layout of the fog-cell grid
///
/// The grid covers `columns * cell_size` by `rows * cell_size` world units on
/// X and Z, centered on the origin. Each cell holds one upright quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogGrid {
    pub columns: u32,
    pub rows: u32,
    /// Edge length of one cell in world units
    pub cell_size: f32,
    /// Gap left between neighbouring quads
    pub gap: f32,
    /// World Y of the bottom edge of every quad
    pub base: f32,
    /// Height of every quad
    pub quad_height: f32,
}

impl Default for FogGrid {
    fn default() -> Self {
        Self {
            columns: 16,
            rows: 16,
            cell_size: 0.5,
            gap: 0.02,
            base: -1.0,
            quad_height: 0.5,
        }
    }
}

impl FogGrid {
    pub fn cell_count(&self) -> u32 {
        self.columns * self.rows
    }

    /// One vertical quad per cell, spanning the cell on X through its center
    /// on Z and facing -Z.
    pub fn build(&self) -> Mesh<CellVertex> {
        let mut mesh = Mesh::new("fog grid");
        let half_width = self.columns as f32 * self.cell_size / 2.0;
        let half_depth = self.rows as f32 * self.cell_size / 2.0;
        let inset = (self.gap / 2.0).min(self.cell_size / 2.0);
        let (y0, y1) = (self.base, self.base + self.quad_height);

        for row in 0..self.rows {
            for column in 0..self.columns {
                let x0 = -half_width + column as f32 * self.cell_size + inset;
                let x1 = x0 + self.cell_size - 2.0 * inset;
                let z = -half_depth + (row as f32 + 0.5) * self.cell_size;

                let base = mesh.vertices.len() as u32;
                mesh.vertices.extend_from_slice(&[
                    CellVertex {
                        position: Vec3::new(x0, y0, z),
                        uv: Vec2::new(0.0, 1.0),
                    },
                    CellVertex {
                        position: Vec3::new(x0, y1, z),
                        uv: Vec2::new(0.0, 0.0),
                    },
                    CellVertex {
                        position: Vec3::new(x1, y0, z),
                        uv: Vec2::new(1.0, 1.0),
                    },
                    CellVertex {
                        position: Vec3::new(x1, y1, z),
                        uv: Vec2::new(1.0, 0.0),
                    },
                ]);
                mesh.indices
                    .extend(FLOOR_INDICES.iter().map(|i| base + i));
            }
        }

        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_faces_its_normals(mesh: &Mesh) {
        for [i0, i1, i2] in mesh.triangles() {
            let v0 = mesh.vertices[i0 as usize];
            let v1 = mesh.vertices[i1 as usize];
            let v2 = mesh.vertices[i2 as usize];
            let facing = (v2.position - v0.position)
                .cross(v1.position - v0.position)
                .dot(v1.normal);
            assert!(facing > 0.0, "{} triangle {:?}", mesh.name, [i0, i1, i2]);
        }
    }

    #[test]
    fn test_static_tables_follow_the_winding_rule() {
        assert_faces_its_normals(&cube());
        assert_faces_its_normals(&floor());
        assert_eq!(cube().triangle_count(), 12);
        assert_eq!(floor().triangle_count(), 2);
    }

    #[test]
    fn test_fog_grid_has_one_quad_per_cell() {
        let grid = FogGrid {
            columns: 3,
            rows: 2,
            ..FogGrid::default()
        };
        let mesh = grid.build();
        assert_eq!(grid.cell_count(), 6);
        assert_eq!(mesh.vertex_count(), 4 * grid.cell_count() as usize);
        assert_eq!(mesh.triangle_count(), 2 * grid.cell_count() as usize);
        assert!(mesh
            .indices
            .iter()
            .all(|&i| (i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn test_fog_grid_quads_stand_upright() {
        let grid = FogGrid::default();
        let mesh = grid.build();

        for quad in mesh.vertices.chunks(4) {
            let low = quad.iter().map(|v| v.position.y).fold(f32::MAX, f32::min);
            let high = quad.iter().map(|v| v.position.y).fold(f32::MIN, f32::max);
            assert_eq!(low, grid.base);
            assert_eq!(high, grid.base + grid.quad_height);
        }
        for [i0, i1, i2] in mesh.triangles() {
            let [p0, p1, p2] = [i0, i1, i2].map(|i| mesh.vertices[i as usize].position);
            let normal = (p2 - p0).cross(p1 - p0).normalize();
            assert!(normal.abs_diff_eq(Vec3::NEG_Z, 1e-6), "{:?}", normal);
        }
    }

    #[test]
    fn test_fog_grid_spans_its_extent() {
        let grid = FogGrid {
            columns: 4,
            rows: 4,
            cell_size: 1.0,
            gap: 0.0,
            base: 0.0,
            quad_height: 2.0,
        };
        let mesh = grid.build();
        let min = mesh
            .vertices
            .iter()
            .fold(Vec3::splat(f32::MAX), |acc, v| acc.min(v.position));
        let max = mesh
            .vertices
            .iter()
            .fold(Vec3::splat(f32::MIN), |acc, v| acc.max(v.position));
        // Quads sit on the row center lines, half a cell inside the extent
        assert_eq!(min, Vec3::new(-2.0, 0.0, -1.5));
        assert_eq!(max, Vec3::new(2.0, 2.0, 1.5));
    }
}
