//! Mesh data structures

use crate::backend::types::{VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Lit scene vertex: position, color, normal
///
/// Padded to 40 bytes so the stride matches the shader-side layout.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub color: Vec3,
    pub normal: Vec3,
    pub _padding: f32,
}

impl Vertex {
    pub fn new(position: Vec3, color: Vec3, normal: Vec3) -> Self {
        Self {
            position,
            color,
            normal,
            _padding: 0.0,
        }
    }

    /// Buffer layout expected by the scene and shadow vertex stages
    pub fn layout() -> VertexBufferLayout {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: VertexStepMode::Vertex,
            attributes: vec![
                VertexAttribute {
                    location: 0,
                    format: VertexFormat::Float32x3,
                    offset: 0,
                },
                VertexAttribute {
                    location: 1,
                    format: VertexFormat::Float32x3,
                    offset: 12,
                },
                VertexAttribute {
                    location: 2,
                    format: VertexFormat::Float32x3,
                    offset: 24,
                },
            ],
        }
    }
}

/// Fog overlay vertex: position and cell-local coordinates
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CellVertex {
    pub position: Vec3,
    pub uv: Vec2,
}

impl CellVertex {
    /// Buffer layout expected by the overlay vertex stage
    pub fn layout() -> VertexBufferLayout {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<CellVertex>() as u64,
            step_mode: VertexStepMode::Vertex,
            attributes: vec![
                VertexAttribute {
                    location: 0,
                    format: VertexFormat::Float32x3,
                    offset: 0,
                },
                VertexAttribute {
                    location: 1,
                    format: VertexFormat::Float32x2,
                    offset: 12,
                },
            ],
        }
    }
}

/// A mesh with vertex and index data
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh<V = Vertex> {
    pub vertices: Vec<V>,
    pub indices: Vec<u32>,
    pub name: String,
}

impl<V: Pod> Mesh<V> {
    pub fn new(name: &str) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            name: name.to_string(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
