//! The quad drawn every frame: four interleaved vertices and two triangles.

use std::mem::size_of;

use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub tex_coord: [f32; 2],
}

impl Vertex {
    pub const FLOATS: usize = 8;
}

pub const QUAD_VERTICES: [Vertex; 4] = [
    // top right
    Vertex {
        position: [0.5, 0.5, 0.0],
        color: [1.0, 0.0, 0.0],
        tex_coord: [1.0, 1.0],
    },
    // bottom right
    Vertex {
        position: [0.5, -0.5, 0.0],
        color: [0.0, 1.0, 0.0],
        tex_coord: [1.0, 0.0],
    },
    // bottom left
    Vertex {
        position: [-0.5, -0.5, 0.0],
        color: [0.0, 0.0, 1.0],
        tex_coord: [0.0, 0.0],
    },
    // top left
    Vertex {
        position: [-0.5, 0.5, 0.0],
        color: [1.0, 1.0, 0.0],
        tex_coord: [0.0, 1.0],
    },
];

pub const QUAD_INDICES: [u32; 6] = [0, 1, 3, 1, 2, 3];

/// One float attribute stream read out of an interleaved vertex buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: u32,
    /// Byte offset from the start of the vertex.
    pub offset: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexLayout {
    /// Bytes between consecutive vertices.
    pub stride: u64,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    pub fn stride_in_floats(&self) -> u64 {
        self.stride / size_of::<f32>() as u64
    }
}

/// Position, colour and texture coordinate at locations 0, 1 and 2.
pub fn quad_layout() -> VertexLayout {
    let float = size_of::<f32>() as u64;
    VertexLayout {
        stride: Vertex::FLOATS as u64 * float,
        attributes: vec![
            VertexAttribute {
                location: 0,
                components: 3,
                offset: 0,
            },
            VertexAttribute {
                location: 1,
                components: 3,
                offset: 3 * float,
            },
            VertexAttribute {
                location: 2,
                components: 2,
                offset: 6 * float,
            },
        ],
    }
}
