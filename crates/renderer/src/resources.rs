use anyhow::{Context, Result};
use tracing::debug;

use crate::geometry::{quad_layout, Vertex};
use crate::gpu::{
    BufferId, BufferKind, GraphicsContext, TextureDescriptor, TextureId, VertexArrayDescriptor,
    VertexArrayId,
};
use crate::pixels::CanonicalPixelBuffer;
use crate::types::TEXTURE_COUNT;

/// GPU objects backing the quad: one vertex array over one vertex buffer
/// and one index buffer, plus one texture per unit.
///
/// Built once before the render loop and released once after it.
#[derive(Debug)]
pub struct SceneResources {
    pub vertex_array: VertexArrayId,
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub textures: [TextureId; TEXTURE_COUNT],
    pub index_count: u32,
}

/// Handles created so far while building, deleted again if a later step fails.
#[derive(Default)]
struct Partial {
    buffers: Vec<BufferId>,
    vertex_array: Option<VertexArrayId>,
    textures: Vec<TextureId>,
}

impl Partial {
    fn unwind<G: GraphicsContext>(self, gpu: &mut G) {
        if let Some(vertex_array) = self.vertex_array {
            gpu.delete_vertex_array(vertex_array);
        }
        for buffer in self.buffers {
            gpu.delete_buffer(buffer);
        }
        for texture in self.textures {
            gpu.delete_texture(texture);
        }
    }
}

impl SceneResources {
    /// Uploads geometry and textures. The images are consumed; nothing keeps
    /// pixel data alive once it is on the GPU.
    pub fn build<G: GraphicsContext>(
        gpu: &mut G,
        vertices: &[Vertex],
        indices: &[u32],
        images: [CanonicalPixelBuffer; TEXTURE_COUNT],
    ) -> Result<Self> {
        let mut partial = Partial::default();
        match Self::build_into(gpu, vertices, indices, images, &mut partial) {
            Ok(resources) => Ok(resources),
            Err(err) => {
                partial.unwind(gpu);
                Err(err)
            }
        }
    }

    fn build_into<G: GraphicsContext>(
        gpu: &mut G,
        vertices: &[Vertex],
        indices: &[u32],
        images: [CanonicalPixelBuffer; TEXTURE_COUNT],
        partial: &mut Partial,
    ) -> Result<Self> {
        let index_count = u32::try_from(indices.len()).context("index count exceeds u32")?;

        let vertex_buffer = gpu
            .create_buffer(BufferKind::Vertex, bytemuck::cast_slice(vertices))
            .context("failed to create vertex buffer")?;
        partial.buffers.push(vertex_buffer);
        let index_buffer = gpu
            .create_buffer(BufferKind::Index, bytemuck::cast_slice(indices))
            .context("failed to create index buffer")?;
        partial.buffers.push(index_buffer);

        let vertex_array = gpu
            .create_vertex_array(&VertexArrayDescriptor {
                vertex_buffer,
                index_buffer,
                layout: quad_layout(),
            })
            .context("failed to create vertex array")?;
        partial.vertex_array = Some(vertex_array);
        debug!(?vertex_array, ?vertex_buffer, ?index_buffer, "geometry uploaded");

        let descriptor = TextureDescriptor::default();
        for (unit, image) in images.into_iter().enumerate() {
            let texture = gpu
                .create_texture(&image, &descriptor)
                .with_context(|| format!("failed to create texture for unit {unit}"))?;
            debug!(?texture, unit, width = image.width(), height = image.height(), "texture uploaded");
            partial.textures.push(texture);
        }

        let textures = <[TextureId; TEXTURE_COUNT]>::try_from(partial.textures.as_slice())
            .context("texture count mismatch")?;
        Ok(Self {
            vertex_array,
            vertex_buffer,
            index_buffer,
            textures,
            index_count,
        })
    }

    /// Deletes every handle exactly once: vertex array, buffers, textures.
    pub fn release<G: GraphicsContext>(self, gpu: &mut G) {
        gpu.delete_vertex_array(self.vertex_array);
        gpu.delete_buffer(self.vertex_buffer);
        gpu.delete_buffer(self.index_buffer);
        for texture in self.textures {
            gpu.delete_texture(texture);
        }
        debug!("scene resources released");
    }
}
