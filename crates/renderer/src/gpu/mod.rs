//! Explicit graphics context.
//!
//! Every GPU operation goes through a [`GraphicsContext`] value passed in by
//! the caller; nothing relies on an ambient "current context". The layout:
//! - `handles` defines the opaque ids and the allocator that issues them.
//! - `context` owns wgpu instance/device/surface wiring.
//! - `pipeline` compiles GLSL programs, reflects their sampler uniforms and
//!   builds render pipelines for a program/vertex-array pair.
//! - `textures` uploads canonical images with their mip chains.
//! - `state` glues everything together as [`WgpuContext`].

mod context;
mod handles;
mod pipeline;
mod state;
mod textures;

use anyhow::Result;

use crate::geometry::VertexLayout;
use crate::pixels::CanonicalPixelBuffer;

pub use handles::{BufferId, HandleAllocator, ProgramId, TextureId, VertexArrayId};
pub use pipeline::{reflect_sampler_uniforms, SamplerUniform};
pub use state::WgpuContext;

/// Number of texture units a context must expose.
pub const MAX_TEXTURE_UNITS: u32 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexArrayDescriptor {
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
    pub layout: VertexLayout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub generate_mipmaps: bool,
}

impl Default for TextureDescriptor {
    /// Repeat on both axes, linear filtering, full mip chain.
    fn default() -> Self {
        Self {
            wrap_u: WrapMode::Repeat,
            wrap_v: WrapMode::Repeat,
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            generate_mipmaps: true,
        }
    }
}

/// GLSL source for both stages of a program.
#[derive(Clone, Debug)]
pub struct ProgramSources {
    pub label: String,
    pub vertex: String,
    pub fragment: String,
}

/// Index of a sampler uniform within its program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl ClearColor {
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

/// Resource creation, per-frame binding state and draw submission.
///
/// Texture-unit, program and vertex-array bindings persist across frames
/// until changed, like the state of a GL context. Creating a texture never
/// touches unit bindings.
pub trait GraphicsContext {
    fn create_buffer(&mut self, kind: BufferKind, contents: &[u8]) -> Result<BufferId>;
    fn create_vertex_array(&mut self, descriptor: &VertexArrayDescriptor) -> Result<VertexArrayId>;
    fn create_texture(
        &mut self,
        image: &CanonicalPixelBuffer,
        descriptor: &TextureDescriptor,
    ) -> Result<TextureId>;
    /// Compiles and links both stages. Fails on any compile or link error.
    fn create_program(&mut self, sources: &ProgramSources) -> Result<ProgramId>;

    /// Looks up a sampler uniform by name; `None` if the program has no such uniform.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    /// Points the sampler uniform at `location` to texture unit `unit`.
    fn set_sampler_unit(&mut self, program: ProgramId, location: UniformLocation, unit: u32);
    fn use_program(&mut self, program: ProgramId);

    fn clear(&mut self, color: ClearColor);
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>);
    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>);
    /// Draws `index_count` indices as a triangle list with the current bindings.
    fn draw_indexed(&mut self, index_count: u32) -> Result<()>;
    /// Submits everything recorded since the last `clear` and shows it.
    fn present(&mut self) -> Result<()>;

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId);
    fn delete_buffer(&mut self, buffer: BufferId);
    fn delete_texture(&mut self, texture: TextureId);
    fn delete_program(&mut self, program: ProgramId);
}
