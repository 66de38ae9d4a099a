use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::pixels::CanonicalPixelBuffer;

use super::context::GpuContext;
use super::handles::HandleAllocator;
use super::pipeline::{build_render_pipeline, ProgramResources};
use super::textures::{upload_texture, TextureResources};
use super::{
    BufferId, BufferKind, ClearColor, GraphicsContext, ProgramId, ProgramSources,
    TextureDescriptor, TextureId, UniformLocation, VertexArrayDescriptor, VertexArrayId,
    MAX_TEXTURE_UNITS,
};

const INDEX_SIZE: u64 = std::mem::size_of::<u32>() as u64;

struct BufferResource {
    buffer: wgpu::Buffer,
    kind: BufferKind,
}

type PipelineKey = (ProgramId, VertexArrayId);
type BindGroupKey = (ProgramId, Vec<TextureId>);

/// A draw captured between `clear` and `present`, resolved against the
/// resource tables when the frame is encoded.
#[derive(Debug)]
struct RecordedDraw {
    pipeline: PipelineKey,
    bind_group: BindGroupKey,
    index_count: u32,
}

#[derive(Debug, Default)]
struct PendingFrame {
    clear: Option<wgpu::Color>,
    draws: Vec<RecordedDraw>,
}

/// [`GraphicsContext`] backed by wgpu, presenting to a winit window.
///
/// GL-style binding state (texture units, current program, bound vertex
/// array) is tracked on the CPU. Draws are recorded and encoded into a
/// single render pass when [`GraphicsContext::present`] is called.
/// Render pipelines and bind groups are built lazily on first use and
/// cached until one of their inputs is deleted.
pub struct WgpuContext {
    gpu: GpuContext,
    handles: HandleAllocator,
    buffers: HashMap<BufferId, BufferResource>,
    vertex_arrays: HashMap<VertexArrayId, VertexArrayDescriptor>,
    textures: HashMap<TextureId, TextureResources>,
    programs: HashMap<ProgramId, ProgramResources>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    bind_groups: HashMap<BindGroupKey, wgpu::BindGroup>,
    texture_units: [Option<TextureId>; MAX_TEXTURE_UNITS as usize],
    current_program: Option<ProgramId>,
    current_vertex_array: Option<VertexArrayId>,
    frame: PendingFrame,
}

impl WgpuContext {
    pub fn new(window: Arc<Window>) -> Result<Self> {
        let gpu = GpuContext::new(window)?;
        Ok(Self {
            gpu,
            handles: HandleAllocator::new(),
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            textures: HashMap::new(),
            programs: HashMap::new(),
            pipelines: HashMap::new(),
            bind_groups: HashMap::new(),
            texture_units: [None; MAX_TEXTURE_UNITS as usize],
            current_program: None,
            current_vertex_array: None,
            frame: PendingFrame::default(),
        })
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) -> Result<()> {
        if self.pipelines.contains_key(&key) {
            return Ok(());
        }
        let (program_id, vertex_array_id) = key;
        let program = self
            .programs
            .get(&program_id)
            .ok_or_else(|| anyhow!("{program_id:?} does not exist"))?;
        let vertex_array = self
            .vertex_arrays
            .get(&vertex_array_id)
            .ok_or_else(|| anyhow!("{vertex_array_id:?} does not exist"))?;
        let label = format!("{program_id:?} with {vertex_array_id:?}");
        let pipeline = build_render_pipeline(
            &self.gpu.device,
            program,
            &vertex_array.layout,
            self.gpu.surface_format,
            &label,
        )?;
        debug!(%label, "built render pipeline");
        self.pipelines.insert(key, pipeline);
        Ok(())
    }

    /// Resolves the textures a program samples from the current unit bindings.
    fn bound_textures(&self, program_id: ProgramId) -> Result<Vec<TextureId>> {
        let program = self
            .programs
            .get(&program_id)
            .ok_or_else(|| anyhow!("{program_id:?} does not exist"))?;
        program
            .samplers
            .iter()
            .zip(&program.sampler_units)
            .map(|(sampler, &unit)| {
                let texture = self.texture_units[unit as usize].with_context(|| {
                    format!("`{}` reads texture unit {unit}, which is unbound", sampler.name)
                })?;
                if !self.textures.contains_key(&texture) {
                    anyhow::bail!("{texture:?} bound to unit {unit} does not exist");
                }
                Ok(texture)
            })
            .collect()
    }

    fn ensure_bind_group(&mut self, key: &BindGroupKey) -> Result<()> {
        if self.bind_groups.contains_key(key) {
            return Ok(());
        }
        let (program_id, textures) = key;
        let program = self
            .programs
            .get(program_id)
            .ok_or_else(|| anyhow!("{program_id:?} does not exist"))?;
        let mut entries = Vec::with_capacity(textures.len() * 2);
        for (sampler, texture_id) in program.samplers.iter().zip(textures) {
            let texture = self
                .textures
                .get(texture_id)
                .ok_or_else(|| anyhow!("{texture_id:?} does not exist"))?;
            entries.push(wgpu::BindGroupEntry {
                binding: sampler.texture_binding,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: sampler.sampler_binding,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            });
        }
        let bind_group = self
            .gpu
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{program_id:?} textures")),
                layout: &program.bind_group_layout,
                entries: &entries,
            });
        self.bind_groups.insert(key.clone(), bind_group);
        Ok(())
    }

    fn index_capacity(&self, vertex_array: &VertexArrayDescriptor) -> Result<u64> {
        let index = self
            .buffers
            .get(&vertex_array.index_buffer)
            .ok_or_else(|| anyhow!("{:?} does not exist", vertex_array.index_buffer))?;
        Ok(index.buffer.size() / INDEX_SIZE)
    }

    fn encode_frame(&self, view: &wgpu::TextureView, frame: &PendingFrame) -> wgpu::CommandBuffer {
        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        let load = match frame.clear {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for draw in &frame.draws {
                let (Some(pipeline), Some(bind_group), Some(vertex_array)) = (
                    self.pipelines.get(&draw.pipeline),
                    self.bind_groups.get(&draw.bind_group),
                    self.vertex_arrays.get(&draw.pipeline.1),
                ) else {
                    warn!(?draw, "resources deleted before present; skipping draw");
                    continue;
                };
                let (Some(vertices), Some(indices)) = (
                    self.buffers.get(&vertex_array.vertex_buffer),
                    self.buffers.get(&vertex_array.index_buffer),
                ) else {
                    warn!(?draw, "buffers deleted before present; skipping draw");
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, bind_group, &[]);
                render_pass.set_vertex_buffer(0, vertices.buffer.slice(..));
                render_pass.set_index_buffer(indices.buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }
        encoder.finish()
    }
}

impl GraphicsContext for WgpuContext {
    fn create_buffer(&mut self, kind: BufferKind, contents: &[u8]) -> Result<BufferId> {
        if contents.is_empty() {
            anyhow::bail!("refusing to create an empty {kind:?} buffer");
        }
        let id = BufferId::from_raw(self.handles.allocate());
        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        };
        let buffer = self
            .gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{id:?}")),
                contents,
                usage,
            });
        debug!(?id, ?kind, bytes = contents.len(), "created buffer");
        self.buffers.insert(id, BufferResource { buffer, kind });
        Ok(id)
    }

    fn create_vertex_array(&mut self, descriptor: &VertexArrayDescriptor) -> Result<VertexArrayId> {
        for (buffer, expected) in [
            (descriptor.vertex_buffer, BufferKind::Vertex),
            (descriptor.index_buffer, BufferKind::Index),
        ] {
            match self.buffers.get(&buffer) {
                Some(resource) if resource.kind == expected => {}
                Some(resource) => anyhow::bail!(
                    "{buffer:?} is a {:?} buffer, expected {expected:?}",
                    resource.kind
                ),
                None => anyhow::bail!("{buffer:?} does not exist"),
            }
        }
        let id = VertexArrayId::from_raw(self.handles.allocate());
        self.vertex_arrays.insert(id, descriptor.clone());
        debug!(?id, vertex = ?descriptor.vertex_buffer, index = ?descriptor.index_buffer, "created vertex array");
        Ok(id)
    }

    fn create_texture(
        &mut self,
        image: &CanonicalPixelBuffer,
        descriptor: &TextureDescriptor,
    ) -> Result<TextureId> {
        let max_dimension = self.gpu.device.limits().max_texture_dimension_2d;
        if image.width() > max_dimension || image.height() > max_dimension {
            anyhow::bail!(
                "{}x{} texture exceeds the GPU limit of {max_dimension}",
                image.width(),
                image.height()
            );
        }
        let id = TextureId::from_raw(self.handles.allocate());
        let resources = upload_texture(&self.gpu.device, &self.gpu.queue, id, image, descriptor);
        self.textures.insert(id, resources);
        Ok(id)
    }

    fn create_program(&mut self, sources: &ProgramSources) -> Result<ProgramId> {
        let id = ProgramId::from_raw(self.handles.allocate());
        let program = ProgramResources::new(&self.gpu.device, id, sources)?;
        self.programs.insert(id, program);
        Ok(id)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let resources = self.programs.get(&program)?;
        resources
            .samplers
            .iter()
            .position(|sampler| sampler.name == name)
            .map(|index| UniformLocation(index as u32))
    }

    fn set_sampler_unit(&mut self, program: ProgramId, location: UniformLocation, unit: u32) {
        if unit >= MAX_TEXTURE_UNITS {
            warn!(?program, unit, "texture unit out of range; ignoring");
            return;
        }
        let Some(resources) = self.programs.get_mut(&program) else {
            warn!(?program, "set_sampler_unit on unknown program");
            return;
        };
        match resources.sampler_units.get_mut(location.0 as usize) {
            Some(slot) => *slot = unit,
            None => warn!(?program, ?location, "unknown uniform location; ignoring"),
        }
    }

    fn use_program(&mut self, program: ProgramId) {
        self.current_program = Some(program);
    }

    fn clear(&mut self, color: ClearColor) {
        self.frame = PendingFrame {
            clear: Some(wgpu::Color {
                r: color.r,
                g: color.g,
                b: color.b,
                a: color.a,
            }),
            draws: Vec::new(),
        };
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>) {
        match self.texture_units.get_mut(unit as usize) {
            Some(slot) => *slot = texture,
            None => warn!(unit, "texture unit out of range; ignoring"),
        }
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        self.current_vertex_array = vertex_array;
    }

    fn draw_indexed(&mut self, index_count: u32) -> Result<()> {
        let program = self.current_program.context("draw without a program in use")?;
        let vertex_array = self
            .current_vertex_array
            .context("draw without a bound vertex array")?;
        let descriptor = self
            .vertex_arrays
            .get(&vertex_array)
            .ok_or_else(|| anyhow!("{vertex_array:?} does not exist"))?;
        let capacity = self.index_capacity(descriptor)?;
        if u64::from(index_count) > capacity {
            anyhow::bail!(
                "draw of {index_count} indices overruns index buffer of {vertex_array:?} ({capacity} indices)"
            );
        }

        let pipeline = (program, vertex_array);
        self.ensure_pipeline(pipeline)?;
        let bind_group = (program, self.bound_textures(program)?);
        self.ensure_bind_group(&bind_group)?;

        self.frame.draws.push(RecordedDraw {
            pipeline,
            bind_group,
            index_count,
        });
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        let frame = std::mem::take(&mut self.frame);
        let surface_texture = match self.gpu.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("surface lost or outdated; reconfiguring and skipping frame");
                self.gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("timed out acquiring the next frame; skipping");
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(anyhow!("GPU ran out of memory acquiring the next frame"));
            }
            Err(other) => {
                warn!(error = %other, "failed to acquire the next frame; skipping");
                return Ok(());
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let commands = self.encode_frame(&view, &frame);
        self.gpu.queue.submit(std::iter::once(commands));
        surface_texture.present();
        Ok(())
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        if self.vertex_arrays.remove(&vertex_array).is_none() {
            warn!(?vertex_array, "deleting unknown vertex array");
            return;
        }
        self.pipelines.retain(|(_, owner), _| *owner != vertex_array);
        if self.current_vertex_array == Some(vertex_array) {
            self.current_vertex_array = None;
        }
        debug!(?vertex_array, "deleted vertex array");
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        match self.buffers.remove(&buffer) {
            Some(resource) => {
                resource.buffer.destroy();
                debug!(?buffer, "deleted buffer");
            }
            None => warn!(?buffer, "deleting unknown buffer"),
        }
    }

    fn delete_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_none() {
            warn!(?texture, "deleting unknown texture");
            return;
        }
        self.bind_groups
            .retain(|(_, textures), _| !textures.contains(&texture));
        for slot in &mut self.texture_units {
            if *slot == Some(texture) {
                *slot = None;
            }
        }
        debug!(?texture, "deleted texture");
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_none() {
            warn!(?program, "deleting unknown program");
            return;
        }
        self.pipelines.retain(|(owner, _), _| *owner != program);
        self.bind_groups.retain(|(owner, _), _| *owner != program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        debug!(?program, "deleted program");
    }
}
