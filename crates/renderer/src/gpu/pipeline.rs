use std::borrow::Cow;

use anyhow::{anyhow, Context, Result};
use wgpu::naga;
use wgpu::naga::ShaderStage;

use crate::geometry::VertexLayout;

use super::{ProgramId, ProgramSources};

/// Suffix pairing a `sampler` with the `texture2D` it samples.
const SAMPLER_SUFFIX: &str = "_sampler";

/// A sampler uniform as seen by callers: a `texture2D NAME` plus its
/// `sampler NAME_sampler` in the same bind group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplerUniform {
    pub name: String,
    pub texture_binding: u32,
    pub sampler_binding: u32,
}

/// Finds the sampler uniforms of a fragment module, in declaration order.
pub fn reflect_sampler_uniforms(module: &naga::Module) -> Result<Vec<SamplerUniform>> {
    let mut textures = Vec::new();
    let mut samplers = Vec::new();
    for (_, variable) in module.global_variables.iter() {
        let (Some(name), Some(binding)) = (&variable.name, &variable.binding) else {
            continue;
        };
        match module.types[variable.ty].inner {
            naga::TypeInner::Image { .. } => textures.push((name.clone(), binding.clone())),
            naga::TypeInner::Sampler { .. } => samplers.push((name.clone(), binding.clone())),
            _ => continue,
        }
        if binding.group != 0 {
            anyhow::bail!(
                "`{name}` is bound to set {}; only set 0 is supported",
                binding.group
            );
        }
    }

    textures
        .into_iter()
        .map(|(name, texture)| {
            let sampler_name = format!("{name}{SAMPLER_SUFFIX}");
            let (_, sampler) = samplers
                .iter()
                .find(|(candidate, _)| *candidate == sampler_name)
                .ok_or_else(|| anyhow!("texture `{name}` has no matching `sampler {sampler_name}`"))?;
            Ok(SamplerUniform {
                name,
                texture_binding: texture.binding,
                sampler_binding: sampler.binding,
            })
        })
        .collect()
}

pub(crate) fn parse_glsl(source: &str, stage: ShaderStage) -> Result<naga::Module> {
    naga::front::glsl::Frontend::default()
        .parse(&naga::front::glsl::Options::from(stage), source)
        .map_err(|errors| anyhow!("{}", errors.emit_to_string(source)))
}

pub(crate) struct ProgramResources {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub samplers: Vec<SamplerUniform>,
    /// Texture unit each sampler uniform reads from; GL-style default of 0.
    pub sampler_units: Vec<u32>,
}

impl ProgramResources {
    pub fn new(device: &wgpu::Device, id: ProgramId, sources: &ProgramSources) -> Result<Self> {
        parse_glsl(&sources.vertex, ShaderStage::Vertex)
            .with_context(|| format!("vertex stage of `{}` failed to compile", sources.label))?;
        let fragment_module = parse_glsl(&sources.fragment, ShaderStage::Fragment)
            .with_context(|| format!("fragment stage of `{}` failed to compile", sources.label))?;
        let samplers = reflect_sampler_uniforms(&fragment_module)
            .with_context(|| format!("unsupported sampler declarations in `{}`", sources.label))?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertex = compile_stage(device, id, &sources.vertex, ShaderStage::Vertex);
        let fragment = compile_stage(device, id, &sources.fragment, ShaderStage::Fragment);
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{id:?} samplers")),
            entries: &sampler_layout_entries(&samplers),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{id:?} layout")),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            anyhow::bail!("failed to link `{}`: {error}", sources.label);
        }

        tracing::debug!(?id, label = %sources.label, samplers = samplers.len(), "linked program");
        let sampler_units = vec![0; samplers.len()];
        Ok(Self {
            vertex,
            fragment,
            pipeline_layout,
            bind_group_layout,
            samplers,
            sampler_units,
        })
    }
}

fn compile_stage(
    device: &wgpu::Device,
    id: ProgramId,
    source: &str,
    stage: ShaderStage,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{id:?} {stage:?}")),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_owned()),
            stage,
            defines: &[],
        },
    })
}

pub(crate) fn sampler_layout_entries(samplers: &[SamplerUniform]) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = Vec::with_capacity(samplers.len() * 2);
    for sampler in samplers {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: sampler.texture_binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: sampler.sampler_binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    entries
}

pub(crate) fn vertex_attributes(layout: &VertexLayout) -> Result<Vec<wgpu::VertexAttribute>> {
    layout
        .attributes
        .iter()
        .map(|attribute| {
            let format = match attribute.components {
                1 => wgpu::VertexFormat::Float32,
                2 => wgpu::VertexFormat::Float32x2,
                3 => wgpu::VertexFormat::Float32x3,
                4 => wgpu::VertexFormat::Float32x4,
                other => anyhow::bail!(
                    "attribute at location {} has {other} components; expected 1-4",
                    attribute.location
                ),
            };
            Ok(wgpu::VertexAttribute {
                format,
                offset: attribute.offset,
                shader_location: attribute.location,
            })
        })
        .collect()
}

pub(crate) fn build_render_pipeline(
    device: &wgpu::Device,
    program: &ProgramResources,
    layout: &VertexLayout,
    surface_format: wgpu::TextureFormat,
    label: &str,
) -> Result<wgpu::RenderPipeline> {
    let attributes = vertex_attributes(layout)?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&program.pipeline_layout),
        vertex: wgpu::VertexState {
            module: &program.vertex,
            entry_point: Some("main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: layout.stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &program.fragment,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        anyhow::bail!("failed to build render pipeline {label}: {error}");
    }
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::quad_layout;

    const BUNDLED_FRAGMENT: &str = include_str!("../../../../assets/texture.frag");
    const BUNDLED_VERTEX: &str = include_str!("../../../../assets/texture.vs");

    #[test]
    fn bundled_fragment_exposes_two_sampler_uniforms() {
        let module = parse_glsl(BUNDLED_FRAGMENT, ShaderStage::Fragment).unwrap();
        let samplers = reflect_sampler_uniforms(&module).unwrap();
        assert_eq!(
            samplers,
            vec![
                SamplerUniform {
                    name: "ourTexture1".into(),
                    texture_binding: 0,
                    sampler_binding: 1,
                },
                SamplerUniform {
                    name: "ourTexture2".into(),
                    texture_binding: 2,
                    sampler_binding: 3,
                },
            ]
        );
    }

    #[test]
    fn bundled_vertex_stage_parses() {
        let module = parse_glsl(BUNDLED_VERTEX, ShaderStage::Vertex).unwrap();
        assert_eq!(module.entry_points.len(), 1);
    }

    #[test]
    fn unpaired_texture_is_rejected() {
        let source = r"#version 450
layout(location = 0) in vec2 uv;
layout(location = 0) out vec4 color;
layout(set = 0, binding = 0) uniform texture2D lonely;
layout(set = 0, binding = 1) uniform sampler wrong_name;
void main() {
    color = texture(sampler2D(lonely, wrong_name), uv);
}
";
        let module = parse_glsl(source, ShaderStage::Fragment).unwrap();
        let err = reflect_sampler_uniforms(&module).unwrap_err();
        assert!(err.to_string().contains("lonely"));
    }

    #[test]
    fn syntax_errors_surface_as_errors() {
        assert!(parse_glsl("#version 450\nvoid main( {", ShaderStage::Fragment).is_err());
    }

    #[test]
    fn quad_layout_maps_to_float_formats() {
        let attributes = vertex_attributes(&quad_layout()).unwrap();
        let formats: Vec<_> = attributes.iter().map(|attribute| attribute.format).collect();
        assert_eq!(
            formats,
            vec![
                wgpu::VertexFormat::Float32x3,
                wgpu::VertexFormat::Float32x3,
                wgpu::VertexFormat::Float32x2,
            ]
        );
        assert_eq!(attributes[2].offset, 24);
    }
}
