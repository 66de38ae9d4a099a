use anyhow::Result;
use tracing::{debug, info};

use crate::gpu::{ClearColor, GraphicsContext};
use crate::resources::SceneResources;
use crate::shader::ShaderProgram;
use crate::types::{RendererConfig, TEXTURE_COUNT};
use crate::window::WindowHost;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminating,
}

/// Per-frame constants of the static scene.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameSettings {
    pub clear_color: ClearColor,
    /// Uniform pointed at texture unit `i` for each `i`.
    pub sampler_uniforms: [String; TEXTURE_COUNT],
}

impl From<&RendererConfig> for FrameSettings {
    fn from(config: &RendererConfig) -> Self {
        Self {
            clear_color: config.clear_color,
            sampler_uniforms: config.sampler_uniforms.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: u64,
}

/// Draws the quad every iteration until the window wants to close.
///
/// The close flag is only consulted at the top of an iteration, so a close
/// requested while polling still finishes the current frame.
pub fn run<W, G>(
    window: &mut W,
    gpu: &mut G,
    scene: &SceneResources,
    program: &ShaderProgram,
    settings: &FrameSettings,
) -> Result<FrameStats>
where
    W: WindowHost,
    G: GraphicsContext,
{
    let mut stats = FrameStats::default();
    let mut state = LoopState::Running;
    info!("entering render loop");

    while state == LoopState::Running {
        if window.should_close() {
            state = LoopState::Terminating;
            continue;
        }
        window.poll_events();
        draw_frame(gpu, scene, program, settings)?;
        window.swap_buffers();
        gpu.present()?;
        stats.frames += 1;
    }

    info!(frames = stats.frames, "render loop finished");
    Ok(stats)
}

fn draw_frame<G: GraphicsContext>(
    gpu: &mut G,
    scene: &SceneResources,
    program: &ShaderProgram,
    settings: &FrameSettings,
) -> Result<()> {
    gpu.clear(settings.clear_color);

    for (unit, (texture, uniform)) in scene
        .textures
        .iter()
        .zip(&settings.sampler_uniforms)
        .enumerate()
    {
        let unit = unit as u32;
        gpu.bind_texture(unit, Some(*texture));
        match program.uniform_location(&*gpu, uniform) {
            Some(location) => gpu.set_sampler_unit(program.id(), location, unit),
            None => debug!(uniform = %uniform, "sampler uniform not found in program"),
        }
    }
    program.activate(gpu);

    gpu.bind_vertex_array(Some(scene.vertex_array));
    gpu.draw_indexed(scene.index_count)?;
    gpu.bind_vertex_array(None);
    Ok(())
}
