//! Renderer crate for texquad, a textured-quad demo.
//!
//! The crate loads two images, normalises them to canonical RGBA8, uploads a
//! fixed quad and its textures, and draws it every frame until the window is
//! closed. The overall flow is:
//!
//! ```text
//!   CLI / texquad
//!          │ RendererConfig
//!          ▼
//!   renderer::run ──▶ assets::load_texture_images ──▶ normalize()
//!          │
//!          ├─▶ DesktopWindow + WgpuContext
//!          ├─▶ ShaderProgram::from_files ─┐
//!          ├─▶ SceneResources::build ─────┤
//!          ▼                              ▼
//!   run_session ──▶ render_loop::run ──▶ release ──▶ terminate
//! ```
//!
//! Everything GPU-facing goes through the [`gpu::GraphicsContext`] trait and
//! everything window-facing through [`window::WindowHost`], so the builder and
//! the loop run against recording fakes in tests.

pub mod assets;
pub mod geometry;
pub mod gpu;
pub mod mipmap;
pub mod normalize;
pub mod pixels;
pub mod render_loop;
pub mod resources;
pub mod shader;
mod types;
pub mod window;

use anyhow::{Context, Result};
use tracing::info;

pub use assets::{AssetError, AssetErrors};
pub use normalize::{normalize, NormalizeError};
pub use pixels::{CanonicalPixelBuffer, PixelBuffer, PixelError, PixelFormat};
pub use render_loop::{FrameSettings, FrameStats, LoopState};
pub use resources::SceneResources;
pub use shader::ShaderProgram;
pub use types::{RendererConfig, TEXTURE_COUNT};

use gpu::{GraphicsContext, WgpuContext};
use window::{escape_closes, DesktopWindow, WindowHost};

/// Runs the demo to completion.
///
/// Textures are loaded and normalised before any window exists, so a bad
/// asset fails start-up without touching the windowing system.
pub fn run(config: RendererConfig) -> Result<FrameStats> {
    let images = assets::load_texture_images(&config.textures)?;

    let window = DesktopWindow::create(config.window_size, &config.title, config.resizable)
        .context("failed to initialise windowing")?;
    let mut gpu = WgpuContext::new(window.handle()).context("failed to initialise GPU")?;

    let program =
        ShaderProgram::from_files(&mut gpu, &config.vertex_shader, &config.fragment_shader)?;
    let scene = match SceneResources::build(
        &mut gpu,
        &geometry::QUAD_VERTICES,
        &geometry::QUAD_INDICES,
        images,
    ) {
        Ok(scene) => scene,
        Err(err) => {
            program.release(&mut gpu);
            return Err(err);
        }
    };

    run_session(window, gpu, scene, program, &FrameSettings::from(&config))
}

/// Registers the escape handler and drives the render loop, then tears
/// everything down in order: scene and program handles, the graphics
/// context, and finally the window.
///
/// Teardown happens exactly once whether or not the loop failed.
pub fn run_session<W, G>(
    mut window: W,
    mut gpu: G,
    scene: SceneResources,
    program: ShaderProgram,
    settings: &FrameSettings,
) -> Result<FrameStats>
where
    W: WindowHost,
    G: GraphicsContext,
{
    window.set_key_callback(escape_closes);
    let outcome = render_loop::run(&mut window, &mut gpu, &scene, &program, settings);

    scene.release(&mut gpu);
    program.release(&mut gpu);
    drop(gpu);
    window.terminate();
    info!("shutdown complete");

    outcome
}
