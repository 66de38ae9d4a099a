use std::path::{Path, PathBuf};

use crate::gpu::ClearColor;

/// Number of textures the quad samples from.
pub const TEXTURE_COUNT: usize = 2;

pub const DEFAULT_VERTEX_SHADER: &str = "texture.vs";
pub const DEFAULT_FRAGMENT_SHADER: &str = "texture.frag";
pub const DEFAULT_TEXTURES: [&str; TEXTURE_COUNT] = ["container.jpg", "awesomeface.png"];
pub const DEFAULT_SAMPLER_UNIFORMS: [&str; TEXTURE_COUNT] = ["ourTexture1", "ourTexture2"];
pub const DEFAULT_CLEAR_COLOR: ClearColor = ClearColor::new(0.2, 0.3, 0.3, 1.0);

/// Immutable configuration passed to the renderer at start-up.
///
/// `RendererConfig` mirrors CLI flags. Relative paths resolve against the
/// working directory.
#[derive(Clone, Debug, PartialEq)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub window_size: (u32, u32),
    pub title: String,
    pub resizable: bool,
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    /// Images bound to texture units 0 and 1, in that order.
    pub textures: [PathBuf; TEXTURE_COUNT],
    /// Sampler uniform names pointed at units 0 and 1.
    pub sampler_uniforms: [String; TEXTURE_COUNT],
    pub clear_color: ClearColor,
}

impl Default for RendererConfig {
    /// Provides the 1208x800 fixed-size window with bundled asset names.
    fn default() -> Self {
        Self {
            window_size: (1208, 800),
            title: "Texture Example".to_string(),
            resizable: false,
            vertex_shader: PathBuf::from(DEFAULT_VERTEX_SHADER),
            fragment_shader: PathBuf::from(DEFAULT_FRAGMENT_SHADER),
            textures: DEFAULT_TEXTURES.map(PathBuf::from),
            sampler_uniforms: DEFAULT_SAMPLER_UNIFORMS.map(String::from),
            clear_color: DEFAULT_CLEAR_COLOR,
        }
    }
}

impl RendererConfig {
    /// Default configuration with every asset path resolved under `dir`.
    pub fn with_asset_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let mut config = Self::default();
        config.vertex_shader = dir.join(DEFAULT_VERTEX_SHADER);
        config.fragment_shader = dir.join(DEFAULT_FRAGMENT_SHADER);
        config.textures = DEFAULT_TEXTURES.map(|name| dir.join(name));
        config
    }
}
