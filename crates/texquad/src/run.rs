use anyhow::Result;
use renderer::RendererConfig;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

pub fn run(cli: Cli) -> Result<()> {
    let config = build_config(cli);
    tracing::info!(
        textures = ?config.textures,
        vertex = %config.vertex_shader.display(),
        fragment = %config.fragment_shader.display(),
        "starting texquad"
    );
    let stats = renderer::run(config)?;
    tracing::info!(frames = stats.frames, "exiting");
    Ok(())
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Starts from the bundled defaults (rooted at `--assets` when given) and
/// applies individual overrides on top.
fn build_config(cli: Cli) -> RendererConfig {
    let mut config = match cli.assets {
        Some(dir) => RendererConfig::with_asset_dir(dir),
        None => RendererConfig::default(),
    };
    if let Some(path) = cli.texture1 {
        config.textures[0] = path;
    }
    if let Some(path) = cli.texture2 {
        config.textures[1] = path;
    }
    if let Some(path) = cli.vertex_shader {
        config.vertex_shader = path;
    }
    if let Some(path) = cli.fragment_shader {
        config.fragment_shader = path;
    }
    if let Some(size) = cli.size {
        config.window_size = size;
    }
    if let Some(title) = cli.title {
        config.title = title;
    }
    config
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;

    use super::*;

    #[test]
    fn overrides_apply_on_top_of_asset_dir() {
        let cli = Cli::try_parse_from([
            "texquad",
            "--assets",
            "/srv/demo",
            "--texture2",
            "/tmp/face.png",
            "--size",
            "800x600",
        ])
        .unwrap();
        let config = build_config(cli);
        assert_eq!(config.textures[0], PathBuf::from("/srv/demo/container.jpg"));
        assert_eq!(config.textures[1], PathBuf::from("/tmp/face.png"));
        assert_eq!(config.vertex_shader, PathBuf::from("/srv/demo/texture.vs"));
        assert_eq!(config.window_size, (800, 600));
        assert_eq!(config.title, "Texture Example");
    }
}
