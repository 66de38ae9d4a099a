use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "texquad",
    author,
    version,
    about = "Draws a quad blending two textures"
)]
pub struct Cli {
    /// Directory holding the shaders and images (defaults to the working directory).
    #[arg(long, env = "TEXQUAD_ASSETS", value_name = "DIR")]
    pub assets: Option<PathBuf>,

    /// Image bound to texture unit 0.
    #[arg(long, value_name = "FILE")]
    pub texture1: Option<PathBuf>,

    /// Image bound to texture unit 1.
    #[arg(long, value_name = "FILE")]
    pub texture2: Option<PathBuf>,

    /// GLSL vertex stage.
    #[arg(long, value_name = "FILE")]
    pub vertex_shader: Option<PathBuf>,

    /// GLSL fragment stage.
    #[arg(long, value_name = "FILE")]
    pub fragment_shader: Option<PathBuf>,

    /// Window size in physical pixels (e.g. `1208x800`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Window title.
    #[arg(long)]
    pub title: Option<String>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid window width".to_string())?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| "invalid window height".to_string())?;
    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".into());
    }
    Ok((width, height))
}
