use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::gpu::{GraphicsContext, ProgramId, ProgramSources, UniformLocation};

/// Linked vertex + fragment program loaded from disk.
///
/// The value owns its [`ProgramId`]; [`ShaderProgram::release`] consumes it so
/// a program can only be deleted once.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
}

impl ShaderProgram {
    pub fn from_files<G: GraphicsContext>(
        gpu: &mut G,
        vertex_path: &Path,
        fragment_path: &Path,
    ) -> Result<Self> {
        let vertex = read_stage(vertex_path)?;
        let fragment = read_stage(fragment_path)?;
        let sources = ProgramSources {
            label: format!("{} + {}", vertex_path.display(), fragment_path.display()),
            vertex,
            fragment,
        };
        Self::from_sources(gpu, &sources)
    }

    pub fn from_sources<G: GraphicsContext>(gpu: &mut G, sources: &ProgramSources) -> Result<Self> {
        let id = gpu
            .create_program(sources)
            .with_context(|| format!("failed to build shader program {}", sources.label))?;
        tracing::info!(program = ?id, label = %sources.label, "shader program ready");
        Ok(Self { id })
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn activate<G: GraphicsContext>(&self, gpu: &mut G) {
        gpu.use_program(self.id);
    }

    pub fn uniform_location<G: GraphicsContext>(
        &self,
        gpu: &G,
        name: &str,
    ) -> Option<UniformLocation> {
        gpu.uniform_location(self.id, name)
    }

    pub fn release<G: GraphicsContext>(self, gpu: &mut G) {
        gpu.delete_program(self.id);
    }
}

fn read_stage(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read shader source {}", path.display()))
}
