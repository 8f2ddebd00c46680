use std::borrow::Cow;
use std::fmt;

use super::CompileError;

/// Programmable pipeline stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn as_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// A parsed and validated single-stage WGSL module.
#[derive(Debug, Clone)]
pub struct CompiledShader {
    stage: ShaderStage,
    source: Cow<'static, str>,
    entry_index: usize,
    module: naga::Module,
}

impl CompiledShader {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// WGSL text handed to the GPU when the program is built.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Name of the entry point for [`Self::stage`].
    pub fn entry_point(&self) -> &str {
        &self.entry().name
    }

    pub(crate) fn module(&self) -> &naga::Module {
        &self.module
    }

    pub(crate) fn entry(&self) -> &naga::EntryPoint {
        &self.module.entry_points[self.entry_index]
    }
}

/// Compiles one shader stage.
///
/// The diagnostic is logged at ERROR before the error is returned, so callers
/// only need to decide whether to abort.
pub fn compile(
    stage: ShaderStage,
    source: impl Into<Cow<'static, str>>,
) -> Result<CompiledShader, CompileError> {
    let source = source.into();

    let result = compile_inner(stage, &source);
    match result {
        Ok((module, entry_index)) => Ok(CompiledShader {
            stage,
            source,
            entry_index,
            module,
        }),
        Err(err) => {
            log::error!("{err}");
            Err(err)
        }
    }
}

fn compile_inner(stage: ShaderStage, source: &str) -> Result<(naga::Module, usize), CompileError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| CompileError::Parse {
        stage,
        message: e.emit_to_string(source),
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    );
    validator
        .validate(&module)
        .map_err(|e| CompileError::Validation {
            stage,
            message: e.into_inner().to_string(),
        })?;

    let entry_index = module
        .entry_points
        .iter()
        .position(|ep| ep.stage == stage.as_naga())
        .ok_or(CompileError::MissingEntryPoint { stage })?;

    Ok((module, entry_index))
}
