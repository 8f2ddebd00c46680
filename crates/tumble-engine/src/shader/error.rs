use thiserror::Error;

use super::ShaderStage;

/// Shader compilation failure. The message carries the compiler diagnostic.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("could not compile {stage} shader:\n{message}")]
    Parse { stage: ShaderStage, message: String },

    #[error("{stage} shader failed validation: {message}")]
    Validation { stage: ShaderStage, message: String },

    #[error("{stage} shader has no {stage} entry point")]
    MissingEntryPoint { stage: ShaderStage },
}

/// Program link failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    #[error("expected a {expected} shader, got a {found} shader")]
    StageMismatch {
        expected: ShaderStage,
        found: ShaderStage,
    },

    #[error("fragment input at location {location} {detail}")]
    Interface { location: u32, detail: String },

    #[error("uniform block differs between vertex and fragment stages")]
    UniformBlockMismatch,

    #[error("`{name}` is bound at group {group} binding {binding}, which is not supported")]
    UnsupportedBinding { name: String, group: u32, binding: u32 },

    #[error("attribute `{name}` is not a 32-bit float scalar or vector")]
    UnsupportedAttribute { name: String },

    #[error("program does not declare required attribute `{0}`")]
    MissingAttribute(&'static str),

    #[error("program does not declare required uniform `{0}`")]
    MissingUniform(&'static str),

    #[error("program does not declare required texture `{0}`")]
    MissingTexture(&'static str),

    #[error("uniform `{name}` has type {found:?}, expected {expected:?}")]
    UniformType {
        name: &'static str,
        expected: super::UniformKind,
        found: super::UniformKind,
    },

    #[error("GPU rejected program: {0}")]
    Pipeline(String),
}
