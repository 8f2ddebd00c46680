//! Shader program management.
//!
//! WGSL sources are compiled and linked on the CPU with `naga` before any GPU
//! object is created. Linking checks the vertex/fragment interface and reflects
//! the attribute, uniform and texture locations that the draw path later binds.
//!
//! Bind point convention (checked at link time):
//! - uniform block: `@group(0) @binding(0)`
//! - texture:       `@group(1) @binding(0)`
//! - sampler:       `@group(1) @binding(1)`

mod compile;
mod error;
mod link;
pub mod sources;

pub use compile::{compile, CompiledShader, ShaderStage};
pub use error::{CompileError, LinkError};
pub use link::{
    link, AttributeInfo, LinkedProgram, TextureSlot, UniformBlockInfo, UniformKind, UniformMember,
    UniformSlot, SAMPLER_BINDING, TEXTURE_BINDING, TEXTURE_GROUP, UNIFORM_BINDING, UNIFORM_GROUP,
};

/// Names looked up on linked programs.
pub mod names {
    pub const POSITION: &str = "position";
    pub const UV: &str = "uv";
    pub const NORMAL: &str = "normal";

    pub const MVP: &str = "mvp";
    pub const MV: &str = "mv";
    pub const VIEW: &str = "view";
    pub const NORMAL_MATRIX: &str = "normal_matrix";
    pub const LIGHT_POSITION: &str = "light_position";

    pub const DIFFUSE_MAP: &str = "diffuse_map";
}
