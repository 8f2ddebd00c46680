//! Frame rendering pipeline.
//!
//! Everything above this module talks to the GPU through the [`Backend`]
//! trait. [`WgpuBackend`] is the real implementation; tests use an in-memory
//! recorder.
//!
//! Convention:
//! - one draw per object, non-indexed triangle lists
//! - each draw binds exactly the vertex arrays its program reads
//! - uniform values go to the byte offsets reflected from the program

mod backend;
mod dispatch;
mod error;
mod program;
mod uniforms;
mod wgpu_backend;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{AttributeBinding, Backend, BackendInfo, Draw};
pub use dispatch::{dispatch, pack_uniforms, FrameUniforms};
pub use error::SetupError;
pub use program::{AttributeSlot, Locations, Program, ProgramRole};
pub use uniforms::UniformBlock;
pub use wgpu_backend::{WgpuBackend, WgpuBuffer, WgpuProgram, WgpuTexture};
