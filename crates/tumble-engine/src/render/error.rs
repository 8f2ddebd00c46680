use thiserror::Error;

use crate::shader::{CompileError, LinkError};

/// Fatal setup failure. `FrameLoop::init` logs it and reports `false`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SetupError {
    #[error("program `{program}`: {source}")]
    Compile {
        program: String,
        #[source]
        source: CompileError,
    },

    #[error("program `{program}`: {source}")]
    Link {
        program: String,
        #[source]
        source: LinkError,
    },

    #[error("invalid scene configuration: {0}")]
    Config(String),

    #[error("texture `{label}` has {found} values, expected {expected}")]
    Texture {
        label: &'static str,
        expected: usize,
        found: usize,
    },
}
