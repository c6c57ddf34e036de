//! Error taxonomy of the render pipeline.
//!
//! Construction-time failures (context, shader, framebuffer) are fatal for the
//! object being built. Usage errors are programming mistakes and are surfaced
//! as explicit results. Running on the baseline API is not an error at all.

use thiserror::Error;

use crate::backend::{FramebufferStatus, ShaderStage};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no graphics context could be created: {0}")]
    ContextUnavailable(String),

    #[error("{stage:?} stage of '{label}' failed to compile:\n{log}")]
    ShaderCompile {
        label: String,
        stage: ShaderStage,
        log: String,
    },

    #[error("program '{label}' failed to link: {log}")]
    ProgramLink { label: String, log: String },

    #[error("framebuffer '{label}' is incomplete: {status:?}")]
    FramebufferIncomplete {
        label: String,
        status: FramebufferStatus,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("{kind} code {code} was never registered on program '{program}'")]
    UnregisteredCode {
        kind: &'static str,
        code: usize,
        program: String,
    },

    #[error("no shader program is bound")]
    NoProgramBound,

    #[error("surface error: {0}")]
    Surface(String),
}

impl RenderError {
    /// Whether the error came from a lost or outdated surface that a resize fixes.
    pub fn is_surface_lost(&self) -> bool {
        matches!(self, RenderError::Surface(_))
    }
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
