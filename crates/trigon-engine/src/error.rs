//! Typed failures for the one-time render setup and the worker message loop.

use std::fmt;

use thiserror::Error;

/// Shader stage identifier, used in compile diagnostics.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// A failure during one-time setup.
///
/// Any variant leaves the worker non-functional; none of these are retried.
#[derive(Debug, Error)]
pub enum InitError {
    /// Instance/surface/adapter/device acquisition failed.
    #[error("graphics context acquisition failed: {0}")]
    ContextAcquisition(String),

    /// A shader stage failed to compile. `log` carries the driver diagnostic.
    #[error("{stage} shader compilation failed: {log}")]
    ShaderCompile { stage: ShaderStage, log: String },

    /// The two compiled stages failed to link into a pipeline.
    #[error("shader program link failed: {log}")]
    ProgramLink { log: String },
}

/// A failure while handling a worker message.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Init(#[from] InitError),

    /// `render` arrived before a successful `init`. Defined as a no-op.
    #[error("render requested before successful init")]
    NotReady,

    /// The surface is lost and cannot be restored (commonly OOM).
    #[error("surface is lost and cannot be restored")]
    SurfaceFatal,
}
