//! GPU rendering subsystem.
//!
//! The renderer owns its GPU resources (pipeline, vertex buffer) and issues
//! wgpu commands against a caller-provided target. All setup happens once,
//! at construction; the render path never creates or mutates resources.

mod ctx;
mod triangle;

pub use ctx::{RenderCtx, RenderTarget};
pub use triangle::TriangleRenderer;
