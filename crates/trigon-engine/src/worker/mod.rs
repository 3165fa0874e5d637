//! Render worker: the message-driven owner of all GPU state.
//!
//! The controlling context hands a surface target to a dedicated worker
//! thread and drives it with exactly two message kinds (`init`, `render`).
//! Messages are processed one at a time, in arrival order; a handler always
//! runs to completion before the next message is looked at, so no GPU state
//! is ever mutated concurrently.

mod manager;

pub use manager::{RenderWorker, WorkerHandle, WorkerMsg, WorkerPhase, spawn};
