use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};

use crate::device::{Gpu, GpuInit, SurfaceErrorAction};
use crate::error::{InitError, WorkerError};
use crate::render::{RenderCtx, RenderTarget, TriangleRenderer};

/// Inbound messages. This is the entire external protocol.
pub enum WorkerMsg {
    /// Run the one-time setup sequence against the given surface target.
    ///
    /// The target is typically an `Arc<winit::window::Window>`; `width` and
    /// `height` are the surface size in physical pixels. A repeated `Init`
    /// re-runs the whole sequence; the previous GPU objects are dropped and
    /// the most recent set wins.
    Init {
        target: wgpu::SurfaceTarget<'static>,
        width: u32,
        height: u32,
    },

    /// Draw one frame. Only valid after a successful `Init`.
    Render,
}

/// Observable lifecycle of a worker.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WorkerPhase {
    /// No `Init` received yet. `Render` is a defined no-op error.
    Uninitialized,
    /// Setup completed; `Render` draws.
    Ready,
    /// Setup failed (or the surface died). Absorbing: only a further `Init`
    /// attempt leaves this phase.
    Failed,
}

enum WorkerState {
    Uninitialized,
    Ready {
        gpu: Gpu,
        renderer: TriangleRenderer,
    },
    Failed,
}

/// The render-context manager.
///
/// Owns the drawing context, the linked shader pipeline, and the vertex
/// buffer, all created by `Init` and held until the worker is dropped.
/// Methods return typed results so callers (and tests) can observe
/// outcomes; the message loop in [`spawn`] degrades them to log lines,
/// matching the protocol's lack of a response channel.
pub struct RenderWorker {
    state: WorkerState,
}

impl Default for RenderWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderWorker {
    pub fn new() -> Self {
        Self {
            state: WorkerState::Uninitialized,
        }
    }

    pub fn phase(&self) -> WorkerPhase {
        match self.state {
            WorkerState::Uninitialized => WorkerPhase::Uninitialized,
            WorkerState::Ready { .. } => WorkerPhase::Ready,
            WorkerState::Failed => WorkerPhase::Failed,
        }
    }

    /// Processes exactly one message to completion.
    pub fn handle(&mut self, msg: WorkerMsg) -> Result<(), WorkerError> {
        match msg {
            WorkerMsg::Init {
                target,
                width,
                height,
            } => self.init(target, width, height),
            WorkerMsg::Render => self.render_frame(),
        }
    }

    /// One-time setup: context acquisition, stage compilation, link, vertex
    /// upload. Any failure leaves the worker in `Failed` with no partially
    /// linked pipeline.
    fn init(
        &mut self,
        target: wgpu::SurfaceTarget<'static>,
        width: u32,
        height: u32,
    ) -> Result<(), WorkerError> {
        // Drop the previous generation first so a re-init starts clean.
        self.state = WorkerState::Uninitialized;

        let gpu = match pollster::block_on(Gpu::new(target, width, height, GpuInit::default())) {
            Ok(gpu) => gpu,
            Err(e) => {
                self.state = WorkerState::Failed;
                return Err(InitError::ContextAcquisition(format!("{e:#}")).into());
            }
        };

        let ctx = RenderCtx::new(gpu.device(), gpu.surface_format());
        let renderer = match TriangleRenderer::new(&ctx) {
            Ok(r) => r,
            Err(e) => {
                self.state = WorkerState::Failed;
                return Err(e.into());
            }
        };

        let format = gpu.surface_format();
        log::info!("render worker initialized ({width}x{height}, {format:?})");
        self.state = WorkerState::Ready { gpu, renderer };
        Ok(())
    }

    fn render_frame(&mut self) -> Result<(), WorkerError> {
        let WorkerState::Ready { gpu, renderer } = &mut self.state else {
            return Err(WorkerError::NotReady);
        };

        let action = match gpu.begin_frame() {
            Ok(mut frame) => {
                {
                    let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);
                    renderer.render(&mut target);
                }
                gpu.submit(frame);
                return Ok(());
            }
            Err(err) => {
                log::warn!("surface error while rendering: {err}");
                gpu.handle_surface_error(err)
            }
        };

        match action {
            SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => Ok(()),
            SurfaceErrorAction::Fatal => {
                self.state = WorkerState::Failed;
                Err(WorkerError::SurfaceFatal)
            }
        }
    }
}

/// Handle to a spawned worker thread.
///
/// Messages sent through the handle are processed in order. Dropping the
/// handle closes the channel; the thread drains what is queued and exits.
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerMsg>,
    join: thread::JoinHandle<()>,
}

impl WorkerHandle {
    /// Queues a message for the worker.
    pub fn send(&self, msg: WorkerMsg) -> std::result::Result<(), mpsc::SendError<WorkerMsg>> {
        self.tx.send(msg)
    }

    /// Closes the channel and waits for the worker to finish its queue.
    pub fn join(self) {
        let WorkerHandle { tx, join } = self;
        drop(tx);
        if join.join().is_err() {
            log::error!("render worker thread panicked");
        }
    }
}

/// Starts a render worker on a dedicated thread.
///
/// Handler errors are logged, not returned: the inbound protocol has no
/// response channel, so the log is the only failure side channel at this
/// boundary.
pub fn spawn() -> Result<WorkerHandle> {
    let (tx, rx) = mpsc::channel::<WorkerMsg>();

    let join = thread::Builder::new()
        .name("trigon-render".to_string())
        .spawn(move || {
            let mut worker = RenderWorker::new();
            for msg in rx {
                if let Err(e) = worker.handle(msg) {
                    log::error!("render worker: {e}");
                }
            }
            log::debug!("render worker channel closed; exiting");
        })
        .context("failed to spawn render worker thread")?;

    Ok(WorkerHandle { tx, join })
}
