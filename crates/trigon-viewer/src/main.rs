//! Windowed front-end for the trigon render worker.
//!
//! This is the controlling context: it owns the window and the event loop,
//! and drives the worker thread with the two-message protocol. `init` is
//! sent once when the window exists; `render` is sent for every redraw
//! request. All drawing happens on the worker thread.

use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use trigon_engine::logging::{LoggingConfig, init_logging};
use trigon_engine::worker::{WorkerHandle, WorkerMsg, spawn};

struct ViewerApp {
    worker: WorkerHandle,
    window: Option<Arc<Window>>,
}

impl ViewerApp {
    fn new(worker: WorkerHandle) -> Self {
        Self {
            worker,
            window: None,
        }
    }

    fn send_or_exit(&self, event_loop: &ActiveEventLoop, msg: WorkerMsg) {
        if self.worker.send(msg).is_err() {
            log::error!("render worker is gone; exiting");
            event_loop.exit();
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("trigon")
            .with_inner_size(LogicalSize::new(800.0, 600.0))
            .with_resizable(false);

        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        // Hand the surface handle over to the worker. The Arc clone is the
        // "transferable" part; the worker creates the wgpu surface from it.
        let size = window.inner_size();
        let target: wgpu::SurfaceTarget<'static> = Arc::clone(&window).into();
        self.send_or_exit(
            event_loop,
            WorkerMsg::Init {
                target,
                width: size.width,
                height: size.height,
            },
        );

        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => {
                self.send_or_exit(event_loop, WorkerMsg::Render);
            }
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let worker = spawn().context("failed to start render worker")?;

    let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = ViewerApp::new(worker);
    event_loop
        .run_app(&mut app)
        .context("winit event loop terminated with error")?;

    // Close the channel and let the worker drain whatever is queued.
    let ViewerApp { worker, window } = app;
    drop(window);
    worker.join();

    Ok(())
}
