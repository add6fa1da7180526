use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::OwnedMutexGuard;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::window::{Window, WindowId};

use crate::config::EngineConfig;
use crate::core::{App, AppControl, EngineHandles, FrameCtx, SetupCtx};
use crate::device::{GpuInit, WindowSurface};
use crate::draw::DrawManager;
use crate::frame::{FrameLock, FrameOrchestrator, FrameReport, WindowActions, WindowFault};
use crate::input::InputCollector;
use crate::input::platform::winit::translate_window_event;
use crate::sync::lock;
use crate::time::FrameClock;

/// Back-off while frames are being skipped (minimized, surface lost).
const SKIP_BACKOFF: Duration = Duration::from_millis(8);

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "tiamat".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum RuntimeEvent {
    /// Window actions are queued.
    WindowWork,
    /// The render loop returned.
    RenderStopped,
}

/// State published by the window thread, snapshotted by the render thread
/// under the frame lock.
struct WindowShared {
    input: InputCollector,
    size: PhysicalSize<u32>,
    scale_factor: f64,
    resized: bool,
}

impl WindowShared {
    fn new(size: PhysicalSize<u32>, scale_factor: f64) -> Self {
        Self {
            input: InputCollector::default(),
            size,
            scale_factor,
            resized: false,
        }
    }

    fn set_size(&mut self, size: PhysicalSize<u32>, scale_factor: f64) {
        self.size = size;
        self.scale_factor = scale_factor;
        self.resized = true;
    }

    fn take_resize(&mut self) -> Option<(PhysicalSize<u32>, f64)> {
        std::mem::take(&mut self.resized).then_some((self.size, self.scale_factor))
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Runs the winit event loop on the calling thread until the window closes,
    /// the app exits, or the render thread faults.
    pub fn run<A: App>(
        config: RuntimeConfig,
        gpu_init: GpuInit,
        engine: EngineConfig,
        app: A,
    ) -> Result<()> {
        let event_loop = EventLoop::<RuntimeEvent>::with_user_event()
            .build()
            .context("failed to create winit EventLoop")?;
        let mut state = RuntimeState::new(config, gpu_init, engine, app, event_loop.create_proxy());

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        state.finish()
    }
}

/// Everything the render thread takes ownership of.
struct RenderLaunch<A> {
    window: Arc<Window>,
    gpu_init: GpuInit,
    engine: EngineConfig,
    app: A,
    actions: WindowActions<Window>,
    stop: Arc<AtomicBool>,
}

struct RuntimeState<A: App> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    engine: EngineConfig,
    app: Option<A>,
    proxy: EventLoopProxy<RuntimeEvent>,

    window: Option<Arc<Window>>,
    shared: FrameLock<WindowShared>,
    actions: WindowActions<Window>,
    fault: WindowFault,
    stop: Arc<AtomicBool>,
    render: Option<JoinHandle<()>>,
}

impl<A: App> RuntimeState<A> {
    fn new(
        config: RuntimeConfig,
        gpu_init: GpuInit,
        engine: EngineConfig,
        app: A,
        proxy: EventLoopProxy<RuntimeEvent>,
    ) -> Self {
        let waker = Mutex::new(proxy.clone());
        let actions = WindowActions::new().with_waker(move || {
            // Fails only once the event loop is gone.
            let _ = lock(&waker).send_event(RuntimeEvent::WindowWork);
        });

        Self {
            config,
            gpu_init,
            engine,
            app: Some(app),
            proxy,
            window: None,
            shared: FrameLock::new(WindowShared::new(PhysicalSize::new(0, 0), 1.0)),
            actions,
            fault: WindowFault::new(),
            stop: Arc::new(AtomicBool::new(false)),
            render: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        *self.shared.hold() = WindowShared::new(window.inner_size(), window.scale_factor());

        let app = self.app.take().context("render thread already started")?;
        let launch = RenderLaunch {
            window: Arc::clone(&window),
            gpu_init: self.gpu_init.clone(),
            engine: self.engine.clone(),
            app,
            actions: self.actions.clone(),
            stop: Arc::clone(&self.stop),
        };
        let fault = self.fault.clone();
        let proxy = self.proxy.clone();

        let handle = self
            .shared
            .launch("tiamat-render", move |initial, shared| {
                if let Err(err) = render_main(initial, shared, launch) {
                    log::error!("render thread failed: {err:#}");
                    fault.record(format!("{err:#}"));
                }
                let _ = proxy.send_event(RuntimeEvent::RenderStopped);
            })
            .context("failed to spawn render thread")?;

        self.window = Some(window);
        self.render = Some(handle);
        Ok(())
    }

    fn request_stop(&self, event_loop: &ActiveEventLoop) {
        self.stop.store(true, Ordering::Release);
        event_loop.exit();
    }

    /// Joins the render thread and surfaces its fault, if any.
    fn finish(&mut self) -> Result<()> {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.render.take() {
            if handle.join().is_err() {
                self.fault.record("render thread panicked");
            }
        }
        let discarded = self.actions.discard_pending();
        if discarded > 0 {
            log::debug!("{discarded} window action(s) discarded at shutdown");
        }
        self.fault.raise_if_faulted()?;
        Ok(())
    }
}

impl<A: App> ApplicationHandler<RuntimeEvent> for RuntimeState<A> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(err) = self.start(event_loop) {
            log::error!("failed to start: {err:#}");
            self.fault.record(format!("{err:#}"));
            self.request_stop(event_loop);
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: RuntimeEvent) {
        match event {
            RuntimeEvent::WindowWork => {
                if let Some(window) = &self.window {
                    self.actions.run_pending(window);
                }
            }
            RuntimeEvent::RenderStopped => self.request_stop(event_loop),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.fault.is_faulted() {
            self.request_stop(event_loop);
            return;
        }
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.as_ref() else {
            return;
        };

        if let Some(ev) = translate_window_event(window.scale_factor(), &event) {
            self.shared.hold().input.apply(&ev);
        }

        match &event {
            WindowEvent::CloseRequested => self.request_stop(event_loop),

            WindowEvent::Resized(size) => {
                self.shared.hold().set_size(*size, window.scale_factor());
            }

            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.shared.hold().set_size(window.inner_size(), *scale_factor);
            }

            _ => {}
        }
    }
}

fn render_main<A: App>(
    initial: OwnedMutexGuard<WindowShared>,
    shared: FrameLock<WindowShared>,
    launch: RenderLaunch<A>,
) -> Result<()> {
    let RenderLaunch {
        window,
        gpu_init,
        engine,
        mut app,
        actions,
        stop,
    } = launch;

    let runtime = engine
        .build_runtime()
        .context("failed to start worker runtime")?;
    let (device, surface) = pollster::block_on(WindowSurface::new(
        window,
        &gpu_init,
        engine.clear_color,
    ))
    .context("GPU initialization failed")?;

    let manager = Arc::new(DrawManager::new(Arc::new(device), engine.groups));
    let mut orchestrator =
        FrameOrchestrator::new(Arc::clone(&manager), surface, runtime.handle().clone())
            .with_window_work(Arc::new(actions.clone()));
    let capture = Arc::clone(orchestrator.capture());
    let handles = EngineHandles {
        manager: &manager,
        capture: &capture,
        window: &actions,
        runtime: runtime.handle(),
    };

    // Construction finished; the window thread may publish and run window work
    // again, which `setup` is allowed to wait on.
    drop(initial);
    app.setup(&mut SetupCtx { engine: handles })
        .context("app setup failed")?;

    let mut clock = FrameClock::with_config(engine.clock);
    let mut last: Option<FrameReport> = None;

    let result = loop {
        if stop.load(Ordering::Acquire) {
            break Ok(());
        }

        let (input, resize) = {
            let mut s = shared.hold();
            let resize = s.take_resize();
            (s.input.snapshot(), resize)
        };
        if let Some((size, scale_factor)) = resize {
            orchestrator.resize(size.width, size.height, scale_factor);
        }

        let time = clock.tick();
        let control = app.on_frame(&mut FrameCtx {
            engine: handles,
            time,
            input: &input,
            last_report: last.as_ref(),
        });
        if control == AppControl::Exit {
            break Ok(());
        }

        match orchestrator.render_frame(time.dt, &input) {
            Ok(report) => {
                if report.skipped {
                    std::thread::sleep(SKIP_BACKOFF);
                }
                last = Some(report);
            }
            Err(err) if err.is_fatal() => break Err(err).context("render loop stopped"),
            Err(err) => log::warn!("frame {}: {err}", time.frame_index),
        }
    };

    app.on_shutdown();
    orchestrator.shutdown(runtime.handle());
    runtime.block_on(manager.clear_resources());
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_is_taken_once() {
        let mut s = WindowShared::new(PhysicalSize::new(10, 10), 1.0);
        assert_eq!(s.take_resize(), None);

        s.set_size(PhysicalSize::new(20, 30), 2.0);
        s.set_size(PhysicalSize::new(40, 30), 2.0);
        assert_eq!(s.take_resize(), Some((PhysicalSize::new(40, 30), 2.0)));
        assert_eq!(s.take_resize(), None);
    }
}
