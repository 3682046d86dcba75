use std::ffi::CString;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use glutin::config::{Config, ConfigTemplateBuilder};
use glutin::context::{
    ContextApi, ContextAttributesBuilder, NotCurrentContext, PossiblyCurrentContext, Version,
};
use glutin::display::{Display, DisplayApiPreference};
use glutin::prelude::*;
use glutin::surface::{Surface, SurfaceAttributesBuilder, WindowSurface};
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle, RawWindowHandle};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy};
use winit::window::{Window, WindowBuilder};

use crate::runtime::{FrameHandle, FrameScheduler, RenderLoop, TickOutcome};
use crate::session::ShaderSession;
use crate::types::{Diagnostic, RendererConfig, Viewport};

#[derive(Debug, Clone)]
enum PreviewCommand {
    Rebuild(String),
    Report(String),
    Shutdown,
}

/// Notifications sent from the preview thread back to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewEvent {
    /// A new program is active; `build` counts successful installs.
    Installed { build: u64 },
    /// A rebuild failed and the previous program stayed active.
    Failed(Diagnostic),
    /// The window was closed and the session torn down.
    Closed,
}

/// Handle to the preview window running on its own thread.
///
/// The window owns the GL context and therefore the [`ShaderSession`]; other
/// threads only ever hand it source text.
pub struct PreviewRuntime {
    proxy: EventLoopProxy<PreviewCommand>,
    events: Receiver<PreviewEvent>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl PreviewRuntime {
    /// Opens the window, creates the context and builds `initial_source`.
    ///
    /// Fails with a context [`Diagnostic`] (downcastable from the returned
    /// error) when neither GL ES 2.0 nor desktop GL 2.1 is available; no render
    /// loop is started in that case.
    pub fn spawn(config: RendererConfig, initial_source: String) -> Result<Self> {
        let (ready_tx, ready_rx) = bounded(1);
        let (event_tx, event_rx) = unbounded();
        let handle = thread::Builder::new()
            .name("shaderlab-preview".into())
            .spawn(move || run_preview_thread(config, initial_source, ready_tx, event_tx))
            .map_err(|err| anyhow!("failed to spawn preview thread: {err}"))?;

        let proxy = match ready_rx.recv() {
            Ok(Ok(proxy)) => proxy,
            Ok(Err(err)) => {
                let _ = handle.join();
                return Err(err);
            }
            Err(err) => return Err(anyhow!("preview thread failed to initialise: {err}")),
        };

        Ok(Self {
            proxy,
            events: event_rx,
            join_handle: Some(handle),
        })
    }

    /// Queues a rebuild with `fragment_source`. The outcome arrives as a
    /// [`PreviewEvent`].
    pub fn rebuild(&self, fragment_source: String) -> Result<()> {
        self.proxy
            .send_event(PreviewCommand::Rebuild(fragment_source))
            .map_err(|err| anyhow!("preview window is gone: {err}"))
    }

    /// Shows a status or error message in the window title.
    pub fn report(&self, message: String) -> Result<()> {
        self.proxy
            .send_event(PreviewCommand::Report(message))
            .map_err(|err| anyhow!("preview window is gone: {err}"))
    }

    pub fn events(&self) -> &Receiver<PreviewEvent> {
        &self.events
    }

    pub fn shutdown(mut self) -> Result<()> {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(PreviewCommand::Shutdown);
            handle
                .join()
                .map_err(|err| anyhow!("preview thread panicked: {err:?}"))??;
        }
        Ok(())
    }
}

impl Drop for PreviewRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(PreviewCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

/// Turns redraw requests into [`FrameHandle`]s for the render loop.
struct WindowScheduler {
    window: Arc<Window>,
    next: u64,
    pending: Option<FrameHandle>,
}

impl WindowScheduler {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            next: 0,
            pending: None,
        }
    }

    fn take_pending(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }
}

impl FrameScheduler for WindowScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        let handle = FrameHandle::new(self.next);
        self.pending = Some(handle);
        self.window.request_redraw();
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }
}

/// Everything the event loop closure owns. `session` is declared first so
/// its GL objects are released before the context goes away.
struct PreviewState {
    session: Option<ShaderSession<glow::Context>>,
    render_loop: RenderLoop,
    scheduler: WindowScheduler,
    viewport: Viewport,
    title: String,
    events: Sender<PreviewEvent>,
    surface: Surface<WindowSurface>,
    context: PossiblyCurrentContext,
    window: Arc<Window>,
}

impl PreviewState {
    fn rebuild(&mut self, fragment_source: &str) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let event = match session.rebuild(fragment_source) {
            Ok(()) => {
                self.window.set_title(&self.title);
                PreviewEvent::Installed {
                    build: session.build_count(),
                }
            }
            Err(diagnostic) => {
                self.show_status(&diagnostic.message);
                PreviewEvent::Failed(diagnostic)
            }
        };
        let _ = self.events.send(event);
    }

    fn show_status(&self, message: &str) {
        self.window.set_title(&status_title(&self.title, message));
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return;
        };
        self.surface.resize(&self.context, width, height);
        self.viewport = Viewport::new(size.width, size.height);
        debug!(width = size.width, height = size.height, "preview surface resized");
    }

    fn redraw(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let Some(handle) = self.scheduler.take_pending() else {
            return;
        };
        let outcome = self.render_loop.tick(
            handle,
            &mut self.scheduler,
            session,
            self.viewport,
            Instant::now(),
        );
        if outcome != TickOutcome::Idle {
            if let Err(err) = self.surface.swap_buffers(&self.context) {
                warn!("failed to present frame: {err}");
            }
        }
    }

    fn teardown(&mut self) {
        self.render_loop.stop(&mut self.scheduler);
        if self.session.take().is_some() {
            debug!("shader session released");
            let _ = self.events.send(PreviewEvent::Closed);
        }
    }
}

fn run_preview_thread(
    config: RendererConfig,
    initial_source: String,
    ready_tx: Sender<Result<EventLoopProxy<PreviewCommand>>>,
    event_tx: Sender<PreviewEvent>,
) -> Result<()> {
    let mut builder = EventLoopBuilder::<PreviewCommand>::with_user_event();
    #[cfg(target_os = "linux")]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }

    #[cfg(any(
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
    }
    let event_loop = or_report(
        builder
            .build()
            .map_err(|err| anyhow!("failed to create event loop: {err}")),
        &ready_tx,
    )?;
    let mut state = or_report(create_preview(&event_loop, &config, event_tx), &ready_tx)?;

    state.rebuild(&initial_source);
    state
        .render_loop
        .start(&mut state.scheduler, Instant::now());

    let _ = ready_tx.send(Ok(event_loop.create_proxy()));

    let window_id = state.window.id();
    let run_result = event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);
        match event {
            Event::UserEvent(command) => match command {
                PreviewCommand::Rebuild(source) => state.rebuild(&source),
                PreviewCommand::Report(message) => {
                    state.show_status(&message);
                }
                PreviewCommand::Shutdown => {
                    state.teardown();
                    elwt.exit();
                }
            },
            Event::WindowEvent { window_id: id, event } if id == window_id => match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    state.teardown();
                    elwt.exit();
                }
                WindowEvent::Resized(size) => state.resize(size),
                WindowEvent::RedrawRequested => state.redraw(),
                _ => {}
            },
            Event::LoopExiting => state.teardown(),
            _ => {}
        }
    });

    run_result.map_err(|err| anyhow!("preview event loop error: {err}"))
}

/// Window title carrying a status or diagnostic message.
fn status_title(title: &str, message: &str) -> String {
    format!("{title} | {message}")
}

/// Passes a successful startup step through. A failure goes to the spawning
/// thread over `ready_tx`, so the caller returns before any render loop runs.
fn or_report<T, P>(step: Result<T>, ready_tx: &Sender<Result<P>>) -> Result<T> {
    step.map_err(|err| {
        let message = format!("{err:#}");
        error!("{message}");
        let _ = ready_tx.send(Err(err));
        anyhow!(message)
    })
}

fn create_preview(
    event_loop: &EventLoop<PreviewCommand>,
    config: &RendererConfig,
    events: Sender<PreviewEvent>,
) -> Result<PreviewState> {
    let (width, height) = config.surface_size;
    let width = NonZeroU32::new(width).ok_or_else(|| anyhow!("surface width must be non-zero"))?;
    let height =
        NonZeroU32::new(height).ok_or_else(|| anyhow!("surface height must be non-zero"))?;

    let window_builder = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(PhysicalSize::new(width.get(), height.get()))
        .with_resizable(false);
    let gl_display = create_display(event_loop)?;
    let template = ConfigTemplateBuilder::new().with_alpha_size(8).build();
    // SAFETY: the template carries no native window handle.
    let configs = unsafe { gl_display.find_configs(template) }.map_err(|err| {
        debug!("no GL configs: {err}");
        Diagnostic::context_unsupported()
    })?;
    let gl_config = most_samples(configs, |config| config.num_samples())
        .ok_or_else(Diagnostic::context_unsupported)?;
    let window = glutin_winit::finalize_window(event_loop, window_builder, &gl_config)
        .map_err(|err| anyhow!("failed to create preview window: {err}"))?;
    let window = Arc::new(window);

    let raw_handle = window.raw_window_handle();
    let not_current = create_context(&gl_display, &gl_config, raw_handle)?;

    let surface_attributes =
        SurfaceAttributesBuilder::<WindowSurface>::new().build(raw_handle, width, height);
    // SAFETY: the raw handle belongs to `window`, which outlives the surface.
    let surface = unsafe { gl_display.create_window_surface(&gl_config, &surface_attributes) }
        .map_err(|err| anyhow!("failed to create window surface: {err}"))?;
    let context = not_current
        .make_current(&surface)
        .map_err(|err| anyhow!("failed to make GL context current: {err}"))?;

    // SAFETY: the context was made current on this thread just above.
    let gl = unsafe {
        glow::Context::from_loader_function(|symbol| match CString::new(symbol) {
            Ok(symbol) => gl_display.get_proc_address(&symbol),
            Err(_) => std::ptr::null(),
        })
    };
    let session = ShaderSession::new(gl)?;

    let size = window.inner_size();
    info!(
        width = size.width,
        height = size.height,
        "preview window ready"
    );
    Ok(PreviewState {
        session: Some(session),
        render_loop: RenderLoop::new(),
        scheduler: WindowScheduler::new(Arc::clone(&window)),
        viewport: Viewport::new(size.width, size.height),
        title: config.title.clone(),
        events,
        surface,
        context,
        window,
    })
}

fn create_display(event_loop: &EventLoop<PreviewCommand>) -> Result<Display, Diagnostic> {
    // SAFETY: the display handle belongs to `event_loop`, which outlives every
    // GL object created on this thread.
    unsafe { Display::new(event_loop.raw_display_handle(), display_preference()) }.map_err(
        |err| {
            debug!("no usable GL display: {err}");
            Diagnostic::context_unsupported()
        },
    )
}

#[cfg(target_os = "macos")]
fn display_preference() -> DisplayApiPreference {
    DisplayApiPreference::Cgl
}

#[cfg(target_os = "windows")]
fn display_preference() -> DisplayApiPreference {
    DisplayApiPreference::Wgl(None)
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn display_preference() -> DisplayApiPreference {
    DisplayApiPreference::Egl
}

/// The candidate with the most samples; `None` when there are no candidates.
fn most_samples<C>(configs: impl Iterator<Item = C>, samples: impl Fn(&C) -> u8) -> Option<C> {
    configs.max_by_key(|config| samples(config))
}

/// Context APIs in the order they are tried.
const CONTEXT_CANDIDATES: [ContextApi; 2] = [
    ContextApi::Gles(Some(Version::new(2, 0))),
    ContextApi::OpenGl(Some(Version::new(2, 1))),
];

fn create_context(
    display: &Display,
    config: &Config,
    raw_handle: RawWindowHandle,
) -> Result<NotCurrentContext, Diagnostic> {
    first_available_context(|api| {
        let attributes = ContextAttributesBuilder::new()
            .with_context_api(api)
            .build(Some(raw_handle));
        // SAFETY: `raw_handle` refers to a live window owned by the caller.
        unsafe { display.create_context(config, &attributes) }
    })
}

/// Tries GL ES 2.0 first, then desktop GL 2.1.
fn first_available_context<C, E: fmt::Display>(
    mut create: impl FnMut(ContextApi) -> Result<C, E>,
) -> Result<C, Diagnostic> {
    for api in CONTEXT_CANDIDATES {
        match create(api) {
            Ok(context) => {
                info!(?api, "created GL context");
                return Ok(context);
            }
            Err(err) => debug!(?api, "context creation failed: {err}"),
        }
    }
    Err(Diagnostic::context_unsupported())
}
