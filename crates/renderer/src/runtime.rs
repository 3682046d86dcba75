use std::time::Instant;

use tracing::trace;

use crate::geometry::QUAD_VERTEX_COUNT;
use crate::gl::GlApi;
use crate::session::ShaderSession;
use crate::types::Viewport;
use crate::uniforms::update_uniforms;

/// Identifies one scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Source of frame callbacks, e.g. the window's redraw requests.
///
/// The scheduler later calls back into [`RenderLoop::tick`] with the handle it
/// returned from `request_frame`.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// What a single [`RenderLoop::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The active program was drawn and another frame scheduled.
    Drawn,
    /// No program is active yet; another frame was scheduled anyway.
    Skipped,
    /// The loop is stopped or the handle is stale. Nothing was scheduled.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopState {
    Stopped,
    Running {
        start_time: Instant,
        frame: FrameHandle,
    },
}

/// Per-frame driver that draws whatever program the session holds right now.
///
/// Program swaps happen in the session between ticks, so the loop never has
/// to be restarted to pick up a new shader.
#[derive(Debug, Clone)]
pub struct RenderLoop {
    state: LoopState,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LoopState::Running { .. })
    }

    /// Handle of the frame the loop is waiting on, if running.
    pub fn pending_frame(&self) -> Option<FrameHandle> {
        match self.state {
            LoopState::Running { frame, .. } => Some(frame),
            LoopState::Stopped => None,
        }
    }

    /// Records `now` as time zero and schedules the first frame. Does nothing
    /// if the loop is already running.
    pub fn start<S: FrameScheduler>(&mut self, scheduler: &mut S, now: Instant) {
        if self.is_running() {
            trace!("render loop already running");
            return;
        }
        let frame = scheduler.request_frame();
        self.state = LoopState::Running {
            start_time: now,
            frame,
        };
    }

    pub fn stop<S: FrameScheduler>(&mut self, scheduler: &mut S) {
        if let LoopState::Running { frame, .. } = self.state {
            scheduler.cancel_frame(frame);
        }
        self.state = LoopState::Stopped;
    }

    pub fn tick<G: GlApi, S: FrameScheduler>(
        &mut self,
        handle: FrameHandle,
        scheduler: &mut S,
        session: &ShaderSession<G>,
        viewport: Viewport,
        now: Instant,
    ) -> TickOutcome {
        let start_time = match self.state {
            LoopState::Running { start_time, frame } if frame == handle => start_time,
            _ => {
                trace!(frame = handle.id(), "ignoring stale frame");
                return TickOutcome::Idle;
            }
        };

        let elapsed = now.saturating_duration_since(start_time).as_secs_f32();
        let drawn = render_frame(session, viewport, elapsed);

        let frame = scheduler.request_frame();
        self.state = LoopState::Running { start_time, frame };
        if drawn {
            TickOutcome::Drawn
        } else {
            TickOutcome::Skipped
        }
    }
}

/// Draws the session's active program over the full viewport. Returns false
/// when there is nothing to draw.
fn render_frame<G: GlApi>(session: &ShaderSession<G>, viewport: Viewport, elapsed: f32) -> bool {
    let gl = session.gl();
    gl.viewport(0, 0, viewport.width as i32, viewport.height as i32);
    gl.clear_to(0.0, 0.0, 0.0, 1.0);

    let Some(program) = session.active_program() else {
        return false;
    };
    gl.use_program(Some(program.raw()));
    update_uniforms(gl, program, elapsed, viewport);
    gl.draw_triangle_strip(0, QUAD_VERTEX_COUNT);
    true
}
