use std::fmt;

use tracing::debug;

use crate::compile::{compile_stage, POSITION_ATTRIBUTE};
use crate::gl::GlApi;
use crate::types::{Diagnostic, StageKind};

/// Uniform carrying elapsed seconds since the render loop started.
pub const TIME_UNIFORM: &str = "time";
/// Uniform carrying the canvas size in pixels.
pub const RESOLUTION_UNIFORM: &str = "resolution";

/// A linked vertex + fragment pair with its input locations resolved.
///
/// Programs are plain handles: the owner (normally the session) calls
/// [`Program::release`] once it stops using one.
pub struct Program<G: GlApi> {
    raw: G::Program,
    position: u32,
    time: Option<G::UniformLocation>,
    resolution: Option<G::UniformLocation>,
}

impl<G: GlApi> fmt::Debug for Program<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("raw", &self.raw)
            .field("position", &self.position)
            .field("time", &self.time)
            .field("resolution", &self.resolution)
            .finish_non_exhaustive()
    }
}

impl<G: GlApi> Program<G> {
    pub fn raw(&self) -> G::Program {
        self.raw
    }

    pub fn position_location(&self) -> u32 {
        self.position
    }

    pub fn time_location(&self) -> Option<&G::UniformLocation> {
        self.time.as_ref()
    }

    pub fn resolution_location(&self) -> Option<&G::UniformLocation> {
        self.resolution.as_ref()
    }

    pub fn release(self, gl: &G) {
        gl.delete_program(self.raw);
    }
}

/// Deletes the program object unless ownership is taken with `into_raw`.
struct ProgramGuard<'gl, G: GlApi> {
    gl: &'gl G,
    raw: G::Program,
    armed: bool,
}

impl<'gl, G: GlApi> ProgramGuard<'gl, G> {
    fn create(gl: &'gl G) -> Result<Self, Diagnostic> {
        let raw = gl
            .create_program()
            .map_err(|err| Diagnostic::link(format!("failed to create program: {err}")))?;
        Ok(Self {
            gl,
            raw,
            armed: true,
        })
    }

    fn raw(&self) -> G::Program {
        self.raw
    }

    fn into_raw(mut self) -> G::Program {
        self.armed = false;
        self.raw
    }
}

impl<G: GlApi> Drop for ProgramGuard<'_, G> {
    fn drop(&mut self) {
        if self.armed {
            self.gl.delete_program(self.raw);
        }
    }
}

/// Compiles both stages and links them into a [`Program`].
///
/// Stage objects are released on every path once linking has been attempted;
/// a failed link or a missing `position` attribute also releases the program
/// object.
pub fn link_program<G: GlApi>(
    gl: &G,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<Program<G>, Diagnostic> {
    let vertex = compile_stage(gl, StageKind::Vertex, vertex_source)?;
    let fragment = compile_stage(gl, StageKind::Fragment, fragment_source)?;

    let program = ProgramGuard::create(gl)?;
    for stage in [&vertex, &fragment] {
        gl.attach_shader(program.raw(), stage.raw());
    }
    gl.link_program(program.raw());
    let linked = gl.program_link_status(program.raw());

    for stage in [&vertex, &fragment] {
        gl.detach_shader(program.raw(), stage.raw());
        debug!(stage = %stage.kind(), linked, "releasing compiled stage");
    }
    drop(vertex);
    drop(fragment);

    if !linked {
        return Err(Diagnostic::link(gl.program_info_log(program.raw())));
    }

    let position = gl
        .attrib_location(program.raw(), POSITION_ATTRIBUTE)
        .ok_or_else(|| {
            Diagnostic::link(format!(
                "vertex attribute '{POSITION_ATTRIBUTE}' is not active in the linked program"
            ))
        })?;
    let time = gl.uniform_location(program.raw(), TIME_UNIFORM);
    let resolution = gl.uniform_location(program.raw(), RESOLUTION_UNIFORM);

    Ok(Program {
        raw: program.into_raw(),
        position,
        time,
        resolution,
    })
}
