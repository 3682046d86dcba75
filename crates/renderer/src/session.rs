use tracing::{info, warn};

use crate::compile::VERTEX_SHADER_SOURCE;
use crate::geometry::QuadGeometry;
use crate::gl::GlApi;
use crate::program::{link_program, Program};
use crate::types::Diagnostic;

/// Owns the graphics context and everything built on it: the quad buffer and
/// the program the render loop currently draws with.
///
/// A failed rebuild never disturbs the active program. Dropping the session
/// releases the program and the buffer while the context is still alive.
pub struct ShaderSession<G: GlApi> {
    gl: G,
    geometry: Option<QuadGeometry<G>>,
    active: Option<Program<G>>,
    last_error: Option<Diagnostic>,
    builds: u64,
}

impl<G: GlApi> ShaderSession<G> {
    /// Creates the quad buffer. No program is active until the first
    /// successful [`rebuild`](Self::rebuild).
    pub fn new(gl: G) -> Result<Self, Diagnostic> {
        let geometry = QuadGeometry::new(&gl)?;
        Ok(Self {
            gl,
            geometry: Some(geometry),
            active: None,
            last_error: None,
            builds: 0,
        })
    }

    /// Builds a program from the built-in vertex shader and `fragment_source`
    /// and, if that succeeds, swaps it in.
    ///
    /// The previous program is released only after its replacement linked.
    /// On failure the diagnostic is kept as [`last_error`](Self::last_error)
    /// and returned.
    pub fn rebuild(&mut self, fragment_source: &str) -> Result<(), Diagnostic> {
        let program = match link_program(&self.gl, VERTEX_SHADER_SOURCE, fragment_source) {
            Ok(program) => program,
            Err(diagnostic) => {
                warn!(stage = %diagnostic.stage, "{}", diagnostic.message);
                self.last_error = Some(diagnostic.clone());
                return Err(diagnostic);
            }
        };

        if let Some(geometry) = &self.geometry {
            geometry.bind_to(&self.gl, &program);
        }
        if let Some(previous) = self.active.replace(program) {
            previous.release(&self.gl);
        }
        self.last_error = None;
        self.builds += 1;
        info!(build = self.builds, "shader program installed");
        Ok(())
    }

    pub fn gl(&self) -> &G {
        &self.gl
    }

    pub fn active_program(&self) -> Option<&Program<G>> {
        self.active.as_ref()
    }

    pub fn last_error(&self) -> Option<&Diagnostic> {
        self.last_error.as_ref()
    }

    /// Number of programs successfully installed so far.
    pub fn build_count(&self) -> u64 {
        self.builds
    }
}

impl<G: GlApi> Drop for ShaderSession<G> {
    fn drop(&mut self) {
        self.gl.use_program(None);
        if let Some(program) = self.active.take() {
            program.release(&self.gl);
        }
        if let Some(geometry) = self.geometry.take() {
            self.gl.bind_array_buffer(None);
            geometry.release(&self.gl);
        }
    }
}
