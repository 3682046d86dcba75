use crate::gl::GlApi;
use crate::program::Program;
use crate::types::{Diagnostic, DiagnosticStage};

/// Two triangles covering clip space, laid out for a 4-vertex triangle strip.
pub const QUAD_VERTICES: [f32; 8] = [
    -1.0, -1.0, //
    1.0, -1.0, //
    -1.0, 1.0, //
    1.0, 1.0,
];

/// Number of vertices issued per draw.
pub const QUAD_VERTEX_COUNT: i32 = 4;

/// The session-wide full-screen quad buffer.
///
/// Uploaded once and never written again, so any number of programs can bind
/// it. Attribute locations differ between programs, hence [`bind_to`].
///
/// [`bind_to`]: QuadGeometry::bind_to
#[derive(Debug)]
pub struct QuadGeometry<G: GlApi> {
    buffer: G::Buffer,
}

impl<G: GlApi> QuadGeometry<G> {
    pub fn new(gl: &G) -> Result<Self, Diagnostic> {
        let buffer = gl.create_buffer().map_err(|err| {
            Diagnostic::new(
                DiagnosticStage::Context,
                format!("failed to create quad buffer: {err}"),
            )
        })?;
        gl.upload_static_vertices(buffer, &QUAD_VERTICES);
        Ok(Self { buffer })
    }

    /// Points `program`'s position attribute at the quad: 2 floats per
    /// vertex, tightly packed.
    pub fn bind_to(&self, gl: &G, program: &Program<G>) {
        let location = program.position_location();
        gl.bind_array_buffer(Some(self.buffer));
        gl.enable_vertex_attrib_array(location);
        gl.vertex_attrib_pointer_f32(location, 2, 0, 0);
    }

    pub fn release(self, gl: &G) {
        gl.delete_buffer(self.buffer);
    }
}
