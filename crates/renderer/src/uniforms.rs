use crate::gl::GlApi;
use crate::program::Program;
use crate::types::Viewport;

/// Writes the per-frame inputs a fragment shader may declare.
///
/// `program` must be the program in use. Uniforms the shader does not declare
/// resolve to no location at link time and are skipped here.
pub fn update_uniforms<G: GlApi>(
    gl: &G,
    program: &Program<G>,
    elapsed_seconds: f32,
    viewport: Viewport,
) {
    if let Some(location) = program.time_location() {
        gl.uniform_1f(location, elapsed_seconds);
    }
    if let Some(location) = program.resolution_location() {
        gl.uniform_2f(location, viewport.width as f32, viewport.height as f32);
    }
}
