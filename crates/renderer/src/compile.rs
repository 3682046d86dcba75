use tracing::debug;

use crate::gl::GlApi;
use crate::types::{Diagnostic, StageKind};

/// Name of the vertex input fed from the quad buffer.
pub const POSITION_ATTRIBUTE: &str = "position";

/// Pass-through vertex shader paired with every user fragment shader.
pub const VERTEX_SHADER_SOURCE: &str = r"
attribute vec2 position;
void main() {
    gl_Position = vec4(position, 0.0, 1.0);
}
";

/// Solid red fragment shader shown until the user supplies something else.
pub const DEFAULT_FRAGMENT_SHADER: &str = r"precision mediump float;
void main() {
    gl_FragColor = vec4(1.0, 0.0, 0.0, 1.0);
}
";

/// A successfully compiled stage. The underlying shader object is deleted when
/// the value is dropped, so every exit path of the linker releases it exactly
/// once.
pub(crate) struct CompiledStage<'gl, G: GlApi> {
    gl: &'gl G,
    kind: StageKind,
    shader: G::Shader,
}

impl<'gl, G: GlApi> CompiledStage<'gl, G> {
    pub(crate) fn kind(&self) -> StageKind {
        self.kind
    }

    pub(crate) fn raw(&self) -> G::Shader {
        self.shader
    }
}

impl<G: GlApi> Drop for CompiledStage<'_, G> {
    fn drop(&mut self) {
        self.gl.delete_shader(self.shader);
    }
}

/// Compiles `source` as a `kind` stage.
///
/// On failure the driver's info log becomes the diagnostic message and the
/// shader object is released before returning.
pub(crate) fn compile_stage<'gl, G: GlApi>(
    gl: &'gl G,
    kind: StageKind,
    source: &str,
) -> Result<CompiledStage<'gl, G>, Diagnostic> {
    let shader = gl
        .create_shader(kind)
        .map_err(|err| Diagnostic::compile(kind, format!("failed to create {kind} shader: {err}")))?;
    let stage = CompiledStage { gl, kind, shader };

    gl.shader_source(stage.shader, source);
    gl.compile_shader(stage.shader);
    if !gl.shader_compile_status(stage.shader) {
        let log = gl.shader_info_log(stage.shader);
        debug!(stage = %kind, %log, "shader compilation failed");
        return Err(Diagnostic::compile(kind, log));
    }

    Ok(stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGl;
    use crate::types::DiagnosticStage;

    #[test]
    fn successful_compile_hands_over_the_stage() {
        let gl = FakeGl::new();
        let stage = compile_stage(&gl, StageKind::Fragment, DEFAULT_FRAGMENT_SHADER)
            .expect("default shader compiles");
        assert_eq!(stage.kind(), StageKind::Fragment);
        assert_eq!(gl.live_shaders(), 1);
        drop(stage);
        assert_eq!(gl.live_shaders(), 0);
    }

    #[test]
    fn failed_compile_releases_the_shader() {
        let gl = FakeGl::new();
        let result = compile_stage(&gl, StageKind::Fragment, "void main() { vec4(1.0, 0.0; }");
        let diagnostic = result.err().expect("unbalanced source fails");
        assert_eq!(diagnostic.stage, DiagnosticStage::Fragment);
        assert!(!diagnostic.message.is_empty());
        assert_eq!(gl.shaders_created(), 1);
        assert_eq!(gl.live_shaders(), 0);
    }

    #[test]
    fn vertex_failures_are_tagged_vertex() {
        let gl = FakeGl::new();
        let diagnostic = compile_stage(&gl, StageKind::Vertex, "")
            .err()
            .expect("empty source fails");
        assert_eq!(diagnostic.stage, DiagnosticStage::Vertex);
    }
}
