//! Shader program lifecycle for the shaderlab preview window.
//!
//! A fragment shader travels from text to pixels like this:
//!
//! ```text
//!   fragment text
//!        │ ShaderSession::rebuild
//!        ▼
//!   compile_stage(Vertex) + compile_stage(Fragment) ──▶ link_program
//!        │                                                 │
//!        │ Diagnostic (previous program kept)              ▼
//!        ◀─────────────────────────────────────────  Program installed,
//!                                                    QuadGeometry rebound
//!
//!   RenderLoop::tick ──▶ session.active_program() ──▶ update_uniforms ──▶ draw
//! ```
//!
//! All GL calls go through the [`GlApi`] trait. [`PreviewRuntime`] owns a real
//! `glow` context inside a `winit` window on its own thread.

mod compile;
mod geometry;
mod gl;
mod program;
mod runtime;
mod session;
mod types;
mod uniforms;
mod window;

#[cfg(test)]
mod testing;

pub use compile::{DEFAULT_FRAGMENT_SHADER, POSITION_ATTRIBUTE, VERTEX_SHADER_SOURCE};
pub use geometry::{QuadGeometry, QUAD_VERTEX_COUNT, QUAD_VERTICES};
pub use gl::GlApi;
pub use program::{link_program, Program, RESOLUTION_UNIFORM, TIME_UNIFORM};
pub use runtime::{FrameHandle, FrameScheduler, RenderLoop, TickOutcome};
pub use session::ShaderSession;
pub use types::{Diagnostic, DiagnosticStage, RendererConfig, StageKind, Viewport};
pub use uniforms::update_uniforms;
pub use window::{PreviewEvent, PreviewRuntime};
