//! Client side of the shader generation service.
//!
//! [`HttpGenerationClient`] posts a prompt to `{base_url}/api/generate_shader`
//! and returns the fragment section of the generated code.
//! [`GenerationWorker`] runs those requests off the render thread, one at a
//! time.

mod client;
mod extract;
mod worker;

pub use client::{
    interpret_response, GenerationConfig, GenerationError, HttpGenerationClient, ShaderGenerator,
    DEFAULT_API_URL,
};
pub use extract::{extract_fragment_source, FRAGMENT_MARKER};
pub use worker::{GenerationOutcome, GenerationWorker, SubmitError};
