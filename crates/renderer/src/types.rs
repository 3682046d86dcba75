use std::fmt;

/// Shader stage a piece of source text is compiled as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Where in the build pipeline a [`Diagnostic`] originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticStage {
    Vertex,
    Fragment,
    Link,
    /// The graphics context or a session-wide resource could not be created.
    Context,
}

impl From<StageKind> for DiagnosticStage {
    fn from(kind: StageKind) -> Self {
        match kind {
            StageKind::Vertex => DiagnosticStage::Vertex,
            StageKind::Fragment => DiagnosticStage::Fragment,
        }
    }
}

impl fmt::Display for DiagnosticStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticStage::Vertex => f.write_str("vertex"),
            DiagnosticStage::Fragment => f.write_str("fragment"),
            DiagnosticStage::Link => f.write_str("link"),
            DiagnosticStage::Context => f.write_str("context"),
        }
    }
}

/// Failure report produced while building a program.
///
/// `message` is the driver-provided info log (or a short description when the
/// driver has nothing to say) and is meant to be shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{stage} error: {message}")]
pub struct Diagnostic {
    pub stage: DiagnosticStage,
    pub message: String,
}

impl Diagnostic {
    pub fn new(stage: DiagnosticStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    /// Compile failure for one stage. Empty driver logs are replaced so the
    /// message is never blank.
    pub fn compile(kind: StageKind, log: impl Into<String>) -> Self {
        let log = log.into();
        let message = if log.trim().is_empty() {
            format!("{kind} shader failed to compile")
        } else {
            log.trim_end().to_string()
        };
        Self::new(kind.into(), message)
    }

    pub fn link(log: impl Into<String>) -> Self {
        let log = log.into();
        let message = if log.trim().is_empty() {
            "program failed to link".to_string()
        } else {
            log.trim_end().to_string()
        };
        Self::new(DiagnosticStage::Link, message)
    }

    pub fn context_unsupported() -> Self {
        Self::new(DiagnosticStage::Context, "context unsupported")
    }
}

/// Drawable area in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Immutable configuration for the preview window.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Canvas size in physical pixels.
    pub surface_size: (u32, u32),
    /// Base window title; the latest diagnostic is appended to it.
    pub title: String,
}

impl Default for RendererConfig {
    /// Provides the 500x500 canvas the editor has always used.
    fn default() -> Self {
        Self {
            surface_size: (500, 500),
            title: "shaderlab".to_string(),
        }
    }
}
