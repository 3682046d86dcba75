use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::Sender;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use renderer::{PreviewEvent, PreviewRuntime};
use shadergen::GenerationOutcome;
use tracing::{debug, info, warn};

/// Shown while a generation request is in flight.
pub const GENERATING_STATUS: &str = "Generating...";

/// Everything the main loop reacts to besides the preview window itself.
#[derive(Debug)]
pub enum AppEvent {
    FileChanged,
    Prompt(String),
    Generated(GenerationOutcome),
}

/// Where rebuilt source and status messages go.
pub trait PreviewSink {
    fn rebuild(&self, fragment_source: String) -> Result<()>;
    fn report(&self, message: String) -> Result<()>;
}

impl PreviewSink for PreviewRuntime {
    fn rebuild(&self, fragment_source: String) -> Result<()> {
        PreviewRuntime::rebuild(self, fragment_source)
    }

    fn report(&self, message: String) -> Result<()> {
        PreviewRuntime::report(self, message)
    }
}

/// Keeps the edit file and the preview in step.
///
/// The edit file always holds the text most recently sent for a rebuild.
/// Filesystem events that leave the text unchanged (including the ones caused
/// by writing generated code) do not trigger another rebuild.
pub struct Editor<P> {
    preview: P,
    edit_file: PathBuf,
    last_attempted: String,
}

impl<P: PreviewSink> Editor<P> {
    /// `initial_text` is what the preview was started with.
    pub fn new(preview: P, edit_file: PathBuf, initial_text: String) -> Self {
        Self {
            preview,
            edit_file,
            last_attempted: initial_text,
        }
    }

    pub fn preview(&self) -> &P {
        &self.preview
    }

    pub fn into_preview(self) -> P {
        self.preview
    }

    pub fn file_changed(&mut self) -> Result<()> {
        let text = match fs::read_to_string(&self.edit_file) {
            Ok(text) => text,
            Err(err) => {
                debug!(path = %self.edit_file.display(), "shader file unreadable: {err}");
                return Ok(());
            }
        };
        if text == self.last_attempted {
            return Ok(());
        }
        info!(path = %self.edit_file.display(), "shader file changed");
        self.submit(text)
    }

    pub fn generated(&mut self, outcome: GenerationOutcome) -> Result<()> {
        match outcome.result {
            Ok(fragment) => {
                fs::write(&self.edit_file, &fragment).with_context(|| {
                    format!("failed to write shader file at {}", self.edit_file.display())
                })?;
                self.submit(fragment)
            }
            Err(err) => self.status(err.to_string()),
        }
    }

    pub fn status(&self, message: impl Into<String>) -> Result<()> {
        self.preview.report(message.into())
    }

    pub fn preview_event(&self, event: &PreviewEvent) {
        match event {
            PreviewEvent::Installed { build } => info!(build, "preview updated"),
            PreviewEvent::Failed(diagnostic) => warn!("{diagnostic}"),
            PreviewEvent::Closed => debug!("preview closed"),
        }
    }

    fn submit(&mut self, text: String) -> Result<()> {
        self.last_attempted = text.clone();
        self.preview.rebuild(text)
    }
}

/// Watches the edit file and posts [`AppEvent::FileChanged`].
///
/// The parent directory is watched so editors that save by renaming a
/// temporary file are still noticed.
pub struct EditWatcher {
    _watcher: RecommendedWatcher,
}

impl EditWatcher {
    pub fn spawn(edit_file: &Path, events: Sender<AppEvent>) -> Result<Self> {
        let file_name = edit_file
            .file_name()
            .map(|name| name.to_os_string())
            .ok_or_else(|| anyhow!("shader path {} has no file name", edit_file.display()))?;
        let directory = match edit_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if touches_file(&event, &file_name) {
                    let _ = events.send(AppEvent::FileChanged);
                }
            }
            Err(err) => warn!("file watch error: {err}"),
        })
        .context("failed to create file watcher")?;
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", directory.display()))?;
        info!(path = %edit_file.display(), "watching shader file");

        Ok(Self { _watcher: watcher })
    }
}

fn touches_file(event: &Event, file_name: &OsString) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(file_name.as_os_str()))
}
