use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use renderer::DEFAULT_FRAGMENT_SHADER;
use tracing::{debug, info};

use crate::paths::AppPaths;

/// Creates the application directories and seeds `edit_file` with the default
/// shader if it does not exist yet. Returns the file's current contents.
pub fn bootstrap_filesystem(paths: &AppPaths, edit_file: &Path) -> Result<String> {
    let mut directories = vec![
        paths.config_dir().to_path_buf(),
        paths.data_dir().to_path_buf(),
        paths.cache_dir().to_path_buf(),
    ];
    if let Some(parent) = edit_file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        directories.push(parent.to_path_buf());
    }
    for dir in directories {
        ensure_directory(&dir)?;
    }

    if edit_file.exists() {
        debug!(path = %edit_file.display(), "reusing shader file");
    } else {
        fs::write(edit_file, DEFAULT_FRAGMENT_SHADER)
            .with_context(|| format!("failed to seed shader file at {}", edit_file.display()))?;
        info!(path = %edit_file.display(), "created shader file");
    }

    fs::read_to_string(edit_file)
        .with_context(|| format!("failed to read shader file at {}", edit_file.display()))
}

fn ensure_directory(path: &Path) -> Result<()> {
    if path.exists() {
        if path.is_dir() {
            debug!(path = %path.display(), "reusing existing directory");
            Ok(())
        } else {
            bail!("filesystem entry at {} is not a directory", path.display());
        }
    } else {
        fs::create_dir_all(path).with_context(|| {
            format!("failed to create shaderlab directory at {}", path.display())
        })?;
        info!(path = %path.display(), "created shaderlab directory");
        Ok(())
    }
}
