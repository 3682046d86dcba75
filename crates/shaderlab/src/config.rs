use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use renderer::RendererConfig;
use serde::{Deserialize, Serialize};
use shadergen::DEFAULT_API_URL;
use tracing::debug;

use crate::cli::RunArgs;
use crate::paths::AppPaths;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Contents of `shaderlab.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub size: Option<String>,
    pub shader: Option<PathBuf>,
    pub watch: Option<bool>,
}

impl FileConfig {
    /// Reads `path`, treating a missing file as an empty configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no configuration file");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(toml::from_str(&contents)?)
    }
}

/// Effective settings for an interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub surface_size: (u32, u32),
    pub shader_path: PathBuf,
    pub watch: bool,
}

impl Settings {
    /// Merges command-line flags (which already include environment
    /// fallbacks) over the config file and built-in defaults.
    pub fn resolve(args: &RunArgs, file: FileConfig, paths: &AppPaths) -> Result<Self, ConfigError> {
        let api_url = args
            .api_url
            .clone()
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let surface_size = match args.size.as_deref().or(file.size.as_deref()) {
            Some(spec) => parse_surface_size(spec)?,
            None => RendererConfig::default().surface_size,
        };

        let shader_path = args
            .shader
            .clone()
            .or(file.shader)
            .unwrap_or_else(|| paths.default_edit_file());

        let watch = !args.no_watch && file.watch.unwrap_or(true);

        Ok(Self {
            api_url,
            surface_size,
            shader_path,
            watch,
        })
    }

    pub fn renderer_config(&self) -> RendererConfig {
        RendererConfig {
            surface_size: self.surface_size,
            ..RendererConfig::default()
        }
    }
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32), ConfigError> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| ConfigError::Invalid("expected WxH format, e.g. 500x500".to_string()))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("invalid width in size '{trimmed}'")))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("invalid height in size '{trimmed}'")))?;

    if width == 0 || height == 0 {
        return Err(ConfigError::Invalid(
            "surface dimensions must be greater than zero".to_string(),
        ));
    }

    Ok((width, height))
}
