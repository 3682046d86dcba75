use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "SHADERLAB_CONFIG_DIR";
pub const ENV_DATA_DIR: &str = "SHADERLAB_DATA_DIR";
pub const ENV_CACHE_DIR: &str = "SHADERLAB_CACHE_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "shaderlab";
const APPLICATION: &str = "shaderlab";

const CONFIG_FILE: &str = "shaderlab.toml";
const EDIT_FILE: &str = "current.frag";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    data_dir: PathBuf,
    cache_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION);
        let config_dir = resolve_dir(
            ENV_CONFIG_DIR,
            project_dirs.as_ref().map(|dirs| dirs.config_dir()),
        )?;
        let data_dir = resolve_dir(
            ENV_DATA_DIR,
            project_dirs.as_ref().map(|dirs| dirs.data_dir()),
        )?;
        let cache_dir = resolve_dir(
            ENV_CACHE_DIR,
            project_dirs.as_ref().map(|dirs| dirs.cache_dir()),
        )?;

        Ok(Self {
            config_dir,
            data_dir,
            cache_dir,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Shader file edited when `--shader` and the config file name none.
    pub fn default_edit_file(&self) -> PathBuf {
        self.data_dir.join(EDIT_FILE)
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf, data_dir: PathBuf, cache_dir: PathBuf) -> Self {
        Self {
            config_dir,
            data_dir,
            cache_dir,
        }
    }
}

fn resolve_dir(env_var: &str, default: Option<&Path>) -> Result<PathBuf> {
    if let Some(value) = env_override(env_var) {
        return Ok(value);
    }
    default
        .map(Path::to_path_buf)
        .ok_or_else(|| anyhow!("failed to determine user directories; set {env_var}"))
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.as_os_str().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    struct EnvGuard {
        key: &'static str,
        previous: Option<OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &Path) -> Self {
            let previous = env::var_os(key);
            env::set_var(key, value);
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = self.previous.take() {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    #[test]
    fn env_overrides_take_precedence() {
        let _guard = env_lock().lock().unwrap();
        let root = TempDir::new().unwrap();
        let config_dir = root.path().join("config");
        let data_dir = root.path().join("data");
        let cache_dir = root.path().join("cache");

        let _config_guard = EnvGuard::set(ENV_CONFIG_DIR, &config_dir);
        let _data_guard = EnvGuard::set(ENV_DATA_DIR, &data_dir);
        let _cache_guard = EnvGuard::set(ENV_CACHE_DIR, &cache_dir);

        let paths = AppPaths::discover().unwrap();

        assert_eq!(paths.config_dir(), config_dir.as_path());
        assert_eq!(paths.data_dir(), data_dir.as_path());
        assert_eq!(paths.cache_dir(), cache_dir.as_path());
        assert_eq!(paths.config_file(), config_dir.join("shaderlab.toml"));
        assert_eq!(paths.default_edit_file(), data_dir.join("current.frag"));
    }
}
