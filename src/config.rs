use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::context::{AppContext, Identity};
use crate::difficulty::Difficulty;
use crate::error::ConfigError;
use crate::session::{SessionConfig, DEFAULT_DURATION_SECS};
use crate::typing_policy::MismatchPolicy;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub duration: u32,
    pub difficulty: Difficulty,
    pub music_enabled: bool,
    pub dark_mode: bool,
    pub policy: MismatchPolicy,
    pub user: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION_SECS,
            difficulty: Difficulty::default(),
            music_enabled: false,
            dark_mode: false,
            policy: MismatchPolicy::default(),
            user: None,
        }
    }
}

impl Config {
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        Ok(SessionConfig::new(self.duration, self.difficulty)?.with_policy(self.policy))
    }

    pub fn app_context(&self) -> AppContext {
        AppContext {
            identity: self.user.as_deref().and_then(Identity::from_name),
            dark_mode: self.dark_mode,
            music_enabled: self.music_enabled,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return Config::default(),
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("ignoring unreadable config {}: {e}", self.path.display());
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
