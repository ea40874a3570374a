use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::catalog::{CategoryChoice, Mode};

pub const DEFAULT_TOTAL_ROUNDS: u32 = 15;

/// Settings that survive between runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub mode: Mode,
    pub category: CategoryChoice,
    pub total_rounds: u32,
    pub offline: bool,
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Easy,
            category: CategoryChoice::All,
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            offline: false,
            cache_dir: None,
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
        let path = if let Some(pd) = ProjectDirs::from("", "", "lizardtype") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("lizardtype_config.json")
        };
        Self { path }
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
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        serde_json::from_slice::<Config>(&bytes).unwrap_or_else(|err| {
            warn!(path = %self.path.display(), error = %err, "ignoring unreadable config");
            Config::default()
        })
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

/// Keeps settings in memory only.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    saved: std::cell::RefCell<Option<Config>>,
}

impl MemoryConfigStore {
    pub fn saved(&self) -> Option<Config> {
        self.saved.borrow().clone()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Config {
        self.saved().unwrap_or_default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        *self.saved.borrow_mut() = Some(cfg.clone());
        Ok(())
    }
}
