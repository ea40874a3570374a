use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "lizardtype";

/// Where the game keeps its files outside the config.
pub struct AppDirs;

impl AppDirs {
    /// Downloaded photos.
    pub fn image_cache_dir() -> PathBuf {
        ProjectDirs::from("", "", APP_NAME)
            .map(|proj_dirs| proj_dirs.data_dir().join("image_cache"))
            .unwrap_or_else(|| PathBuf::from("image_cache"))
    }

    /// The log file; stdout belongs to the terminal UI.
    pub fn log_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME);
            Some(state_dir.join("lizardtype.log"))
        } else {
            ProjectDirs::from("", "", APP_NAME)
                .map(|proj_dirs| proj_dirs.data_local_dir().join("lizardtype.log"))
        }
    }
}
