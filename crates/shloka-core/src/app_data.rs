//! Where Shloka stores its own data (config, persisted index).
//!
//! The corpus stays wherever the user keeps it. We only store app state here.

use std::path::PathBuf;

/// File name stem of the default index artifact pair.
pub const DEFAULT_INDEX_NAME: &str = "bhagavatam";

/// Returns the directory where Shloka stores config, index, and other app data.
/// On macOS: `~/Library/Application Support/Shloka/`.
/// Creates the directory if it doesn't exist; returns `None` if we can't determine the path.
pub fn app_data_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("app", "Shloka", "Shloka")?.data_local_dir().to_path_buf();
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}

/// Default shared prefix for the index artifacts: `<app data>/index/bhagavatam`.
pub fn default_index_prefix() -> Option<PathBuf> {
    Some(app_data_dir()?.join("index").join(DEFAULT_INDEX_NAME))
}
