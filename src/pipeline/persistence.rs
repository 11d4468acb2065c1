// to be called on startup and quit; keeps the last selection so the stage
// comes back the way it was left
use std::path::{Path, PathBuf};

use crate::pipeline::settings::JamSettings;

const SETTINGS_FILE: &str = "settings.json";

// <data_dir>/settings.json
fn settings_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SETTINGS_FILE)
}

pub fn load_settings(data_dir: &Path) -> Option<JamSettings> {
    let path = settings_file_path(data_dir);
    let data = std::fs::read_to_string(&path).ok()?;
    serde_json::from_str::<JamSettings>(&data).ok().map(JamSettings::sanitized)
}

// Save the settings to disk, creating the data dir if it doesn't exist yet
pub fn save_settings(data_dir: &Path, settings: &JamSettings) -> anyhow::Result<()> {
    let path = settings_file_path(data_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(&path, json)?;
    Ok(())
}
