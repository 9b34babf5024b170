pub mod config;
pub mod optimize;
pub mod settings;

use std::path::Path;

use hgw_state::SettingsStore;

/// Open the settings database under `data_dir`, creating the directory.
pub fn open_store(data_dir: &Path) -> anyhow::Result<SettingsStore> {
    std::fs::create_dir_all(data_dir)?;
    let store = SettingsStore::open(&data_dir.join("settings.redb"))?;
    Ok(store)
}
