use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};

use crate::utils;

pub const DEFAULT_NAMESPACE: &str = "sierraHub";
pub const DEFAULT_USD_TO_SLL: f64 = 22_000.0;
pub const DEFAULT_DATABASE_FILE: &str = "sierra-hub.sqlite";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Prefix for every persisted key, e.g. `sierraHub_events`.
    pub storage_namespace: String,
    pub usd_to_sll_rate: f64,
    pub mock_event_count: usize,
    pub mock_seed: u64,
    pub database_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_namespace: DEFAULT_NAMESPACE.to_string(),
            usd_to_sll_rate: DEFAULT_USD_TO_SLL,
            mock_event_count: 20,
            mock_seed: 2024,
            database_file: DEFAULT_DATABASE_FILE.to_string(),
        }
    }
}

pub struct ConfigStore {
    path: PathBuf,
    data: Mutex<AppConfig>,
}

impl ConfigStore {
    pub fn load() -> Self {
        Self::load_from(utils::config_path())
    }

    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = read_config(&path).unwrap_or_else(|err| {
            log::warn!("ignoring unreadable config {:?}: {err}", path);
            AppConfig::default()
        });
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    pub fn read(&self) -> AppConfig {
        match self.data.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update<F>(&self, transform: F) -> Result<AppConfig, String>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut guard = self
            .data
            .lock()
            .map_err(|_| "config mutex poisoned".to_string())?;
        transform(&mut guard);
        write_config(&self.path, &guard)?;
        Ok(guard.clone())
    }
}

fn read_config(path: &Path) -> Result<AppConfig, String> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|err| err.to_string())?;
    serde_json::from_str(&contents).map_err(|err| err.to_string())
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            return Err(err.to_string());
        }
    }
    let contents = serde_json::to_string_pretty(config).map_err(|err| err.to_string())?;
    fs::write(path, contents).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load_from(dir.path().join("config.json"));
        assert_eq!(store.read(), AppConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"storage_namespace":"eventHub"}"#).unwrap();
        let config = ConfigStore::load_from(&path).read();
        assert_eq!(config.storage_namespace, "eventHub");
        assert_eq!(config.usd_to_sll_rate, DEFAULT_USD_TO_SLL);
    }

    #[test]
    fn update_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = ConfigStore::load_from(&path);
        store.update(|c| c.mock_event_count = 5).unwrap();

        let reloaded = ConfigStore::load_from(&path).read();
        assert_eq!(reloaded.mock_event_count, 5);
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(ConfigStore::load_from(&path).read(), AppConfig::default());
    }
}
