//! Per-table column visibility and widths, persisted as JSON under two keys.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

pub const COLUMNS_KEY: &str = "vms_table_preferences";
pub const WIDTHS_KEY: &str = "vms_table_column_widths";

/// String key/value persistence.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key under `dir`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), value)
    }
}

type ColumnWidths = HashMap<String, f64>;

pub struct PreferenceStore {
    storage: Box<dyn KeyValueStorage>,
    columns: RwLock<HashMap<String, Vec<String>>>,
    widths: RwLock<HashMap<String, ColumnWidths>>,
}

impl PreferenceStore {
    /// Loads both maps; a missing or unreadable entry starts empty.
    pub fn new(storage: Box<dyn KeyValueStorage>) -> Self {
        let columns = load(storage.as_ref(), COLUMNS_KEY);
        let widths = load(storage.as_ref(), WIDTHS_KEY);
        Self {
            storage,
            columns: RwLock::new(columns),
            widths: RwLock::new(widths),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    pub fn table_columns(&self, table_id: &str) -> Option<Vec<String>> {
        self.columns.read().get(table_id).cloned()
    }

    pub fn set_table_columns(&self, table_id: &str, columns: Vec<String>) {
        let mut all = self.columns.write();
        all.insert(table_id.to_string(), columns);
        save(self.storage.as_ref(), COLUMNS_KEY, &*all);
    }

    pub fn table_column_widths(&self, table_id: &str) -> Option<ColumnWidths> {
        self.widths.read().get(table_id).cloned()
    }

    pub fn set_table_column_widths(&self, table_id: &str, widths: ColumnWidths) {
        let mut all = self.widths.write();
        all.insert(table_id.to_string(), widths);
        save(self.storage.as_ref(), WIDTHS_KEY, &*all);
    }
}

fn load<T: DeserializeOwned + Default>(storage: &dyn KeyValueStorage, key: &str) -> T {
    let Some(raw) = storage.get(key) else {
        return T::default();
    };
    serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!(key, error = %err, "discarding unreadable preferences");
        T::default()
    })
}

fn save<T: Serialize>(storage: &dyn KeyValueStorage, key: &str, value: &T) {
    let result = serde_json::to_string(value)
        .map_err(io::Error::other)
        .and_then(|raw| storage.set(key, &raw));
    if let Err(err) = result {
        warn!(key, error = %err, "failed to persist preferences");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_table_is_none() {
        let prefs = PreferenceStore::in_memory();
        assert!(prefs.table_columns("camera").is_none());
        assert!(prefs.table_column_widths("camera").is_none());
    }

    #[test]
    fn unreadable_entry_loads_empty() {
        let storage = MemoryStorage::new();
        storage.set(COLUMNS_KEY, "not json").unwrap();
        let prefs = PreferenceStore::new(Box::new(storage));
        assert!(prefs.table_columns("camera").is_none());
    }

    #[test]
    fn persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let prefs = PreferenceStore::new(Box::new(FileStorage::new(dir.path())));
        prefs.set_table_columns("camera", vec!["cctv_id".into(), "cctv_nm".into()]);
        prefs.set_table_column_widths("camera", HashMap::from([("cctv_id".to_string(), 120.0)]));

        let reloaded = PreferenceStore::new(Box::new(FileStorage::new(dir.path())));
        assert_eq!(
            reloaded.table_columns("camera").unwrap(),
            vec!["cctv_id".to_string(), "cctv_nm".to_string()]
        );
        assert_eq!(reloaded.table_column_widths("camera").unwrap()["cctv_id"], 120.0);
        assert!(dir.path().join("vms_table_preferences.json").exists());
    }
}
