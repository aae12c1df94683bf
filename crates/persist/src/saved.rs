//! Saved filter presets, one JSON array per view route.
//!
//! Every operation re-reads the stored array, changes it and writes it back
//! whole; the in-memory list mirrors the last write. Concurrent writers to the
//! same key are not coordinated: the last write wins.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use sift_core::{now_millis, AppliedFilter, SavedFilter};
use tracing::{debug, info, warn};

use crate::{KvStorage, StorageError};

pub const SAVED_FILTERS_PREFIX: &str = "saved_filters";

/// Identity of the route presets are scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteId {
    pub name: Option<String>,
    pub path: String,
}

impl RouteId {
    pub fn named(name: &str) -> Self { Self { name: Some(name.to_string()), path: String::new() } }

    pub fn path(path: &str) -> Self { Self { name: None, path: path.to_string() } }

    /// Route name, or the path with `/` turned into `_` and one leading `_` dropped.
    pub fn key(&self) -> String {
        match self.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => {
                let sanitized = self.path.replace('/', "_");
                sanitized.strip_prefix('_').unwrap_or(&sanitized).to_string()
            }
        }
    }
}

pub struct SavedFilterStore {
    storage: Arc<dyn KvStorage>,
    key: String,
    saved: Vec<SavedFilter>,
}

impl SavedFilterStore {
    /// Open the presets of `route` under `prefix` and load them.
    pub fn new(storage: Arc<dyn KvStorage>, prefix: &str, route: &RouteId) -> Self {
        let key = storage_key(prefix, route);
        let mut store = Self { storage, key, saved: Vec::new() };
        store.load_saved_filters();
        store
    }

    pub fn storage_key(&self) -> &str { &self.key }

    pub fn saved_filters(&self) -> &[SavedFilter] { &self.saved }

    /// Refresh the in-memory list from storage. Read failures leave it empty.
    pub fn load_saved_filters(&mut self) {
        self.saved = match self.read() {
            Ok(list) => list,
            Err(e) => {
                warn!(key = %self.key, error = %e, "reading saved filters failed");
                Vec::new()
            }
        };
    }

    /// Append a preset. Names are not de-duplicated.
    pub fn save_filter(
        &mut self,
        name: &str,
        description: &str,
        filters: &[AppliedFilter],
        search_query: Option<&str>,
    ) -> Result<SavedFilter, StorageError> {
        let mut list = self.read()?;
        let preset = SavedFilter {
            id: next_id(&list),
            name: name.to_string(),
            description: description.to_string(),
            filters: filters.to_vec(),
            search_query: search_query.map(|s| s.to_string()),
            created_at: Utc::now(),
        };
        list.push(preset.clone());
        self.write(list)?;
        counter!("filters_saved_total", 1u64);
        info!(key = %self.key, id = %preset.id, name = %preset.name, "saved filter");
        Ok(preset)
    }

    /// Rename or re-describe a preset. Unknown ids change nothing.
    pub fn update_saved_filter(&mut self, id: &str, name: &str, description: &str) -> Result<(), StorageError> {
        let mut list = self.read()?;
        let Some(preset) = list.iter_mut().find(|f| f.id == id) else {
            debug!(key = %self.key, id, "no saved filter to update");
            return Ok(());
        };
        preset.name = name.to_string();
        preset.description = description.to_string();
        self.write(list)
    }

    pub fn delete_saved_filter(&mut self, preset: &SavedFilter) -> Result<(), StorageError> {
        let mut list = self.read()?;
        list.retain(|f| f.id != preset.id);
        self.write(list)?;
        debug!(key = %self.key, id = %preset.id, "deleted saved filter");
        Ok(())
    }

    /// Stored presets. Corrupt JSON counts as no presets.
    fn read(&self) -> Result<Vec<SavedFilter>, StorageError> {
        let Some(raw) = self.storage.get(&self.key)? else { return Ok(Vec::new()) };
        match serde_json::from_str::<Vec<SavedFilter>>(&raw) {
            Ok(list) => Ok(list),
            Err(e) => {
                counter!("saved_filters_corrupt_total", 1u64);
                warn!(key = %self.key, error = %e, "saved filters are not valid JSON; starting from an empty list");
                Ok(Vec::new())
            }
        }
    }

    fn write(&mut self, list: Vec<SavedFilter>) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&list)?;
        self.storage.set(&self.key, &raw)?;
        self.saved = list;
        Ok(())
    }
}

/// `<SAVED_FILTERS_PREFIX>_<prefix>_<route key>`.
pub fn storage_key(prefix: &str, route: &RouteId) -> String {
    format!("{}_{}_{}", SAVED_FILTERS_PREFIX, prefix, route.key())
}

/// `saved_<epoch-ms>`, bumped past ids already in `list`.
fn next_id(list: &[SavedFilter]) -> String {
    let mut ms = now_millis();
    loop {
        let id = format!("saved_{}", ms);
        if list.iter().all(|f| f.id != id) {
            return id;
        }
        ms += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;

    #[test]
    fn route_keys() {
        assert_eq!(RouteId::named("executions/list").key(), "executions/list");
        assert_eq!(RouteId::path("/ui/main/logs").key(), "ui_main_logs");
        let unnamed = RouteId { name: Some(String::new()), path: "/flows".into() };
        assert_eq!(unnamed.key(), "flows");
    }

    #[test]
    fn storage_key_scheme() {
        assert_eq!(storage_key("executions", &RouteId::named("home")), "saved_filters_executions_home");
    }

    #[test]
    fn ids_do_not_collide() {
        let storage: Arc<dyn KvStorage> = Arc::new(MemoryStorage::new());
        let mut store = SavedFilterStore::new(storage, "p", &RouteId::named("r"));
        let a = store.save_filter("a", "", &[], None).unwrap();
        let b = store.save_filter("a", "", &[], None).unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("saved_"));
        assert_eq!(store.saved_filters().len(), 2);
    }

    #[test]
    fn corrupt_json_reads_as_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("saved_filters_p_r", "{not json").unwrap();
        let mut store = SavedFilterStore::new(storage.clone(), "p", &RouteId::named("r"));
        assert!(store.saved_filters().is_empty());
        store.save_filter("fresh", "", &[], Some("q")).unwrap();
        assert_eq!(store.saved_filters().len(), 1);
        assert!(storage.get("saved_filters_p_r").unwrap().unwrap().starts_with('['));
    }
}
