/// Storage facade over an extension storage area (chrome.storage.sync/local)
use std::cell::RefCell;
use std::collections::HashMap;

use log::{error, warn};
use serde_json::Value;

use crate::error::Result;
use crate::operations::{ViewFilter, dedupe_by_url};
use crate::tracked_item::TrackedItem;

/// One key-value storage bucket provided by the host
#[allow(async_fn_in_trait)]
pub trait StorageArea {
    async fn load(&self, key: &str) -> Result<Option<Value>>;
    async fn save(&self, key: &str, value: Value) -> Result<()>;
}

/// In-process storage area
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value under a key, bypassing item normalization
    pub fn raw(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn insert_raw(&self, key: &str, value: Value) {
        self.entries.borrow_mut().insert(key.to_string(), value);
    }
}

impl StorageArea for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.raw(key))
    }

    async fn save(&self, key: &str, value: Value) -> Result<()> {
        self.insert_raw(key, value);
        Ok(())
    }
}

/// The tracked item array stored under a single key
pub struct ItemStore<S: StorageArea> {
    area: S,
    key: String,
}

impl<S: StorageArea> ItemStore<S> {
    pub fn new(area: S, key: impl Into<String>) -> Self {
        ItemStore {
            area,
            key: key.into(),
        }
    }

    pub fn area(&self) -> &S {
        &self.area
    }

    /// Stored items, or an empty list when the key is absent or malformed
    pub async fn get(&self, now: f64) -> Vec<TrackedItem> {
        match self.area.load(&self.key).await {
            Ok(Some(Value::Array(entries))) => {
                let items: Vec<TrackedItem> = entries
                    .iter()
                    .filter_map(|entry| TrackedItem::from_json(entry, now))
                    .collect();
                if items.len() < entries.len() {
                    warn!("Dropped {} malformed stored items", entries.len() - items.len());
                }
                dedupe_by_url(&items)
            }
            Ok(Some(_)) => {
                warn!("Stored value under '{}' is not an array, treating as empty", self.key);
                Vec::new()
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                error!("Failed to get items from storage: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn set(&self, items: &[TrackedItem]) -> Result<()> {
        let value = serde_json::to_value(items)?;
        self.area.save(&self.key, value).await.inspect_err(|e| {
            error!("Failed to save items to storage: {}", e);
        })
    }
}

/// Restore the popup's filter controls; anything unreadable gives the defaults
pub async fn load_view_filter<S: StorageArea>(area: &S, key: &str) -> ViewFilter {
    match area.load(key).await {
        Ok(Some(value)) => ViewFilter::from_json(&value),
        Ok(None) => ViewFilter::default(),
        Err(e) => {
            warn!("Failed to restore UI state: {}", e);
            ViewFilter::default()
        }
    }
}

pub async fn save_view_filter<S: StorageArea>(area: &S, key: &str, filter: &ViewFilter) -> Result<()> {
    area.save(key, serde_json::to_value(filter)?).await
}
