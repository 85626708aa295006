/// Export and import of the tracked item list as JSON files
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clock::{iso_date, iso_timestamp};
use crate::error::{Result, TrackerError};
use crate::operations::dedupe_by_url;
use crate::tracked_item::TrackedItem;

pub const EXPORT_VERSION: &str = "2.0";

/// `{ version, timestamp, items }` file layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportEnvelope {
    pub version: String,
    pub timestamp: String,
    pub items: Vec<TrackedItem>,
}

impl ExportEnvelope {
    pub fn new(items: Vec<TrackedItem>, now: f64) -> Self {
        ExportEnvelope {
            version: EXPORT_VERSION.to_string(),
            timestamp: iso_timestamp(now),
            items,
        }
    }
}

/// Pretty-printed export file contents
pub fn export_json(items: &[TrackedItem], now: f64) -> Result<String> {
    Ok(serde_json::to_string_pretty(&ExportEnvelope::new(items.to_vec(), now))?)
}

pub fn export_filename(now: f64) -> String {
    format!("prep-tracker-{}.json", iso_date(now))
}

/// JavaScript truthiness, which decides whether a `version` field marks an export file
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Parse an import file: an export envelope or a bare item array
///
/// Entries are normalized with [`TrackedItem::from_json`]; unusable entries
/// are skipped and duplicate URLs keep their first occurrence.
pub fn parse_import(text: &str, now: f64) -> Result<Vec<TrackedItem>> {
    let data: Value = serde_json::from_str(text)
        .map_err(|e| TrackerError::InvalidImport(format!("not valid JSON: {}", e)))?;

    let entries = match &data {
        Value::Array(entries) => entries,
        Value::Object(obj) if obj.get("version").is_some_and(is_truthy) => match obj.get("items") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(TrackerError::InvalidImport(
                    "export file has no items array".to_string(),
                ));
            }
        },
        _ => {
            return Err(TrackerError::InvalidImport(
                "expected an array of items or an export file".to_string(),
            ));
        }
    };

    let items: Vec<TrackedItem> = entries
        .iter()
        .filter_map(|entry| TrackedItem::from_json(entry, now))
        .collect();

    if items.len() < entries.len() {
        warn!("Skipped {} unusable import entries", entries.len() - items.len());
    }

    Ok(dedupe_by_url(&items))
}
