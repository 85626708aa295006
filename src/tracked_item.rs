/// Data structures for tracked pages
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{extract_host, is_trackable_url};

static TAG_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\s]+").expect("tag separator pattern is valid"));

/// Progress of a tracked page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Todo, Status::InProgress, Status::Done];

    /// Next status in the todo → in-progress → done → todo cycle
    pub fn cycle(self) -> Status {
        match self {
            Status::Todo => Status::InProgress,
            Status::InProgress => Status::Done,
            Status::Done => Status::Todo,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Todo => "Not Started",
            Status::InProgress => "In Progress",
            Status::Done => "Done",
        }
    }

    /// Wire value, also used as the CSS class of the status chip
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in-progress",
            Status::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Option<Status> {
        Status::ALL.into_iter().find(|status| status.as_str() == value)
    }

    pub fn is_pending(self) -> bool {
        !matches!(self, Status::Done)
    }
}

/// A bookmarked page with status and tag metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedItem {
    pub id: String,
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub starred: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: f64,
    pub updated_at: f64,
}

impl TrackedItem {
    /// Fresh item for a URL: status todo, unstarred
    pub fn new(url: String, name: String, tags: Vec<String>, now: f64) -> TrackedItem {
        TrackedItem {
            id: Uuid::new_v4().to_string(),
            url,
            name,
            status: Status::Todo,
            starred: false,
            tags: normalize_tags(tags),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Build an item from loosely-typed JSON (storage or import file)
    ///
    /// Returns `None` for non-objects and for entries without an http/https
    /// URL. Every other field falls back to a default:
    /// - missing id → new UUID
    /// - missing name → URL host
    /// - unknown status → todo
    /// - starred coerced to bool
    /// - non-array tags → empty
    /// - missing or zero timestamps → `now`
    pub fn from_json(value: &Value, now: f64) -> Option<TrackedItem> {
        let obj = value.as_object()?;

        let url = obj
            .get("url")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|url| is_trackable_url(url))?
            .to_string();

        let id = match obj.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| extract_host(&url));

        let status = obj
            .get("status")
            .and_then(Value::as_str)
            .and_then(Status::parse)
            .unwrap_or_default();

        let tags = match obj.get("tags") {
            Some(Value::Array(tags)) => normalize_tags(
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            ),
            _ => Vec::new(),
        };

        let timestamp = |key: &str| {
            obj.get(key)
                .and_then(Value::as_f64)
                .filter(|ts| *ts > 0.0)
                .unwrap_or(now)
        };

        Some(TrackedItem {
            id,
            url,
            name,
            status,
            starred: obj.get("starred").is_some_and(is_truthy),
            tags,
            created_at: timestamp("createdAt"),
            updated_at: timestamp("updatedAt"),
        })
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Lowercase, trim and de-duplicate tags, keeping first occurrence order
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

/// Split free-form tag input on commas and whitespace
pub fn parse_tags(input: &str) -> Vec<String> {
    normalize_tags(
        TAG_SEPARATOR
            .split(input.trim())
            .map(str::to_string)
            .collect(),
    )
}

/// Tags joined for an edit prompt
pub fn tags_to_string(tags: &[String]) -> String {
    tags.join(", ")
}

/// Union of two tag lists, existing tags first
pub fn merge_tags(existing: &[String], incoming: &[String]) -> Vec<String> {
    normalize_tags(existing.iter().chain(incoming).cloned().collect())
}

/// Counts by status, as shown on the badge and in stats requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStats {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
    pub starred: usize,
}

impl ItemStats {
    pub fn from_items(items: &[TrackedItem]) -> ItemStats {
        items.iter().fold(ItemStats::default(), |mut stats, item| {
            stats.total += 1;
            match item.status {
                Status::Todo => stats.todo += 1,
                Status::InProgress => stats.in_progress += 1,
                Status::Done => stats.done += 1,
            }
            if item.starred {
                stats.starred += 1;
            }
            stats
        })
    }

    pub fn pending(&self) -> usize {
        self.todo + self.in_progress
    }

    /// Pending count, or empty to clear the badge
    pub fn badge_text(&self) -> String {
        match self.pending() {
            0 => String::new(),
            n => n.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_item(url: &str, status: Status, starred: bool) -> TrackedItem {
        TrackedItem {
            status,
            starred,
            ..TrackedItem::new(url.to_string(), "Test".to_string(), vec![], 1000.0)
        }
    }

    #[test]
    fn test_status_cycle() {
        assert_eq!(Status::Todo.cycle(), Status::InProgress);
        assert_eq!(Status::InProgress.cycle(), Status::Done);
        assert_eq!(Status::Done.cycle(), Status::Todo);
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_string(&Status::InProgress).unwrap(), "\"in-progress\"");
        assert_eq!(Status::parse("done"), Some(Status::Done));
        assert_eq!(Status::parse("finished"), None);
    }

    #[test]
    fn test_item_creation() {
        let item = TrackedItem::new(
            "https://doc.rust-lang.org/book/".to_string(),
            "The Book".to_string(),
            vec!["Rust".to_string(), "rust".to_string(), "books".to_string()],
            1698508200000.0,
        );

        assert!(!item.id.is_empty());
        assert_eq!(item.status, Status::Todo);
        assert!(!item.starred);
        assert_eq!(item.tags, vec!["rust", "books"]);
        assert_eq!(item.created_at, item.updated_at);
    }

    #[test]
    fn test_item_serialization_keys() {
        let item = create_test_item("https://google.com", Status::InProgress, true);
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["status"], "in-progress");
        assert_eq!(json["createdAt"], 1000.0);
        assert_eq!(json["updatedAt"], 1000.0);
        assert_eq!(json["starred"], true);
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("Rust, async  web,rust"), vec!["rust", "async", "web"]);
        assert_eq!(parse_tags("   "), Vec::<String>::new());
        assert_eq!(parse_tags(",, ,"), Vec::<String>::new());
    }

    #[test]
    fn test_merge_tags() {
        let existing = vec!["rust".to_string(), "web".to_string()];
        let incoming = vec!["async".to_string(), "rust".to_string()];

        assert_eq!(merge_tags(&existing, &incoming), vec!["rust", "web", "async"]);
    }

    #[test]
    fn test_from_json_defaults() {
        let value = json!({
            "url": "https://github.com/rust-lang/rust",
            "status": "archived",
            "starred": 1,
            "tags": "not-an-array"
        });

        let item = TrackedItem::from_json(&value, 5000.0).unwrap();

        assert!(!item.id.is_empty());
        assert_eq!(item.name, "github.com");
        assert_eq!(item.status, Status::Todo);
        assert!(item.starred);
        assert!(item.tags.is_empty());
        assert_eq!(item.created_at, 5000.0);
        assert_eq!(item.updated_at, 5000.0);
    }

    #[test]
    fn test_from_json_preserves_fields() {
        let value = json!({
            "id": "item-1",
            "url": "https://google.com",
            "name": "Google",
            "status": "done",
            "starred": false,
            "tags": ["Search", 42, "search", "web"],
            "createdAt": 100.0,
            "updatedAt": 200.0,
            "extra": "ignored"
        });

        let item = TrackedItem::from_json(&value, 5000.0).unwrap();

        assert_eq!(item.id, "item-1");
        assert_eq!(item.name, "Google");
        assert_eq!(item.status, Status::Done);
        assert_eq!(item.tags, vec!["search", "web"]);
        assert_eq!(item.created_at, 100.0);
        assert_eq!(item.updated_at, 200.0);
    }

    #[test]
    fn test_from_json_rejects_unusable_entries() {
        assert!(TrackedItem::from_json(&json!("https://google.com"), 0.0).is_none());
        assert!(TrackedItem::from_json(&json!({"name": "No URL"}), 0.0).is_none());
        assert!(TrackedItem::from_json(&json!({"url": "chrome://settings"}), 0.0).is_none());
    }

    #[test]
    fn test_stats_and_badge() {
        let items = vec![
            create_test_item("https://a.com", Status::Todo, true),
            create_test_item("https://b.com", Status::InProgress, false),
            create_test_item("https://c.com", Status::Done, true),
        ];

        let stats = ItemStats::from_items(&items);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.todo, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.done, 1);
        assert_eq!(stats.starred, 2);
        assert_eq!(stats.badge_text(), "2");
        assert_eq!(ItemStats::default().badge_text(), "");
    }
}
