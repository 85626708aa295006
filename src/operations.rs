/// Item list operations: filtering, sorting, tag suggestions, uniqueness
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tracked_item::{Status, TrackedItem, parse_tags};

/// Status dropdown value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusFilter {
    #[default]
    All,
    Todo,
    InProgress,
    Done,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::Todo,
        StatusFilter::InProgress,
        StatusFilter::Done,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Todo => Status::Todo.as_str(),
            StatusFilter::InProgress => Status::InProgress.as_str(),
            StatusFilter::Done => Status::Done.as_str(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Todo => Status::Todo.label(),
            StatusFilter::InProgress => Status::InProgress.label(),
            StatusFilter::Done => Status::Done.label(),
        }
    }

    pub fn parse(value: &str) -> Option<StatusFilter> {
        StatusFilter::ALL.into_iter().find(|f| f.as_str() == value)
    }

    pub fn matches(self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Todo => status == Status::Todo,
            StatusFilter::InProgress => status == Status::InProgress,
            StatusFilter::Done => status == Status::Done,
        }
    }
}

/// Sort dropdown value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    UpdatedDesc,
    CreatedDesc,
    StarredFirst,
    NameAsc,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::UpdatedDesc,
        SortKey::CreatedDesc,
        SortKey::StarredFirst,
        SortKey::NameAsc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::UpdatedDesc => "updatedDesc",
            SortKey::CreatedDesc => "createdDesc",
            SortKey::StarredFirst => "starredFirst",
            SortKey::NameAsc => "nameAsc",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::UpdatedDesc => "Recently updated",
            SortKey::CreatedDesc => "Recently added",
            SortKey::StarredFirst => "Starred first",
            SortKey::NameAsc => "Name (A-Z)",
        }
    }

    pub fn parse(value: &str) -> Option<SortKey> {
        SortKey::ALL.into_iter().find(|key| key.as_str() == value)
    }

    fn compare(self, a: &TrackedItem, b: &TrackedItem) -> Ordering {
        match self {
            SortKey::UpdatedDesc => b.updated_at.total_cmp(&a.updated_at),
            SortKey::CreatedDesc => b.created_at.total_cmp(&a.created_at),
            SortKey::StarredFirst => b
                .starred
                .cmp(&a.starred)
                .then_with(|| b.updated_at.total_cmp(&a.updated_at)),
            SortKey::NameAsc => a
                .name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name)),
        }
    }
}

/// Filter controls of the popup; persisted as the UI state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewFilter {
    #[serde(rename = "statusFilter", default)]
    pub status: StatusFilter,
    #[serde(rename = "searchQuery", default)]
    pub search: String,
    /// Raw tag filter input, parsed with [`parse_tags`]
    #[serde(rename = "tagFilter", default)]
    pub tags: String,
    #[serde(rename = "sortBy", default)]
    pub sort: SortKey,
}

impl ViewFilter {
    /// Read persisted UI state field by field; bad fields fall back to defaults
    pub fn from_json(value: &Value) -> ViewFilter {
        let field = |key: &str| value.get(key).and_then(Value::as_str);

        ViewFilter {
            status: field("statusFilter")
                .and_then(StatusFilter::parse)
                .unwrap_or_default(),
            search: field("searchQuery").unwrap_or_default().to_string(),
            tags: field("tagFilter").unwrap_or_default().to_string(),
            sort: field("sortBy").and_then(SortKey::parse).unwrap_or_default(),
        }
    }
}

fn matches_search(item: &TrackedItem, query: &str) -> bool {
    item.name.to_lowercase().contains(query)
        || item.url.to_lowercase().contains(query)
        || item.tags.iter().any(|tag| tag.contains(query))
}

/// Filter and sort items for display
pub fn apply(items: &[TrackedItem], filter: &ViewFilter) -> Vec<TrackedItem> {
    let query = filter.search.trim().to_lowercase();
    let required_tags = parse_tags(&filter.tags);

    let mut filtered: Vec<TrackedItem> = items
        .iter()
        .filter(|item| filter.status.matches(item.status))
        .filter(|item| query.is_empty() || matches_search(item, &query))
        .filter(|item| required_tags.iter().all(|tag| item.has_tag(tag)))
        .cloned()
        .collect();

    filtered.sort_by(|a, b| filter.sort.compare(a, b));
    filtered
}

/// Pending items from the current view, capped for "open all"
pub fn open_queue(items: &[TrackedItem], filter: &ViewFilter, limit: usize) -> Vec<TrackedItem> {
    apply(items, filter)
        .into_iter()
        .filter(|item| item.status.is_pending())
        .take(limit)
        .collect()
}

/// Every tag in use with its count, most used first, then alphabetical
pub fn collect_tags(items: &[TrackedItem]) -> Vec<(String, usize)> {
    let counts = items
        .iter()
        .flat_map(|item| item.tags.iter())
        .fold(HashMap::new(), |mut counts, tag| {
            *counts.entry(tag.clone()).or_insert(0) += 1;
            counts
        });

    let mut tags: Vec<(String, usize)> = counts.into_iter().collect();
    tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    tags
}

/// Suggestions for the tag input: unused tags matching the token being typed
pub fn tag_suggestions(
    input: &str,
    all_tags: &[(String, usize)],
    limit: usize,
) -> Vec<(String, usize)> {
    let current: HashSet<String> = parse_tags(input).into_iter().collect();
    let partial = input
        .rsplit([',', ' ', '\t', '\n'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    all_tags
        .iter()
        .filter(|(tag, _)| !current.contains(tag))
        .filter(|(tag, _)| partial.is_empty() || tag.contains(&partial))
        .take(limit)
        .cloned()
        .collect()
}

/// Keep the first item for each URL
pub fn dedupe_by_url(items: &[TrackedItem]) -> Vec<TrackedItem> {
    let mut seen_urls = HashSet::new();

    items
        .iter()
        .filter(|item| seen_urls.insert(item.url.clone()))
        .cloned()
        .collect()
}
