/// Item manager: every read and mutation of the tracked item list
///
/// Each mutation reads the whole list, modifies it, writes it back and then
/// emits a change event. There is no transaction around the read-modify-write,
/// so two views writing at once resolve as last-write-wins.
use log::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::domain::{extract_host, parse_trackable};
use crate::error::{Result, TrackerError};
use crate::notifier::{ChangeEvent, Notifier};
use crate::storage::{ItemStore, StorageArea};
use crate::tracked_item::{ItemStats, Status, TrackedItem, merge_tags, normalize_tags, parse_tags};
use crate::transfer::{export_json, parse_import};

/// Where a track action came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSource {
    /// "Track this page" context menu entry
    ContextMenu,
    /// "Track current page" form in the popup
    Popup,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackRequest {
    pub url: String,
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub source: TrackSource,
}

impl TrackRequest {
    pub fn new(url: impl Into<String>, name: Option<String>, source: TrackSource) -> Self {
        TrackRequest {
            url: url.into(),
            name,
            tags: Vec::new(),
            source,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    fn trimmed_name(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

pub struct Repository<S: StorageArea> {
    store: ItemStore<S>,
    notifier: Box<dyn Notifier>,
    clock: Box<dyn Clock>,
}

impl<S: StorageArea> Repository<S> {
    pub fn new(area: S, key: &str, notifier: impl Notifier + 'static) -> Self {
        Repository {
            store: ItemStore::new(area, key),
            notifier: Box::new(notifier),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn now(&self) -> f64 {
        self.clock.now_ms()
    }

    pub fn store(&self) -> &ItemStore<S> {
        &self.store
    }

    /// Fresh copy of the stored list
    pub async fn items(&self) -> Vec<TrackedItem> {
        self.store.get(self.now()).await
    }

    pub async fn stats(&self) -> ItemStats {
        ItemStats::from_items(&self.items().await)
    }

    async fn commit(&self, items: &[TrackedItem], event: ChangeEvent) -> Result<()> {
        self.store.set(items).await?;
        self.notifier.notify(&event);
        Ok(())
    }

    /// Create the item for a URL, or update the one already tracking it
    ///
    /// Updating replaces the name only when a non-empty name is given and
    /// merges tags. A context-menu track of a finished item puts it back to
    /// todo.
    pub async fn add_or_update(&self, request: TrackRequest) -> Result<TrackedItem> {
        let url = request.url.trim();
        if parse_trackable(url).is_none() {
            return Err(TrackerError::InvalidUrl(request.url.clone()));
        }

        let mut items = self.items().await;
        let now = self.now();
        let name = request.trimmed_name();

        let (item, action) = match items.iter().position(|item| item.url == url) {
            Some(index) => {
                let existing = &mut items[index];
                if let Some(name) = name {
                    existing.name = name;
                }
                existing.tags = merge_tags(&existing.tags, &request.tags);
                existing.updated_at = now;
                if request.source == TrackSource::ContextMenu && existing.status == Status::Done {
                    debug!("Re-tracked finished item {}, resetting to todo", existing.id);
                    existing.status = Status::Todo;
                }
                (existing.clone(), "update")
            }
            None => {
                let item = TrackedItem::new(
                    url.to_string(),
                    name.unwrap_or_else(|| extract_host(url)),
                    request.tags.clone(),
                    now,
                );
                items.insert(0, item.clone());
                (item, "add")
            }
        };

        let action = match request.source {
            TrackSource::ContextMenu => format!("context-menu-{}", action),
            TrackSource::Popup => format!("popup-{}", action),
        };
        self.commit(&items, ChangeEvent::for_item(Some(&item.id), &action))
            .await?;
        info!("Tracked page: {}", item.name);
        Ok(item)
    }

    /// Replace an item by id (inserting it at the front if unknown), stamping it as updated
    ///
    /// The url must be trackable and must not belong to a different item.
    pub async fn save_item(&self, mut item: TrackedItem) -> Result<TrackedItem> {
        item.url = item.url.trim().to_string();
        if parse_trackable(&item.url).is_none() {
            return Err(TrackerError::InvalidUrl(item.url));
        }

        let mut items = self.items().await;
        if let Some(other) = items
            .iter()
            .find(|existing| existing.url == item.url && existing.id != item.id)
        {
            return Err(TrackerError::Validation(format!(
                "{} is already tracked as {}",
                item.url, other.id
            )));
        }
        item.updated_at = self.now();
        item.tags = normalize_tags(item.tags);

        match items.iter().position(|existing| existing.id == item.id) {
            Some(index) => items[index] = item.clone(),
            None => items.insert(0, item.clone()),
        }

        self.commit(&items, ChangeEvent::for_item(Some(&item.id), "save"))
            .await?;
        Ok(item)
    }

    async fn modify(
        &self,
        id: &str,
        action: &str,
        change: impl FnOnce(&mut TrackedItem) -> bool,
    ) -> Result<TrackedItem> {
        let mut items = self.items().await;
        let now = self.now();

        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;

        if !change(item) {
            return Ok(item.clone());
        }
        item.updated_at = now;
        let item = item.clone();

        self.commit(&items, ChangeEvent::for_item(Some(id), action))
            .await?;
        Ok(item)
    }

    pub async fn toggle_star(&self, id: &str) -> Result<TrackedItem> {
        self.modify(id, "star", |item| {
            item.starred = !item.starred;
            true
        })
        .await
    }

    pub async fn cycle_status(&self, id: &str) -> Result<TrackedItem> {
        self.modify(id, "status", |item| {
            item.status = item.status.cycle();
            true
        })
        .await
    }

    /// Mark as done; an item already done is left untouched
    pub async fn mark_done(&self, id: &str) -> Result<TrackedItem> {
        self.modify(id, "done", |item| {
            if item.status == Status::Done {
                return false;
            }
            item.status = Status::Done;
            true
        })
        .await
    }

    pub async fn rename(&self, id: &str, name: &str) -> Result<TrackedItem> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrackerError::Validation("name cannot be empty".to_string()));
        }

        self.modify(id, "rename", |item| {
            item.name = name.to_string();
            true
        })
        .await
    }

    /// Replace tags from free-form input (comma or whitespace separated)
    pub async fn set_tags(&self, id: &str, input: &str) -> Result<TrackedItem> {
        let tags = parse_tags(input);
        self.modify(id, "tags", |item| {
            item.tags = tags;
            true
        })
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut items = self.items().await;
        let original_len = items.len();
        items.retain(|item| item.id != id);

        if items.len() == original_len {
            return Err(TrackerError::NotFound(id.to_string()));
        }

        self.commit(&items, ChangeEvent::for_item(Some(id), "delete"))
            .await
    }

    /// Replace the stored list with the contents of an import file
    ///
    /// Nothing is written when the file cannot be parsed.
    pub async fn import_json(&self, text: &str) -> Result<Vec<TrackedItem>> {
        let items = parse_import(text, self.now())?;
        self.commit(&items, ChangeEvent::for_item(None, "import"))
            .await?;
        info!("Imported {} items", items.len());
        Ok(items)
    }

    pub async fn export_json(&self) -> Result<String> {
        export_json(&self.items().await, self.now())
    }

    /// Remove unstarred items not updated within `max_age_ms`
    pub async fn prune_stale(&self, max_age_ms: f64) -> Result<usize> {
        let items = self.items().await;
        let cutoff = self.now() - max_age_ms;

        let kept: Vec<TrackedItem> = items
            .iter()
            .filter(|item| item.updated_at > cutoff || item.starred)
            .cloned()
            .collect();

        let removed = items.len() - kept.len();
        if removed == 0 {
            return Ok(0);
        }

        self.commit(&kept, ChangeEvent::for_item(None, "prune"))
            .await?;
        info!("Cleaned up {} old items", removed);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::{NoopNotifier, Subscribers};
    use crate::storage::MemoryStorage;
    use futures::executor::block_on;
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    const KEY: &str = "trackedPages";
    const DAY_MS: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

    #[derive(Clone)]
    struct ManualClock(Rc<Cell<f64>>);

    impl ManualClock {
        fn advance(&self, ms: f64) {
            self.0.set(self.0.get() + ms);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> f64 {
            self.0.get()
        }
    }

    /// Storage area whose every call fails
    struct BrokenStorage;

    impl StorageArea for BrokenStorage {
        async fn load(&self, _key: &str) -> Result<Option<serde_json::Value>> {
            Err(TrackerError::Storage("quota exceeded".to_string()))
        }

        async fn save(&self, _key: &str, _value: serde_json::Value) -> Result<()> {
            Err(TrackerError::Storage("quota exceeded".to_string()))
        }
    }

    fn setup() -> (Repository<MemoryStorage>, ManualClock, Subscribers) {
        let clock = ManualClock(Rc::new(Cell::new(1000.0)));
        let subscribers = Subscribers::new();
        let repo = Repository::new(MemoryStorage::new(), KEY, subscribers.clone())
            .with_clock(clock.clone());
        (repo, clock, subscribers)
    }

    fn track(repo: &Repository<MemoryStorage>, url: &str, source: TrackSource) -> TrackedItem {
        block_on(repo.add_or_update(TrackRequest::new(url, None, source))).unwrap()
    }

    #[test]
    fn test_add_creates_item_with_defaults() {
        let (repo, _, _) = setup();

        let item = track(&repo, "https://www.rust-lang.org/learn", TrackSource::Popup);

        assert_eq!(item.name, "www.rust-lang.org");
        assert_eq!(item.status, Status::Todo);
        assert!(!item.starred);
        assert!(item.tags.is_empty());
        assert_eq!(item.created_at, 1000.0);
        assert_eq!(block_on(repo.items()), vec![item]);
    }

    #[test]
    fn test_track_same_url_twice_updates() {
        let (repo, clock, _) = setup();

        let first = track(&repo, "https://tokio.rs", TrackSource::Popup);
        clock.advance(500.0);
        let second = block_on(repo.add_or_update(
            TrackRequest::new("https://tokio.rs", Some("  Tokio  ".to_string()), TrackSource::Popup)
                .with_tags(vec!["Async".to_string()]),
        ))
        .unwrap();

        let items = block_on(repo.items());
        assert_eq!(items.len(), 1);
        assert_eq!(second.id, first.id);
        assert_eq!(second.name, "Tokio");
        assert_eq!(second.tags, vec!["async"]);
        assert_eq!(second.created_at, 1000.0);
        assert_eq!(second.updated_at, 1500.0);
    }

    #[test]
    fn test_update_without_name_keeps_name() {
        let (repo, _, _) = setup();

        block_on(repo.add_or_update(TrackRequest::new(
            "https://tokio.rs",
            Some("Tokio".to_string()),
            TrackSource::Popup,
        )))
        .unwrap();
        let item = block_on(repo.add_or_update(TrackRequest::new(
            "https://tokio.rs",
            Some("   ".to_string()),
            TrackSource::ContextMenu,
        )))
        .unwrap();

        assert_eq!(item.name, "Tokio");
    }

    #[test]
    fn test_new_items_go_first() {
        let (repo, _, _) = setup();

        track(&repo, "https://a.com", TrackSource::Popup);
        track(&repo, "https://b.com", TrackSource::Popup);

        let urls: Vec<String> = block_on(repo.items()).into_iter().map(|i| i.url).collect();
        assert_eq!(urls, vec!["https://b.com", "https://a.com"]);
    }

    #[test]
    fn test_context_menu_resets_done() {
        let (repo, _, _) = setup();

        let item = track(&repo, "https://tokio.rs", TrackSource::Popup);
        block_on(repo.mark_done(&item.id)).unwrap();

        let popup = track(&repo, "https://tokio.rs", TrackSource::Popup);
        assert_eq!(popup.status, Status::Done);

        let menu = track(&repo, "https://tokio.rs", TrackSource::ContextMenu);
        assert_eq!(menu.status, Status::Todo);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let (repo, _, subscribers) = setup();
        let events = Rc::new(Cell::new(0));
        let _sub = {
            let events = events.clone();
            subscribers.subscribe(move |_| events.set(events.get() + 1))
        };

        let result = block_on(repo.add_or_update(TrackRequest::new(
            "chrome://extensions",
            None,
            TrackSource::ContextMenu,
        )));

        assert!(matches!(result, Err(TrackerError::InvalidUrl(_))));
        assert!(repo.store().area().raw(KEY).is_none());
        assert_eq!(events.get(), 0);
    }

    #[test]
    fn test_mutations_notify_subscribers() {
        let (repo, _, subscribers) = setup();
        let actions = Rc::new(RefCell::new(Vec::new()));
        let _sub = {
            let actions = actions.clone();
            subscribers.subscribe(move |event| {
                if let Some(payload) = &event.payload {
                    actions.borrow_mut().push(payload.action.clone());
                }
            })
        };

        let item = track(&repo, "https://tokio.rs", TrackSource::ContextMenu);
        block_on(repo.toggle_star(&item.id)).unwrap();
        block_on(repo.delete(&item.id)).unwrap();

        assert_eq!(*actions.borrow(), vec!["context-menu-add", "star", "delete"]);
    }

    #[test]
    fn test_item_edits() {
        let (repo, clock, _) = setup();
        let item = track(&repo, "https://tokio.rs", TrackSource::Popup);

        clock.advance(10.0);
        let item = block_on(repo.toggle_star(&item.id)).unwrap();
        assert!(item.starred);
        assert_eq!(item.updated_at, 1010.0);

        let item = block_on(repo.cycle_status(&item.id)).unwrap();
        assert_eq!(item.status, Status::InProgress);

        let item = block_on(repo.rename(&item.id, " Tokio runtime ")).unwrap();
        assert_eq!(item.name, "Tokio runtime");

        let item = block_on(repo.set_tags(&item.id, "Async, rust rust")).unwrap();
        assert_eq!(item.tags, vec!["async", "rust"]);

        assert_eq!(block_on(repo.items()), vec![item]);
    }

    #[test]
    fn test_mark_done_twice_writes_once() {
        let (repo, clock, _) = setup();
        let item = track(&repo, "https://tokio.rs", TrackSource::Popup);

        clock.advance(10.0);
        let done = block_on(repo.mark_done(&item.id)).unwrap();
        clock.advance(10.0);
        let again = block_on(repo.mark_done(&item.id)).unwrap();

        assert_eq!(done.updated_at, 1010.0);
        assert_eq!(again.updated_at, 1010.0);
    }

    #[test]
    fn test_rename_rejects_empty() {
        let (repo, _, _) = setup();
        let item = track(&repo, "https://tokio.rs", TrackSource::Popup);

        assert!(matches!(
            block_on(repo.rename(&item.id, "  ")),
            Err(TrackerError::Validation(_))
        ));
    }

    #[test]
    fn test_unknown_id() {
        let (repo, _, _) = setup();

        assert!(matches!(block_on(repo.delete("missing")), Err(TrackerError::NotFound(_))));
        assert!(matches!(block_on(repo.toggle_star("missing")), Err(TrackerError::NotFound(_))));
    }

    #[test]
    fn test_save_item_replaces_by_id() {
        let (repo, clock, _) = setup();
        let mut item = track(&repo, "https://tokio.rs", TrackSource::Popup);

        clock.advance(100.0);
        item.tags = vec!["Async".to_string()];
        let saved = block_on(repo.save_item(item)).unwrap();

        assert_eq!(saved.updated_at, 1100.0);
        assert_eq!(block_on(repo.items()), vec![saved]);
    }

    #[test]
    fn test_save_item_rejects_url_held_by_another_item() {
        let (repo, _, subscribers) = setup();
        let original = block_on(repo.add_or_update(TrackRequest::new(
            "https://tokio.rs",
            Some("Tokio".to_string()),
            TrackSource::Popup,
        )))
        .unwrap();
        let events = Rc::new(Cell::new(0));
        let _sub = {
            let events = events.clone();
            subscribers.subscribe(move |_| events.set(events.get() + 1))
        };

        let duplicate = TrackedItem::new("https://tokio.rs".to_string(), "Dup".to_string(), vec![], 0.0);
        let result = block_on(repo.save_item(duplicate));

        assert!(matches!(result, Err(TrackerError::Validation(_))));
        assert_eq!(repo.store().area().raw(KEY).unwrap().as_array().unwrap().len(), 1);
        assert_eq!(block_on(repo.items()), vec![original]);
        assert_eq!(events.get(), 0);
    }

    #[test]
    fn test_save_item_rejects_untrackable_url() {
        let (repo, _, _) = setup();
        let mut item = track(&repo, "https://tokio.rs", TrackSource::Popup);
        let before = repo.store().area().raw(KEY);

        item.url = "chrome://settings".to_string();
        let result = block_on(repo.save_item(item.clone()));

        assert!(matches!(result, Err(TrackerError::InvalidUrl(_))));
        assert_eq!(repo.store().area().raw(KEY), before);
        assert_eq!(block_on(repo.items()).len(), 1);
    }

    #[test]
    fn test_save_item_can_move_to_free_url() {
        let (repo, _, _) = setup();
        let mut item = track(&repo, "https://tokio.rs", TrackSource::Popup);
        track(&repo, "https://serde.rs", TrackSource::Popup);

        item.url = " https://docs.rs/tokio ".to_string();
        let saved = block_on(repo.save_item(item)).unwrap();

        assert_eq!(saved.url, "https://docs.rs/tokio");
        assert_eq!(block_on(repo.items()).len(), 2);
    }

    #[test]
    fn test_storage_failure() {
        let subscribers = Subscribers::new();
        let events = Rc::new(Cell::new(0));
        let _sub = {
            let events = events.clone();
            subscribers.subscribe(move |_| events.set(events.get() + 1))
        };
        let repo = Repository::new(BrokenStorage, KEY, subscribers.clone());

        assert!(block_on(repo.items()).is_empty());

        let result = block_on(repo.add_or_update(TrackRequest::new(
            "https://tokio.rs",
            None,
            TrackSource::ContextMenu,
        )));

        assert!(matches!(result, Err(TrackerError::Storage(ref msg)) if msg == "quota exceeded"));
        assert_eq!(events.get(), 0);
    }

    #[test]
    fn test_export_then_import_round_trips() {
        let (repo, _, _) = setup();
        let item = track(&repo, "https://tokio.rs", TrackSource::Popup);
        block_on(repo.set_tags(&item.id, "async rust")).unwrap();
        block_on(repo.cycle_status(&item.id)).unwrap();
        track(&repo, "https://serde.rs", TrackSource::Popup);
        let before = block_on(repo.items());

        let exported = block_on(repo.export_json()).unwrap();
        let (other, _, _) = setup();
        let imported = block_on(other.import_json(&exported)).unwrap();

        assert_eq!(imported, before);
        assert_eq!(block_on(other.items()), before);
    }

    #[test]
    fn test_failed_import_leaves_storage_untouched() {
        let (repo, _, _) = setup();
        track(&repo, "https://tokio.rs", TrackSource::Popup);
        let before = repo.store().area().raw(KEY);

        let result = block_on(repo.import_json(r#"{"items": 5}"#));

        assert!(matches!(result, Err(TrackerError::InvalidImport(_))));
        assert_eq!(repo.store().area().raw(KEY), before);
    }

    #[test]
    fn test_malformed_storage_reads_empty() {
        let (repo, _, _) = setup();
        repo.store().area().insert_raw(KEY, json!("corrupted"));

        assert!(block_on(repo.items()).is_empty());

        let item = track(&repo, "https://tokio.rs", TrackSource::Popup);
        assert_eq!(block_on(repo.items()), vec![item]);
    }

    #[test]
    fn test_prune_stale_keeps_starred_and_recent() {
        let (repo, clock, _) = setup();
        let old = track(&repo, "https://old.com", TrackSource::Popup);
        let starred = track(&repo, "https://starred.com", TrackSource::Popup);
        block_on(repo.toggle_star(&starred.id)).unwrap();

        clock.advance(400.0 * DAY_MS);
        let recent = track(&repo, "https://recent.com", TrackSource::Popup);

        let removed = block_on(repo.prune_stale(365.0 * DAY_MS)).unwrap();

        let ids: Vec<String> = block_on(repo.items()).into_iter().map(|i| i.id).collect();
        assert_eq!(removed, 1);
        assert!(!ids.contains(&old.id));
        assert!(ids.contains(&starred.id));
        assert!(ids.contains(&recent.id));
        assert_eq!(block_on(repo.prune_stale(365.0 * DAY_MS)).unwrap(), 0);
    }

    #[test]
    fn test_stats() {
        let repo = Repository::new(MemoryStorage::new(), KEY, NoopNotifier);
        let a = track(&repo, "https://a.com", TrackSource::Popup);
        track(&repo, "https://b.com", TrackSource::Popup);
        block_on(repo.mark_done(&a.id)).unwrap();

        let stats = block_on(repo.stats());

        assert_eq!(stats.total, 2);
        assert_eq!(stats.done, 1);
        assert_eq!(stats.badge_text(), "1");
    }
}
