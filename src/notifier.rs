/// Change notifications between extension views
///
/// Every mutation emits a [`ChangeEvent`]. Receivers re-fetch the whole item
/// list; the payload is informational only.
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

/// Message type broadcast after storage changes
pub const TRACKED_UPDATED: &str = "tracked:updated";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePayload {
    pub id: Option<String>,
    pub action: String,
}

/// `{ "type": "tracked:updated", "payload": { ... } }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ChangePayload>,
}

impl ChangeEvent {
    pub fn updated() -> Self {
        ChangeEvent {
            kind: TRACKED_UPDATED.to_string(),
            payload: None,
        }
    }

    pub fn for_item(id: Option<&str>, action: &str) -> Self {
        ChangeEvent {
            kind: TRACKED_UPDATED.to_string(),
            payload: Some(ChangePayload {
                id: id.map(str::to_string),
                action: action.to_string(),
            }),
        }
    }

    pub fn is_update(&self) -> bool {
        self.kind == TRACKED_UPDATED
    }
}

/// Fire-and-forget delivery of change events
pub trait Notifier {
    fn notify(&self, event: &ChangeEvent);
}

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: &ChangeEvent) {}
}

type Listener = Rc<dyn Fn(&ChangeEvent)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Observer registry for change events within one view
#[derive(Clone, Default)]
pub struct Subscribers {
    registry: Rc<RefCell<Registry>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; it stays active until the returned handle is dropped
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, listener: impl Fn(&ChangeEvent) + 'static) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Rc::new(listener)));

        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub fn len(&self) -> usize {
        self.registry.borrow().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for Subscribers {
    fn notify(&self, event: &ChangeEvent) {
        // Snapshot so listeners may subscribe or unsubscribe while running
        let listeners: Vec<Listener> = self
            .registry
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(event);
        }
    }
}

/// Handle returned by [`Subscribers::subscribe`]
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .borrow_mut()
                .listeners
                .retain(|(id, _)| *id != self.id);
        }
    }
}
