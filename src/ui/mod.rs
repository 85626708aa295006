/// UI module exports
use std::cell::RefCell;

use gloo_timers::callback::Timeout;
use log::warn;
use yew::UseStateHandle;

pub mod components;
pub mod popup;

/// Severity of a transient notification
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Show a notification and hide it again after `duration_ms`
pub fn show_notice(
    handle: &UseStateHandle<Option<Notice>>,
    kind: NoticeKind,
    message: impl Into<String>,
    duration_ms: u32,
) {
    handle.set(Some(Notice {
        kind,
        message: message.into(),
    }));

    let handle = handle.clone();
    Timeout::new(duration_ms, move || handle.set(None)).forget();
}

/// `window.prompt`; `None` when cancelled or unavailable
pub fn prompt(message: &str, default: &str) -> Option<String> {
    web_sys::window()?
        .prompt_with_message_and_default(message, default)
        .unwrap_or_else(|e| {
            warn!("Prompt failed: {:?}", e);
            None
        })
}

/// `window.confirm`; false when unavailable
pub fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|window| window.confirm_with_message(message).ok())
        .unwrap_or(false)
}

/// Runs only the last of a burst of calls, once `delay_ms` has passed quietly
pub struct Debounce {
    delay_ms: u32,
    pending: RefCell<Option<Timeout>>,
}

impl Debounce {
    pub fn new(delay_ms: u32) -> Self {
        Debounce {
            delay_ms,
            pending: RefCell::new(None),
        }
    }

    /// Schedule `f`, cancelling whatever was scheduled before
    pub fn call(&self, f: impl FnOnce() + 'static) {
        // Dropping the previous Timeout clears it
        self.pending.replace(Some(Timeout::new(self.delay_ms, f)));
    }
}
