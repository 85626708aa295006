/// Prep Tracker - Chrome Extension for tracking pages to read
/// Built with Rust + WASM + Yew

pub mod bridge;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod notifier;
pub mod operations;
pub mod repository;
pub mod storage;
pub mod tracked_item;
pub mod transfer;
pub mod ui;

use log::{error, info};
use wasm_bindgen::prelude::*;

use crate::config::TrackerConfig;
use crate::repository::{TrackRequest, TrackSource};

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::new(TrackerConfig::default().log_level));
    info!("Prep Tracker module loaded");
}

#[wasm_bindgen]
pub fn extract_host(url: &str) -> String {
    domain::extract_host(url)
}

#[wasm_bindgen]
pub fn is_trackable_url(url: &str) -> bool {
    domain::is_trackable_url(url)
}

/// Context menu "Track this page"; resolves to the tracked item's name
#[wasm_bindgen]
pub async fn track_page(url: String, title: Option<String>) -> Result<String, JsValue> {
    let repo = bridge::sync_repository(&TrackerConfig::default());

    repo.add_or_update(TrackRequest::new(url, title, TrackSource::ContextMenu))
        .await
        .map(|item| item.name)
        .map_err(|e| {
            error!("Context menu track failed: {}", e);
            JsValue::from_str(&e.to_string())
        })
}

/// Badge text: number of items not yet done, or empty
#[wasm_bindgen]
pub async fn pending_badge_text() -> String {
    let repo = bridge::sync_repository(&TrackerConfig::default());
    repo.stats().await.badge_text()
}

/// `{ total, todo, inProgress, done, starred }`
#[wasm_bindgen]
pub async fn item_stats() -> Result<JsValue, JsValue> {
    let repo = bridge::sync_repository(&TrackerConfig::default());
    let stats = repo.stats().await;

    serde_wasm_bindgen::to_value(&stats).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Remove unstarred items untouched for the configured retention window
#[wasm_bindgen]
pub async fn prune_stale_items() -> Result<u32, JsValue> {
    let config = TrackerConfig::default();
    let repo = bridge::sync_repository(&config);

    repo.prune_stale(config.stale_after_ms)
        .await
        .map(|removed| removed as u32)
        .map_err(|e| {
            error!("Maintenance failed: {}", e);
            JsValue::from_str(&e.to_string())
        })
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}
