/// Host bindings: chrome.storage, chrome.runtime messaging, tabs and files
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::config::TrackerConfig;
use crate::error::{Result, TrackerError};
use crate::notifier::{ChangeEvent, Notifier, Subscribers};
use crate::repository::Repository;
use crate::storage::StorageArea;

// Import JS bridge functions
#[wasm_bindgen(module = "/js/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn storageGet(area: &str, key: &str) -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn storageSet(area: &str, key: &str, value: JsValue) -> std::result::Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn sendRuntimeMessage(message: JsValue) -> std::result::Result<JsValue, JsValue>;

    fn onRuntimeMessage(callback: &js_sys::Function);

    #[wasm_bindgen(catch)]
    async fn getActiveTab() -> std::result::Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn openTab(url: &str, active: bool) -> std::result::Result<(), JsValue>;

    fn openPopupInTab();

    fn exportToFile(data: &str, filename: &str);

    #[wasm_bindgen(catch)]
    async fn pickImportFile() -> std::result::Result<JsValue, JsValue>;
}

fn bridge_error(context: &str, e: JsValue) -> TrackerError {
    TrackerError::Bridge(format!("{}: {:?}", context, e))
}

/// Which chrome.storage area to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaKind {
    Sync,
    Local,
}

impl AreaKind {
    fn as_str(self) -> &'static str {
        match self {
            AreaKind::Sync => "sync",
            AreaKind::Local => "local",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChromeStorage {
    kind: AreaKind,
}

impl ChromeStorage {
    pub fn sync() -> Self {
        ChromeStorage { kind: AreaKind::Sync }
    }

    pub fn local() -> Self {
        ChromeStorage { kind: AreaKind::Local }
    }
}

impl StorageArea for ChromeStorage {
    async fn load(&self, key: &str) -> Result<Option<Value>> {
        let value_js = storageGet(self.kind.as_str(), key)
            .await
            .map_err(|e| TrackerError::Storage(format!("Failed to get storage: {:?}", e)))?;

        if value_js.is_null() || value_js.is_undefined() {
            return Ok(None);
        }

        serde_wasm_bindgen::from_value(value_js)
            .map(Some)
            .map_err(|e| TrackerError::Storage(format!("Failed to parse storage: {}", e)))
    }

    async fn save(&self, key: &str, value: Value) -> Result<()> {
        // Plain objects rather than JS Maps, so chrome.storage can serialize them
        let value_js = value
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| TrackerError::Storage(format!("Failed to serialize storage: {}", e)))?;

        storageSet(self.kind.as_str(), key, value_js)
            .await
            .map_err(|e| TrackerError::Storage(format!("Failed to save storage: {:?}", e)))
    }
}

/// Broadcasts change events to other extension views via chrome.runtime
#[derive(Debug, Default, Clone, Copy)]
pub struct RuntimeNotifier;

impl Notifier for RuntimeNotifier {
    fn notify(&self, event: &ChangeEvent) {
        let message = match event.serialize(&serde_wasm_bindgen::Serializer::json_compatible()) {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to serialize change event: {}", e);
                return;
            }
        };

        spawn_local(async move {
            if let Err(e) = sendRuntimeMessage(message).await {
                warn!("Runtime message failed: {:?}", e);
            }
        });
    }
}

/// Repository over synchronized storage that broadcasts its changes
pub fn sync_repository(config: &TrackerConfig) -> Repository<ChromeStorage> {
    Repository::new(ChromeStorage::sync(), &config.storage_key, RuntimeNotifier)
}

/// Forward `tracked:updated` messages from other views into `subscribers`
pub fn listen_for_updates(subscribers: Subscribers) {
    let callback = Closure::<dyn Fn(JsValue)>::new(move |message: JsValue| {
        match serde_wasm_bindgen::from_value::<ChangeEvent>(message) {
            Ok(event) if event.is_update() => subscribers.notify(&event),
            Ok(_) => {}
            Err(e) => warn!("Ignoring malformed runtime message: {}", e),
        }
    });

    onRuntimeMessage(callback.as_ref().unchecked_ref());
    // The listener lives as long as the page
    callback.forget();
}

/// The focused tab of the current window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveTab {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

pub async fn active_tab() -> Result<ActiveTab> {
    let tab_js = getActiveTab()
        .await
        .map_err(|e| bridge_error("Failed to query active tab", e))?;

    if tab_js.is_null() || tab_js.is_undefined() {
        return Ok(ActiveTab::default());
    }

    serde_wasm_bindgen::from_value(tab_js)
        .map_err(|e| TrackerError::Bridge(format!("Failed to parse tab: {}", e)))
}

pub async fn open_tab(url: &str, active: bool) -> Result<()> {
    openTab(url, active)
        .await
        .map_err(|e| bridge_error("Failed to open tab", e))
}

pub fn open_popup_in_tab() {
    openPopupInTab();
}

pub fn download_file(contents: &str, filename: &str) {
    exportToFile(contents, filename);
}

/// Text of a user-picked file, or `None` if the picker was dismissed
pub async fn pick_import_file() -> Result<Option<String>> {
    let text_js = pickImportFile()
        .await
        .map_err(|e| bridge_error("Failed to read import file", e))?;

    Ok(text_js.as_string())
}
