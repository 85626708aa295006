/// Extension-wide settings

/// Key holding the tracked item array in synchronized storage
pub const STORAGE_KEY: &str = "trackedPages";

/// Key holding the popup's filter controls in local storage
pub const UI_STATE_KEY: &str = "prepTrackerUIState";

const ONE_YEAR_MS: f64 = 365.0 * 24.0 * 60.0 * 60.0 * 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub storage_key: String,
    pub ui_state_key: String,
    /// Upper bound on tabs opened by "open all"
    pub max_open_tabs: usize,
    /// Ask before opening more than this many tabs
    pub confirm_open_threshold: usize,
    pub max_tag_suggestions: usize,
    /// How long a transient notification stays visible
    pub notification_ms: u32,
    /// Quiet period before typed filter changes are written back
    pub debounce_ms: u32,
    /// Unstarred items not updated within this window are pruned by maintenance
    pub stale_after_ms: f64,
    pub log_level: log::Level,
}

impl TrackerConfig {
    pub fn new() -> Self {
        TrackerConfig {
            storage_key: STORAGE_KEY.to_string(),
            ui_state_key: UI_STATE_KEY.to_string(),
            max_open_tabs: 15,
            confirm_open_threshold: 10,
            max_tag_suggestions: 24,
            notification_ms: 3000,
            debounce_ms: 300,
            stale_after_ms: ONE_YEAR_MS,
            log_level: log::Level::Info,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new()
    }
}
