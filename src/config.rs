//! Persistent application configuration model and defaults.

/// Lower bound for the clipboard polling interval.
pub const MIN_CLIPBOARD_INTERVAL_MS: u64 = 100;

/// Root configuration persisted to `bms_hash_watcher.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// beatoraja database preferences.
    pub beatoraja: SourceConfig,
    #[serde(default)]
    /// LR2 database preferences.
    pub lr2: SourceConfig,
    #[serde(default)]
    /// Source chain behavior.
    pub chain: ChainConfig,
    #[serde(default)]
    /// Clipboard polling preferences.
    pub watcher: WatcherConfig,
}

/// Root folder and enablement for one song database.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SourceConfig {
    /// Root folder of the player installation; empty means unconfigured.
    #[serde(default)]
    pub root_path: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            root_path: String::new(),
            enabled: true,
        }
    }
}

/// Fallback behavior of the source chain.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ChainConfig {
    /// Hand hashes the first source could not resolve to the next source.
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            fallback_enabled: true,
        }
    }
}

/// Clipboard polling preferences.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct WatcherConfig {
    /// Begin watching the clipboard as soon as the application starts.
    #[serde(default)]
    pub watch_on_start: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            watch_on_start: false,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    1000
}

/// Clamps values the rest of the application relies on into their
/// supported ranges.
pub fn sanitize_config(config: Config) -> Config {
    let clamped_interval = config
        .watcher
        .poll_interval_ms
        .max(MIN_CLIPBOARD_INTERVAL_MS);
    Config {
        watcher: WatcherConfig {
            poll_interval_ms: clamped_interval,
            ..config.watcher
        },
        ..config
    }
}
