//! Launcher and synchronization configuration.
//!
//! Two layers of configuration live here:
//!
//! - [`SyncConfig`] is the explicit configuration threaded through every
//!   engine entry point (manifest store, scanner, orchestrator). It is never
//!   read from ambient state.
//! - [`ConfigFile`] is the persistent launcher configuration stored as an
//!   INI file in the platform config directory, loaded leniently so a
//!   missing or damaged file falls back to defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;

/// Default remote base location for manifests and objects.
pub const DEFAULT_SERVER_URL: &str = "https://packs.example.org/";

/// Default number of concurrent download workers.
pub const DEFAULT_WORKER_COUNT: usize = 8;

/// Total attempts per object before the run aborts.
pub const DEFAULT_ATTEMPT_BUDGET: u32 = 3;

/// Default per-request network timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default progress sampling interval in milliseconds.
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 500;

/// Default JVM heap limit in MiB.
pub const DEFAULT_JAVA_MEMORY_MB: u32 = 6144;

/// Explicit configuration for one synchronization run.
///
/// Every engine component receives what it needs from this struct; nothing
/// reads process-global state.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Remote base location (manifest collection and object endpoint).
    pub base_url: String,

    /// Bundle name to synchronize.
    pub bundle: String,

    /// Local installation root.
    pub install_dir: PathBuf,

    /// Shared, bundle-independent assets directory.
    pub assets_dir: PathBuf,

    /// Number of concurrent download workers.
    pub workers: usize,

    /// Total attempts per object (first try included).
    pub attempt_budget: u32,

    /// Per-request network timeout.
    pub request_timeout: Duration,

    /// Progress sampling interval.
    pub progress_interval: Duration,
}

impl SyncConfig {
    /// Create a config with default tuning for the given run.
    pub fn new(
        base_url: impl Into<String>,
        bundle: impl Into<String>,
        install_dir: PathBuf,
        assets_dir: PathBuf,
    ) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            bundle: bundle.into(),
            install_dir,
            assets_dir,
            workers: DEFAULT_WORKER_COUNT,
            attempt_budget: DEFAULT_ATTEMPT_BUDGET,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            progress_interval: Duration::from_millis(DEFAULT_PROGRESS_INTERVAL_MS),
        }
    }

    /// Set the worker count (minimum 1).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the attempt budget (minimum 1).
    pub fn with_attempt_budget(mut self, attempts: u32) -> Self {
        self.attempt_budget = attempts.max(1);
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the progress sampling interval.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}

/// Ensure the base URL ends with a single `/` so key concatenation is
/// uniform.
pub fn normalize_base_url(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url.push('/');
    url
}

/// Persistent launcher configuration.
///
/// Stored as `config.ini` under the platform config directory. All fields
/// have usable defaults; `load` never fails.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigFile {
    /// Selected bundle name (empty until the user picks one).
    pub bundle: String,

    /// Remote base location override.
    pub server_url: String,

    /// Shared assets directory override (empty means the default location).
    pub assets_dir: String,

    /// Path to the Java runtime executable (empty until provisioned).
    pub java_path: String,

    /// JVM heap limit in MiB.
    pub java_memory_mb: u32,

    /// Extra JVM options, whitespace-separated.
    pub java_options: String,

    /// Offline profile name used for launch argument substitution.
    pub player_name: String,

    /// Concurrent download workers.
    pub workers: usize,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            bundle: String::new(),
            server_url: DEFAULT_SERVER_URL.to_string(),
            assets_dir: String::new(),
            java_path: String::new(),
            java_memory_mb: DEFAULT_JAVA_MEMORY_MB,
            java_options: String::new(),
            player_name: "Player".to_string(),
            workers: DEFAULT_WORKER_COUNT,
        }
    }
}

impl ConfigFile {
    /// Load from the default location, falling back to defaults on any
    /// problem (missing file, malformed INI, bad values).
    pub fn load() -> Self {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from an explicit path, leniently.
    pub fn load_from(path: &Path) -> Self {
        let Ok(ini) = Ini::load_from_file(path) else {
            return Self::default();
        };

        let defaults = Self::default();
        let get = |section: &str, key: &str| {
            ini.get_from(Some(section), key).map(str::to_string)
        };

        Self {
            bundle: get("launcher", "bundle").unwrap_or(defaults.bundle),
            server_url: normalize_base_url(
                get("launcher", "server_url").unwrap_or(defaults.server_url),
            ),
            assets_dir: get("launcher", "assets_dir").unwrap_or(defaults.assets_dir),
            java_path: get("java", "path").unwrap_or(defaults.java_path),
            java_memory_mb: get("java", "memory_mb")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.java_memory_mb),
            java_options: get("java", "options").unwrap_or(defaults.java_options),
            player_name: get("launcher", "player_name").unwrap_or(defaults.player_name),
            workers: get("download", "workers")
                .and_then(|v| v.parse().ok())
                .filter(|&w| w >= 1)
                .unwrap_or(defaults.workers),
        }
    }

    /// Save to the default location.
    pub fn save(&self) -> std::io::Result<()> {
        let path = config_path().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no platform config directory available",
            )
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.save_to(&path)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let mut ini = Ini::new();
        ini.with_section(Some("launcher"))
            .set("bundle", self.bundle.as_str())
            .set("server_url", self.server_url.as_str())
            .set("assets_dir", self.assets_dir.as_str())
            .set("player_name", self.player_name.as_str());
        ini.with_section(Some("java"))
            .set("path", self.java_path.as_str())
            .set("memory_mb", self.java_memory_mb.to_string())
            .set("options", self.java_options.as_str());
        ini.with_section(Some("download"))
            .set("workers", self.workers.to_string());
        ini.write_to_file(path)
    }

    /// Resolve the shared assets directory: the configured override, or the
    /// default under the data directory.
    pub fn resolved_assets_dir(&self) -> Option<PathBuf> {
        if !self.assets_dir.is_empty() {
            return Some(PathBuf::from(&self.assets_dir));
        }
        data_dir().map(|d| d.join("assets"))
    }

    /// Build the engine configuration for one bundle.
    ///
    /// Returns `None` when no platform data directory is available.
    pub fn sync_config(&self, bundle: &str) -> Option<SyncConfig> {
        let install_dir = bundle_dir(bundle)?;
        let assets_dir = self.resolved_assets_dir()?;
        Some(
            SyncConfig::new(self.server_url.clone(), bundle, install_dir, assets_dir)
                .with_workers(self.workers),
        )
    }
}

/// Path of the persistent config file.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("packsync").join("config.ini"))
}

/// Root data directory for bundles, assets and runtimes.
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("packsync"))
}

/// Installation root for one bundle.
pub fn bundle_dir(bundle: &str) -> Option<PathBuf> {
    data_dir().map(|d| d.join("bundles").join(bundle))
}

/// Format a byte count for display (B / KB / MB / GB).
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sync_config_defaults() {
        let config = SyncConfig::new(
            "https://example.org",
            "modpack-x",
            PathBuf::from("/install"),
            PathBuf::from("/assets"),
        );

        assert_eq!(config.base_url, "https://example.org/");
        assert_eq!(config.workers, DEFAULT_WORKER_COUNT);
        assert_eq!(config.attempt_budget, DEFAULT_ATTEMPT_BUDGET);
        assert_eq!(config.progress_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_sync_config_builders_clamp() {
        let config = SyncConfig::new(
            "https://example.org/",
            "modpack-x",
            PathBuf::from("/install"),
            PathBuf::from("/assets"),
        )
        .with_workers(0)
        .with_attempt_budget(0);

        assert_eq!(config.workers, 1);
        assert_eq!(config.attempt_budget, 1);
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("http://a".into()), "http://a/");
        assert_eq!(normalize_base_url("http://a///".into()), "http://a/");
    }

    #[test]
    fn test_config_file_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");

        let config = ConfigFile {
            bundle: "modpack-x".to_string(),
            server_url: "https://packs.test/".to_string(),
            assets_dir: "/data/assets".to_string(),
            java_path: "/usr/bin/java".to_string(),
            java_memory_mb: 4096,
            java_options: "-XX:+UseZGC".to_string(),
            player_name: "Steve".to_string(),
            workers: 4,
        };
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_file_missing_is_default() {
        let temp = TempDir::new().unwrap();
        let loaded = ConfigFile::load_from(&temp.path().join("nope.ini"));
        assert_eq!(loaded, ConfigFile::default());
    }

    #[test]
    fn test_config_file_bad_values_fall_back() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(
            &path,
            "[java]\nmemory_mb = lots\n[download]\nworkers = 0\n",
        )
        .unwrap();

        let loaded = ConfigFile::load_from(&path);
        assert_eq!(loaded.java_memory_mb, DEFAULT_JAVA_MEMORY_MB);
        assert_eq!(loaded.workers, DEFAULT_WORKER_COUNT);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
