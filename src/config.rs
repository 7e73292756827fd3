//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::category::Category;
use crate::table::TIME_NAME_FRAGMENTS;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub analytics: AnalyticsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which document store backs a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Firestore REST API (or its emulator)
    Firestore,
    /// JSON snapshot file on disk
    Snapshot,
    /// Empty in-memory store
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "snapshot" => Ok(StoreBackend::Snapshot),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    #[serde(default)]
    pub project_id: String,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// OAuth bearer token sent with every Firestore request
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub snapshot_path: Option<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Firestore
}

fn default_database() -> String {
    "(default)".to_string()
}

fn default_base_url() -> String {
    "https://firestore.googleapis.com".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_page_size() -> u32 {
    300
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            project_id: String::new(),
            database: default_database(),
            base_url: default_base_url(),
            access_token: None,
            snapshot_path: None,
            request_timeout_secs: default_request_timeout(),
            page_size: default_page_size(),
        }
    }
}

/// Artifact output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

fn default_output_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("cedmate").join("output").to_string_lossy().to_string())
        .unwrap_or_else(|| "./cedmate_output".to_string())
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

/// Chart and report generation settings
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// Record per-category failures instead of aborting the whole run
    #[serde(default = "default_isolate_failures")]
    pub isolate_failures: bool,

    #[serde(default = "default_time_fragments")]
    pub time_fragments: Vec<String>,

    /// Per-category override of the preferred value columns, keyed by tag
    #[serde(default)]
    pub preferred_columns: BTreeMap<String, Vec<String>>,

    #[serde(default = "default_chart_width")]
    pub chart_width: u32,

    #[serde(default = "default_chart_height")]
    pub chart_height: u32,

    #[serde(default = "default_report_row_limit")]
    pub report_row_limit: usize,

    #[serde(default = "default_product_name")]
    pub product_name: String,
}

fn default_isolate_failures() -> bool {
    true
}

fn default_time_fragments() -> Vec<String> {
    TIME_NAME_FRAGMENTS.iter().map(|s| s.to_string()).collect()
}

fn default_chart_width() -> u32 {
    1000
}

fn default_chart_height() -> u32 {
    500
}

fn default_report_row_limit() -> usize {
    30
}

fn default_product_name() -> String {
    "CEDmate".to_string()
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            isolate_failures: default_isolate_failures(),
            time_fragments: default_time_fragments(),
            preferred_columns: BTreeMap::new(),
            chart_width: default_chart_width(),
            chart_height: default_chart_height(),
            report_row_limit: default_report_row_limit(),
            product_name: default_product_name(),
        }
    }
}

impl AnalyticsConfig {
    /// Preferred value columns for a category, honouring overrides
    pub fn preferred_columns_for(&self, category: Category) -> Vec<String> {
        match self.preferred_columns.get(category.tag()) {
            Some(names) => names.clone(),
            None => category
                .preferred_value_columns()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })?;
        config.validate()?;
        Ok(config.with_expanded_paths())
    }

    /// Resolve a leading `~` in path settings against the home directory
    fn with_expanded_paths(mut self) -> Self {
        self.output.dir = expand_home(&self.output.dir);
        self.store.snapshot_path = self.store.snapshot_path.map(|p| expand_home(&p));
        self
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("cedmate").join("config.toml")),
            Some(PathBuf::from("/etc/cedmate/config.toml")),
            Some(PathBuf::from("./cedmate.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        for tag in self.analytics.preferred_columns.keys() {
            if tag.parse::<Category>().is_err() {
                return Err(ConfigError::Invalid(format!(
                    "analytics.preferred_columns: unknown category '{}'",
                    tag
                )));
            }
        }
        if self.analytics.chart_width == 0 || self.analytics.chart_height == 0 {
            return Err(ConfigError::Invalid(
                "analytics.chart_width and chart_height must be positive".to_string(),
            ));
        }
        if self.store.page_size == 0 {
            return Err(ConfigError::Invalid(
                "store.page_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Store overrides
        if let Some(backend) = lookup("CEDMATE_STORE_BACKEND") {
            match backend.parse() {
                Ok(b) => self.store.backend = b,
                Err(e) => tracing::warn!("Ignoring CEDMATE_STORE_BACKEND: {}", e),
            }
        }
        if let Some(project) = lookup("CEDMATE_FIRESTORE_PROJECT") {
            self.store.project_id = project;
        }
        if let Some(url) = lookup("CEDMATE_FIRESTORE_URL") {
            self.store.base_url = url;
        }
        if let Some(token) = lookup("CEDMATE_FIRESTORE_TOKEN") {
            self.store.access_token = Some(token);
        }
        if let Some(host) = lookup("FIRESTORE_EMULATOR_HOST") {
            self.store.base_url = format!("http://{}", host.trim_end_matches('/'));
        }
        if let Some(path) = lookup("CEDMATE_SNAPSHOT_PATH") {
            self.store.snapshot_path = Some(expand_home(&path));
        }

        // Output overrides
        if let Some(dir) = lookup("CEDMATE_OUTPUT_DIR") {
            self.output.dir = expand_home(&dir);
        }

        // Logging overrides
        if let Some(level) = lookup("CEDMATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("CEDMATE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Replace a leading `~` with the home directory; other paths pass through
pub fn expand_home(path: &str) -> String {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') => rest,
        _ => return path.to_string(),
    };
    match dirs::home_dir() {
        Some(home) => {
            let rest = rest.trim_start_matches(['/', '\\']);
            if rest.is_empty() {
                home.to_string_lossy().to_string()
            } else {
                home.join(rest).to_string_lossy().to_string()
            }
        }
        None => path.to_string(),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    let output_dir = toml::Value::String(default_output_dir()).to_string();
    format!(
        r#"# CEDmate Analytics Configuration
#
# Environment variables override these settings:
# - CEDMATE_STORE_BACKEND
# - CEDMATE_FIRESTORE_PROJECT
# - CEDMATE_FIRESTORE_URL
# - CEDMATE_FIRESTORE_TOKEN
# - FIRESTORE_EMULATOR_HOST
# - CEDMATE_SNAPSHOT_PATH
# - CEDMATE_OUTPUT_DIR
# - CEDMATE_LOG_LEVEL
# - CEDMATE_LOG_FORMAT

[store]
# Backend: firestore, snapshot or memory
backend = "firestore"

# Firebase project id
project_id = ""

# Firestore database id
database = "(default)"

# Firestore REST endpoint
base_url = "https://firestore.googleapis.com"

# OAuth bearer token (usually supplied via CEDMATE_FIRESTORE_TOKEN)
# access_token = ""

# JSON snapshot file for the snapshot backend
# snapshot_path = "./snapshot.json"

# Request timeout in seconds
request_timeout_secs = 30

# Documents per list request
page_size = 300

[output]
# Directory for chart images and exported reports
dir = {output_dir}

[analytics]
# Record a failing category and keep going (connectivity errors always abort)
isolate_failures = true

# Column-name fragments that mark a time column, highest priority first
time_fragments = ["zeit", "time", "datum", "date", "timestamp", "startzeit", "endzeit", "mahlzeitzeitpunkt"]

# Chart size in pixels
chart_width = 1000
chart_height = 500

# Rows per category table in the exported report
report_row_limit = 30

# Name printed on the report title page
product_name = "CEDmate"

# Override the preferred value columns of a category
# [analytics.preferred_columns]
# mood = ["wert", "value", "score", "level"]

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.backend, StoreBackend::Firestore);
        assert_eq!(config.store.database, "(default)");
        assert_eq!(config.store.page_size, 300);
        assert!(config.analytics.isolate_failures);
        assert_eq!(config.analytics.report_row_limit, 30);
        assert_eq!(config.analytics.time_fragments[0], "zeit");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Firestore);
        assert_eq!(config.analytics.chart_width, 1000);
        assert_eq!(config.analytics.time_fragments.len(), 8);
        assert_eq!(config.output.dir, default_output_dir());
        assert!(!config.output.dir.starts_with('~'));
    }

    #[test]
    fn test_home_relative_paths_are_expanded() {
        let config = Config::parse(
            r#"
            [store]
            snapshot_path = "~/cedmate/snap.json"

            [output]
            dir = "~/cedmate/out"
            "#,
        )
        .unwrap();

        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                PathBuf::from(&config.output.dir),
                home.join("cedmate").join("out")
            );
            assert_eq!(
                config.store.snapshot_path.map(PathBuf::from),
                Some(home.join("cedmate").join("snap.json"))
            );
        }
        assert_eq!(expand_home("/srv/out"), "/srv/out");
        assert_eq!(expand_home("~user/out"), "~user/out");
        assert_eq!(expand_home("./out~"), "./out~");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::parse(
            r#"
            [store]
            backend = "snapshot"
            snapshot_path = "/tmp/snap.json"

            [analytics.preferred_columns]
            mood = ["laune"]
            "#,
        )
        .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Snapshot);
        assert_eq!(config.store.snapshot_path.as_deref(), Some("/tmp/snap.json"));
        assert_eq!(config.analytics.chart_height, 500);
        assert_eq!(
            config.analytics.preferred_columns_for(Category::Mood),
            vec!["laune".to_string()]
        );
        assert_eq!(
            config.analytics.preferred_columns_for(Category::Symptom)[0],
            "intensitaet"
        );
    }

    #[test]
    fn test_unknown_preferred_category_rejected() {
        let err = Config::parse(
            r#"
            [analytics.preferred_columns]
            sleep = ["dauer"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[store\n").unwrap();

        match Config::load(&path).unwrap_err() {
            ConfigError::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CEDMATE_STORE_BACKEND", "memory"),
            ("CEDMATE_FIRESTORE_PROJECT", "cedmate-prod"),
            ("FIRESTORE_EMULATOR_HOST", "localhost:8080"),
            ("CEDMATE_OUTPUT_DIR", "/srv/out"),
            ("CEDMATE_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.project_id, "cedmate-prod");
        assert_eq!(config.store.base_url, "http://localhost:8080");
        assert_eq!(config.output.dir, "/srv/out");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_bad_backend_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|k| (k == "CEDMATE_STORE_BACKEND").then(|| "mongo".to_string()));
        assert_eq!(config.store.backend, StoreBackend::Firestore);
    }
}
