use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::{BatchSettings, CoordinateFields, FieldKind, SortableField};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub crm: CrmSettings,
    pub geocoder: GeocoderSettings,
    #[serde(default)]
    pub fields: FieldSettings,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub debug: DebugSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            workers: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrmSettings {
    pub base_url: String,
    pub access_token: Option<String>,
    pub account_id: Option<String>,
    pub page_size: Option<usize>,
    pub max_pages: Option<usize>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderSettings {
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSettings {
    #[serde(default = "default_latitude_field")]
    pub latitude: String,
    #[serde(default = "default_longitude_field")]
    pub longitude: String,
    #[serde(default = "default_sortable_fields")]
    pub sortable: Vec<SortableField>,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            latitude: default_latitude_field(),
            longitude: default_longitude_field(),
            sortable: default_sortable_fields(),
        }
    }
}

impl FieldSettings {
    pub fn coordinate_fields(&self) -> CoordinateFields {
        CoordinateFields {
            latitude: self.latitude.clone(),
            longitude: self.longitude.clone(),
        }
    }
}

fn default_latitude_field() -> String { "contact.custom_lat".to_string() }
fn default_longitude_field() -> String { "contact.custom_lng".to_string() }

fn default_sortable_fields() -> Vec<SortableField> {
    vec![
        SortableField {
            name: "lifetime_value".to_string(),
            field: "contact.lifetime_value".to_string(),
            kind: FieldKind::Numeric,
        },
        SortableField {
            name: "last_order_date".to_string(),
            field: "contact.last_order_date".to_string(),
            kind: FieldKind::Date,
        },
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    pub max_items: Option<usize>,
    pub auto_run_interval_secs: Option<u64>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            max_items: None,
            auto_run_interval_secs: None,
        }
    }
}

impl BatchConfig {
    pub fn settings(&self) -> BatchSettings {
        BatchSettings::new(
            Duration::from_millis(self.delay_ms),
            Duration::from_millis(self.settle_delay_ms),
            self.max_items,
        )
    }
}

fn default_delay_ms() -> u64 { 250 }
fn default_settle_delay_ms() -> u64 { 1500 }

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    #[serde(default = "default_l1_cache_size")]
    pub l1_cache_size: u64,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            l1_cache_size: default_l1_cache_size(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_l1_cache_size() -> u64 { 1000 }
fn default_ttl_secs() -> u64 { 300 }

#[derive(Debug, Clone, Deserialize)]
pub struct HistorySettings {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { max_entries: default_max_entries() }
    }
}

fn default_max_entries() -> usize { crate::core::history::DEFAULT_MAX_ENTRIES }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DebugSettings {
    /// Expose the cached contact list at `/api/v1/contacts/debug`
    #[serde(default)]
    pub inspect_contacts: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with NEARBY__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Local overrides for development
            .add_source(File::with_name("config/local").required(false))
            // e.g., NEARBY__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("NEARBY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("NEARBY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Pick up secrets from their conventional unprefixed variables
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let overrides = [
        ("CRM_ACCESS_TOKEN", "crm.access_token"),
        ("CRM_ACCOUNT_ID", "crm.account_id"),
        ("MAPBOX_ACCESS_TOKEN", "geocoder.access_token"),
        ("REDIS_URL", "cache.redis_url"),
    ];

    let mut builder = Config::builder().add_source(settings);
    for (var, key) in overrides {
        if let Ok(value) = env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}
