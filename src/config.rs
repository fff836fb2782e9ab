use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub scorer: ScorerSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub sessions: SessionSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Which profile store backs the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Firestore,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_firestore_url")]
    pub base_url: String,
    #[serde(default = "default_storage_url")]
    pub storage_url: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default = "default_database_id")]
    pub database_id: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub api_key: String,
    pub access_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            base_url: default_firestore_url(),
            storage_url: default_storage_url(),
            project_id: String::new(),
            database_id: default_database_id(),
            collection: default_collection(),
            bucket: String::new(),
            api_key: String::new(),
            access_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_store_backend() -> StoreBackend { StoreBackend::Firestore }
fn default_firestore_url() -> String { "https://firestore.googleapis.com/v1".to_string() }
fn default_storage_url() -> String { "https://firebasestorage.googleapis.com/v0".to_string() }
fn default_database_id() -> String { "(default)".to_string() }
fn default_collection() -> String { "users".to_string() }
fn default_timeout_secs() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct ScorerSettings {
    #[serde(default = "default_gemini_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_scorer_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for ScorerSettings {
    fn default() -> Self {
        Self {
            base_url: default_gemini_url(),
            model: default_model(),
            api_key: String::new(),
            timeout_secs: default_scorer_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_gemini_url() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_model() -> String { "gemini-2.0-flash".to_string() }
fn default_scorer_timeout_secs() -> u64 { 60 }
fn default_max_retries() -> u32 { 2 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u64,
    #[serde(default = "default_idle_secs")]
    pub idle_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            idle_secs: default_idle_secs(),
        }
    }
}

fn default_max_sessions() -> u64 { 10_000 }
fn default_idle_secs() -> u64 { 3600 }

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
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with SKILLMATCH)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., SKILLMATCH__SERVER__PORT -> server.port
            .add_source(env_source())
            .build()?;

        let settings = apply_well_known_env(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        settings.try_deserialize()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("SKILLMATCH")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Pick up the unprefixed variables the hosting environment usually sets
fn apply_well_known_env(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(key) = env::var("GEMINI_API_KEY").or_else(|_| env::var("GOOGLE_API_KEY")) {
        builder = builder.set_override("scorer.api_key", key)?;
    }
    if let Ok(host) = env::var("FIRESTORE_EMULATOR_HOST") {
        builder = builder.set_override("store.base_url", format!("http://{}/v1", host))?;
    }
    if let Ok(url) = env::var("REDIS_URL") {
        builder = builder.set_override("cache.redis_url", url)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_store_settings() {
        let store = StoreSettings::default();
        assert_eq!(store.backend, StoreBackend::Firestore);
        assert_eq!(store.database_id, "(default)");
        assert_eq!(store.collection, "users");
        assert_eq!(store.timeout_secs, 30);
    }

    #[test]
    fn test_default_scorer_settings() {
        let scorer = ScorerSettings::default();
        assert_eq!(scorer.model, "gemini-2.0-flash");
        assert_eq!(scorer.max_retries, 2);
    }

    #[test]
    fn test_default_logging() {
        let level = default_log_level();
        let format = default_log_format();
        assert_eq!(level, "info");
        assert_eq!(format, "json");
    }

    #[test]
    fn test_load_from_file() {
        let dir = std::env::temp_dir().join(format!("skillmatch-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.toml");
        std::fs::write(
            &path,
            r#"
[server]
host = "127.0.0.1"
port = 9000

[store]
backend = "memory"
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.store.backend, StoreBackend::Memory);
        assert_eq!(settings.sessions.idle_secs, 3600);
        assert!(settings.cache.redis_url.is_none());

        std::fs::remove_dir_all(&dir).ok();
    }
}
