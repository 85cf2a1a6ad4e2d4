//! Storefront configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use storefront_cache::{CookieOptions, SameSite};
use storefront_commerce::RegionId;
use storefront_data::{FetchClient, RetryPolicy};
use thiserror::Error;

use crate::backend::{MedusaBackend, PUBLISHABLE_KEY_HEADER};
use crate::messages::Locale;

/// Environment variables that override file settings.
pub const ENV_BACKEND_URL: &str = "MEDUSA_BACKEND_URL";
pub const ENV_PUBLISHABLE_KEY: &str = "MEDUSA_PUBLISHABLE_KEY";
pub const ENV_REGION: &str = "MEDUSA_REGION";
pub const ENV_LOCALE: &str = "STOREFRONT_LOCALE";

/// Browsers cap cookie lifetimes at roughly 400 days.
pub const MAX_COOKIE_AGE_DAYS: i64 = 400;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Failed to write config file {path}: {message}")]
    Write { path: String, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorefrontConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub cookies: CookieConfig,
}

impl StorefrontConfig {
    /// Load config from a TOML or JSON file (chosen by extension).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;

        let parsed = if is_json(path) {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            toml::from_str(&content).map_err(|e| e.to_string())
        };
        parsed.map_err(|message| ConfigError::Parse {
            path: display,
            message,
        })
    }

    /// Save config to a file, in the format its extension names.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = if is_json(path) {
            serde_json::to_string_pretty(self).map_err(|e| e.to_string())
        } else {
            toml::to_string_pretty(self).map_err(|e| e.to_string())
        }
        .map_err(|message| ConfigError::Write {
            path: display.clone(),
            message,
        })?;

        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: display,
            message: e.to_string(),
        })
    }

    /// Apply overrides from the process environment.
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`; blank values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_BACKEND_URL) {
            self.backend.url = url;
        }
        if let Some(key) = get(ENV_PUBLISHABLE_KEY) {
            self.backend.publishable_key = Some(key);
        }
        if let Some(region) = get(ENV_REGION) {
            self.store.region_id = region;
        }
        if let Some(locale) = get(ENV_LOCALE) {
            match locale.parse() {
                Ok(locale) => self.store.locale = locale,
                Err(e) => tracing::warn!(error = %e, "ignoring {}", ENV_LOCALE),
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.backend.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "backend.url must be an http(s) URL, got {:?}",
                self.backend.url
            )));
        }
        if self.store.region_id.trim().is_empty() {
            return Err(ConfigError::Invalid("store.region_id is required".into()));
        }
        if self.cookies.cart_max_age_days <= 0 {
            return Err(ConfigError::Invalid(
                "cookies.cart_max_age_days must be positive".into(),
            ));
        }
        if self.cookies.cart_max_age_days > MAX_COOKIE_AGE_DAYS {
            return Err(ConfigError::Invalid(format!(
                "cookies.cart_max_age_days must be at most {}, got {}",
                MAX_COOKIE_AGE_DAYS, self.cookies.cart_max_age_days
            )));
        }
        Ok(())
    }

    pub fn region_id(&self) -> RegionId {
        RegionId::new(self.store.region_id.trim())
    }

    /// HTTP client for the configured backend.
    pub fn fetch_client(&self) -> FetchClient {
        let mut client = FetchClient::new()
            .with_base_url(self.backend.url.trim())
            .with_timeout(Duration::from_secs(self.backend.timeout_secs))
            .with_retry(RetryPolicy::new(self.backend.max_retries));
        if let Some(key) = &self.backend.publishable_key {
            client = client.with_default_header(PUBLISHABLE_KEY_HEADER, key.clone());
        }
        client
    }

    pub fn medusa_backend(&self) -> MedusaBackend {
        MedusaBackend::from_client(self.fetch_client())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Commerce backend connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Store API base URL.
    #[serde(default = "default_url")]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publishable_key: Option<String>,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for idempotent reads. Mutations are never retried.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            publishable_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Store-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Region new carts are created in; retrieved carts are moved here.
    #[serde(default = "default_region")]
    pub region_id: String,

    #[serde(default)]
    pub locale: Locale,
}

fn default_region() -> String {
    "reg_pl".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            region_id: default_region(),
            locale: Locale::default(),
        }
    }
}

/// Persisted identifier slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    #[serde(default = "default_cart_cookie")]
    pub cart_cookie: String,

    #[serde(default = "default_cart_max_age_days")]
    pub cart_max_age_days: i64,

    #[serde(default = "default_auth_cookie")]
    pub auth_cookie: String,
}

fn default_cart_cookie() -> String {
    "cart_id".to_string()
}

fn default_cart_max_age_days() -> i64 {
    30
}

fn default_auth_cookie() -> String {
    "medusa_jwt".to_string()
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            cart_cookie: default_cart_cookie(),
            cart_max_age_days: default_cart_max_age_days(),
            auth_cookie: default_auth_cookie(),
        }
    }
}

impl CookieConfig {
    /// Cart id cookie: secure, same-site strict.
    pub fn cart_options(&self) -> CookieOptions {
        CookieOptions::days(self.cart_max_age_days)
            .with_secure(true)
            .with_same_site(SameSite::Strict)
    }

    /// Auth token cookie: secure, same-site lax.
    pub fn auth_options(&self) -> CookieOptions {
        CookieOptions::days(7)
            .with_secure(true)
            .with_same_site(SameSite::Lax)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::default();
        assert_eq!(config.backend.url, "http://localhost:9000");
        assert_eq!(config.store.region_id, "reg_pl");
        assert_eq!(config.store.locale, Locale::Pl);
        assert_eq!(config.cookies.cart_cookie, "cart_id");
        assert_eq!(config.cookies.cart_max_age_days, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_toml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("storefront.toml");
        std::fs::write(
            &toml_path,
            "[backend]\nurl = \"https://api.swiece.pl\"\npublishable_key = \"pk_live\"\n\n[store]\nregion_id = \"reg_eu\"\nlocale = \"en\"\n",
        )
        .unwrap();
        let config = StorefrontConfig::load(&toml_path).unwrap();
        assert_eq!(config.backend.url, "https://api.swiece.pl");
        assert_eq!(config.backend.publishable_key.as_deref(), Some("pk_live"));
        assert_eq!(config.backend.max_retries, 3);
        assert_eq!(config.store.locale, Locale::En);

        let json_path = dir.path().join("storefront.json");
        std::fs::write(&json_path, r#"{"store": {"region_id": "reg_cz"}}"#).unwrap();
        let config = StorefrontConfig::load(&json_path).unwrap();
        assert_eq!(config.store.region_id, "reg_cz");
        assert_eq!(config.cookies.auth_cookie, "medusa_jwt");
    }

    #[test]
    fn test_save_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storefront.toml");
        let mut config = StorefrontConfig::default();
        config.backend.publishable_key = Some("pk_test".into());
        config.save(&path).unwrap();

        let loaded = StorefrontConfig::load(&path).unwrap();
        assert_eq!(loaded.backend.publishable_key.as_deref(), Some("pk_test"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[backend\nurl = ").unwrap();
        let err = StorefrontConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_BACKEND_URL, "https://shop.example.com"),
            (ENV_REGION, "reg_de"),
            (ENV_LOCALE, "en-US"),
            (ENV_PUBLISHABLE_KEY, "  "),
        ]);
        let config = StorefrontConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.backend.url, "https://shop.example.com");
        assert_eq!(config.store.region_id, "reg_de");
        assert_eq!(config.store.locale, Locale::En);
        assert_eq!(config.backend.publishable_key, None);
    }

    #[test]
    fn test_validation() {
        let mut config = StorefrontConfig::default();
        config.backend.url = "localhost:9000".into();
        assert!(config.validate().is_err());

        let mut config = StorefrontConfig::default();
        config.store.region_id = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cart_max_age_bounds() {
        let mut config = StorefrontConfig::default();
        config.cookies.cart_max_age_days = 0;
        assert!(config.validate().is_err());

        config.cookies.cart_max_age_days = 100_000_000;
        assert!(config.validate().is_err());

        config.cookies.cart_max_age_days = MAX_COOKIE_AGE_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cart_cookie_options() {
        let options = CookieConfig::default().cart_options();
        assert!(options.secure);
        assert_eq!(options.same_site, SameSite::Strict);
        assert_eq!(options.max_age, chrono::Duration::days(30));
    }
}
