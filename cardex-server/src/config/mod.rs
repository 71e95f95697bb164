//! Configuration module for cardex-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables. Also handles admin secret hashing.

pub mod file;
pub mod runtime;

use crate::config::file::{FileConfig, ListingsConfig, NotificationsConfig};
use crate::config::runtime::{
    AdminConfig, IdentityConfig, ListingExpiryConfig, NotificationConfig, ServerConfig,
    WebhookTarget,
};
use cardex_core::config::DEFAULT_MAX_ATTEMPTS;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("password hashing error: {0}")]
    HashError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Loaded configuration result containing all parts.
#[derive(Debug)]
pub struct LoadedConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub identity: IdentityConfig,
    pub notifications: NotificationConfig,
    /// `None` disables the listing expiry sweep.
    pub listings: Option<ListingExpiryConfig>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Hash the admin secret if it's plaintext (and rewrite the file)
    /// 5. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        let mut file_config: FileConfig = toml::from_str(&config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;

        let secret_hash = if file_config.is_admin_secret_hashed() {
            file_config.admin.secret.clone()
        } else {
            let hash = AdminConfig::hash_secret(&file_config.admin.secret)
                .map_err(|e| ConfigError::HashError(e.to_string()))?;
            file_config.admin.secret = hash.clone();
            self.rewrite_config(&file_config)?;
            tracing::info!("Admin secret hashed and config file updated");
            hash
        };

        Ok(build_loaded_config(file_config, secret_hash))
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }

    fn rewrite_config(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(config)?;

        // Write atomically: write to temp file, then rename
        let temp_path = self.config_path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_string)?;
        std::fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.admin.secret.is_empty() {
        return Err(ConfigError::ValidationError(
            "admin secret must not be empty".to_string(),
        ));
    }
    if config.identity.secret.is_empty() {
        return Err(ConfigError::ValidationError(
            "identity secret must not be empty".to_string(),
        ));
    }
    if let Some(notifications) = &config.notifications {
        if notifications.webhook_url.is_some()
            && notifications.secret.as_deref().is_none_or(str::is_empty)
        {
            return Err(ConfigError::ValidationError(
                "notifications.secret is required when webhook_url is set".to_string(),
            ));
        }
        if notifications.max_attempts == Some(0) {
            return Err(ConfigError::ValidationError(
                "notifications.max_attempts must be at least 1".to_string(),
            ));
        }
    }
    if let Some(listings) = &config.listings {
        if listings.ttl_secs == 0 || listings.sweep_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "listings.ttl_secs and listings.sweep_interval_secs must be positive".to_string(),
            ));
        }
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig, secret_hash: String) -> LoadedConfig {
    LoadedConfig {
        server: ServerConfig {
            listen: file_config.server.listen,
        },
        admin: AdminConfig::new(secret_hash),
        identity: IdentityConfig::new(file_config.identity.secret.into_bytes()),
        notifications: file_config
            .notifications
            .map(convert_notifications)
            .unwrap_or_default(),
        listings: file_config.listings.map(convert_listings),
    }
}

fn convert_notifications(n: NotificationsConfig) -> NotificationConfig {
    let webhook = match (n.webhook_url, n.secret) {
        (Some(url), Some(secret)) => Some(WebhookTarget {
            url,
            secret: secret.into_bytes().into_boxed_slice(),
        }),
        _ => None,
    };
    NotificationConfig {
        webhook,
        max_attempts: n.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
    }
}

fn convert_listings(l: ListingsConfig) -> ListingExpiryConfig {
    ListingExpiryConfig::new(
        Duration::from_secs(l.ttl_secs),
        Duration::from_secs(l.sweep_interval_secs),
    )
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_config(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cardex-config-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    const MINIMAL: &str = r#"
[admin]
secret = "arbiter-pass"

[identity]
secret = "gateway-secret"
"#;

    #[test]
    fn plaintext_admin_secret_is_hashed_and_written_back() {
        let path = write_config("cardex-config.toml", MINIMAL);
        let loader = ConfigLoader::new(&path, None);

        let loaded = loader.load().unwrap();
        assert!(loaded.admin.verify_secret("arbiter-pass"));
        assert!(loaded.listings.is_none());
        assert!(loaded.notifications.webhook.is_none());
        assert_eq!(loaded.notifications.max_attempts, DEFAULT_MAX_ATTEMPTS);

        let rewritten = std::fs::read_to_string(&path).unwrap();
        assert!(rewritten.contains("$argon2"));
        assert!(!rewritten.contains("arbiter-pass"));

        // A second load keeps the existing hash.
        let reloaded = loader.reload().unwrap();
        assert_eq!(reloaded.admin.secret_hash, loaded.admin.secret_hash);
    }

    #[test]
    fn listen_override_wins() {
        let path = write_config("cardex-config.toml", MINIMAL);
        let listen: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        let loaded = ConfigLoader::new(&path, Some(listen)).load().unwrap();
        assert_eq!(loaded.server.listen, listen);
    }

    #[test]
    fn webhook_without_secret_is_rejected() {
        let path = write_config(
            "cardex-config.toml",
            r#"
[admin]
secret = "arbiter-pass"

[identity]
secret = "gateway-secret"

[notifications]
webhook_url = "https://hooks.example.com/cardex"
"#,
        );
        let err = ConfigLoader::new(&path, None).load().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn notification_and_listing_sections_convert() {
        let path = write_config(
            "cardex-config.toml",
            r#"
[admin]
secret = "arbiter-pass"

[identity]
secret = "gateway-secret"

[notifications]
webhook_url = "https://hooks.example.com/cardex"
secret = "hook-secret"
max_attempts = 2

[listings]
ttl_secs = 3600
sweep_interval_secs = 60
"#,
        );
        let loaded = ConfigLoader::new(&path, None).load().unwrap();
        let webhook = loaded.notifications.webhook.unwrap();
        assert_eq!(webhook.url.host_str(), Some("hooks.example.com"));
        assert_eq!(&*webhook.secret, b"hook-secret");
        assert_eq!(loaded.notifications.max_attempts, 2);

        let listings = loaded.listings.unwrap();
        assert_eq!(listings.ttl, Duration::from_secs(3600));
        assert_eq!(listings.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let path = write_config(
            "cardex-config.toml",
            &format!("{MINIMAL}\n[listings]\nttl_secs = 0\n"),
        );
        let err = ConfigLoader::new(&path, None).load().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
