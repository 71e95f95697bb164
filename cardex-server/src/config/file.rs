//! TOML file configuration structures.
//!
//! These structs directly map to the `cardex-config.toml` file format.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub identity: IdentityConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<NotificationsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listings: Option<ListingsConfig>,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

/// Admin (arbiter) configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    /// The admin secret. If this is plaintext (doesn't start with `$argon2`),
    /// it will be hashed and the config file will be rewritten.
    pub secret: String,
}

/// Shared secret with the identity gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub secret: String,
}

/// Notification delivery. Without a `webhook_url`, notifications are logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub webhook_url: Option<Url>,
    /// Signs webhook bodies. Required when `webhook_url` is set.
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

/// Listing expiry. Listings never expire when this section is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingsConfig {
    pub ttl_secs: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_sweep_interval() -> u64 {
    300
}

impl FileConfig {
    /// Check if the admin secret is already hashed (argon2 format).
    pub fn is_admin_secret_hashed(&self) -> bool {
        cardex_sdk::config::AdminConfig::is_hashed(&self.admin.secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[admin]
secret = "test-secret"

[identity]
secret = "gateway-secret"

[notifications]
webhook_url = "https://hooks.example.com/cardex"
secret = "hook-secret"
max_attempts = 3

[listings]
ttl_secs = 604800
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.identity.secret, "gateway-secret");
        let notifications = config.notifications.clone().unwrap();
        assert_eq!(
            notifications.webhook_url.unwrap().as_str(),
            "https://hooks.example.com/cardex"
        );
        assert_eq!(notifications.max_attempts, Some(3));
        let listings = config.listings.as_ref().unwrap();
        assert_eq!(listings.ttl_secs, 604_800);
        assert_eq!(listings.sweep_interval_secs, 300);
        assert!(!config.is_admin_secret_hashed());
    }

    #[test]
    fn test_optional_sections_default() {
        let toml_str = r#"
[admin]
secret = "$argon2id$v=19$m=19456,t=2,p=1$abc123"

[identity]
secret = "gateway-secret"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, default_listen_addr());
        assert!(config.notifications.is_none());
        assert!(config.listings.is_none());
        assert!(config.is_admin_secret_hashed());
    }

    #[test]
    fn test_rewrite_keeps_absent_sections_absent() {
        let config = FileConfig {
            server: ServerConfig::default(),
            admin: AdminConfig {
                secret: "s".to_string(),
            },
            identity: IdentityConfig {
                secret: "i".to_string(),
            },
            notifications: None,
            listings: None,
        };
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(!rendered.contains("[notifications]"));
        assert!(!rendered.contains("[listings]"));
        let parsed: FileConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.admin.secret, "s");
    }
}
