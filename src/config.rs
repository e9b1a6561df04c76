/// Configuration management for the MedInventory client
use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub expiry: ExpiryConfig,
    pub credentials: Option<Credentials>,
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// Session persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub directory: PathBuf,
}

/// Expiry tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiryConfig {
    pub poll_interval_secs: u64,
}

/// Login credentials for the headless watcher
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("remember_me", &self.remember_me)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of the human-readable format
    pub json: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            user_agent: format!("medinventory/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
        }
    }
}

impl ApiConfig {
    /// Build config for a specific base URL with default timeouts
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ExpiryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ClientResult<Self> {
        dotenv::dotenv().ok();

        let base_url = env::var("MEDINV_API_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();
        let timeout_secs = env::var("MEDINV_API_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ClientError::Config("Invalid API timeout".to_string()))?;
        let user_agent = env::var("MEDINV_USER_AGENT")
            .unwrap_or_else(|_| format!("medinventory/{}", env!("CARGO_PKG_VERSION")));

        let directory = env::var("MEDINV_STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/session"));

        let poll_interval_secs = env::var("MEDINV_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ClientError::Config("Invalid poll interval".to_string()))?;

        // Watcher logs in only when both are present
        let credentials = match (env::var("MEDINV_EMAIL"), env::var("MEDINV_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(Credentials {
                email,
                password,
                remember_me: env::var("MEDINV_REMEMBER_ME")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()
                    .unwrap_or(false),
            }),
            _ => None,
        };

        let level = env::var("RUST_LOG").unwrap_or_else(|_| "medinventory=debug".to_string());
        let json = env::var("MEDINV_LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ClientConfig {
            api: ApiConfig {
                base_url,
                timeout_secs,
                user_agent,
            },
            storage: StorageConfig { directory },
            expiry: ExpiryConfig { poll_interval_secs },
            credentials,
            logging: LoggingConfig { level, json },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ClientResult<()> {
        if self.api.base_url.is_empty() {
            return Err(ClientError::Config("API base URL cannot be empty".to_string()));
        }

        if !(self.api.base_url.starts_with("http://") || self.api.base_url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "API base URL must be http(s): {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(ClientError::Config("API timeout must be positive".to_string()));
        }

        if self.expiry.poll_interval_secs == 0 {
            return Err(ClientError::Config("Poll interval must be positive".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClientConfig {
        ClientConfig {
            api: ApiConfig::default(),
            storage: StorageConfig {
                directory: PathBuf::from("/tmp/medinv"),
            },
            expiry: ExpiryConfig::default(),
            credentials: None,
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = sample();
        assert!(config.validate().is_ok());
        assert_eq!(config.expiry.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let mut config = sample();
        config.api.base_url = "localhost:8000".to_string();
        assert!(matches!(config.validate(), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let mut config = sample();
        config.expiry.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            email: "nurse@example.org".to_string(),
            password: "hunter22".to_string(),
            remember_me: true,
        };
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("nurse@example.org"));
        assert!(!rendered.contains("hunter22"));
    }
}
