use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Process-wide configuration, read once at startup and shared immutably
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://...` or `memory://`
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("enable_cors", &self.enable_cors)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source; `from_env` passes the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(&lookup);

        if config.database.url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        Ok(config)
    }

    fn with_overrides(mut self, lookup: &impl Fn(&str) -> Option<String>) -> Self {
        // Store overrides
        if let Some(v) = lookup("DATABASE_URL").or_else(|| lookup("MONGO_URL")) {
            self.database.url = Some(v);
        }

        // API overrides
        if let Some(v) = lookup("VOYA_API_HOST") {
            self.api.host = v;
        }
        if let Some(v) = lookup("VOYA_API_PORT").or_else(|| lookup("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }

        // Security overrides
        if let Some(v) = lookup("VOYA_AUTH_TOKEN") {
            self.security.auth_token = Some(v).filter(|t| !t.is_empty());
        }
        if let Some(v) = lookup("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: Some("memory://".to_string()),
            },
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            security: SecurityConfig {
                auth_token: None,
                enable_cors: true,
                cors_origins: vec!["*".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig { url: None },
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            security: SecurityConfig {
                auth_token: None,
                enable_cors: true,
                cors_origins: vec![],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig { url: None },
            api: ApiConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            security: SecurityConfig {
                auth_token: None,
                enable_cors: false,
                cors_origins: vec![],
            },
        }
    }

    /// The configured store URL. Always present once construction succeeded.
    pub fn store_url(&self) -> &str {
        self.database.url.as_deref().unwrap_or("memory://")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
