use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub quota: QuotaConfig,
    #[serde(default)]
    pub bootstrap: Option<BootstrapConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_rate_limiting: bool,
    pub rate_limit_requests: u32,
    pub rate_limit_window_secs: u64,
    pub default_page_limit: i64,
    pub max_page_limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_minutes: i64,
    /// Shared secret expected in the `jwt-header` header on registration
    pub registration_header: String,
    /// Shared secret expected in the `csrf-header` header when minting CSRF cookies
    pub csrf_header: String,
    pub csrf_secret_key: String,
    pub enforce_csrf: bool,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub enable_audit_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    pub default_signing_quota: i64,
    pub default_certificate_quota: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub username: String,
    pub password: String,
}

impl AppConfig {
    /// Preset for `APP_ENV`, then the optional YAML file named by `SIGNATURE_CONFIG`,
    /// then individual environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let preset = Self::preset(environment);
        let config = match env::var("SIGNATURE_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_yaml_file(path.trim())?,
            _ => preset,
        };

        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn preset(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid("JWT secret must not be empty".to_string()));
        }
        if self.security.jwt_expiry_minutes <= 0 {
            return Err(ConfigError::Invalid("JWT expiry must be positive".to_string()));
        }
        if self.environment == Environment::Production
            && (self.security.registration_header.is_empty()
                || self.security.csrf_header.is_empty()
                || self.security.csrf_secret_key.is_empty())
        {
            return Err(ConfigError::Invalid(
                "registration, CSRF header and CSRF signing secrets are required in production".to_string(),
            ));
        }
        if self.database.backend == StoreBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Invalid("DATABASE_URL is required for the postgres backend".to_string()));
        }
        if self.api.max_page_limit < 0 {
            return Err(ConfigError::Invalid("max_page_limit must not be negative".to_string()));
        }
        if self.api.default_page_limit <= 0 || self.api.max_page_limit < self.api.default_page_limit {
            return Err(ConfigError::Invalid("page limits must satisfy 0 < default <= max".to_string()));
        }
        if self.quota.default_signing_quota < 0 || self.quota.default_certificate_quota < 0 {
            return Err(ConfigError::Invalid("default quotas must not be negative".to_string()));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("SIGNATURE_API_HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("SIGNATURE_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_BACKEND") {
            match v.as_str() {
                "memory" => self.database.backend = StoreBackend::Memory,
                "postgres" => self.database.backend = StoreBackend::Postgres,
                other => tracing::warn!("Ignoring unknown DATABASE_BACKEND '{}'", other),
            }
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_RATE_LIMITING") {
            self.api.enable_rate_limiting = v.parse().unwrap_or(self.api.enable_rate_limiting);
        }
        if let Ok(v) = env::var("RATE_PER_TIME") {
            self.api.rate_limit_requests = v.parse().unwrap_or(self.api.rate_limit_requests);
        }
        if let Ok(v) = env::var("RATE_AWAIT") {
            self.api.rate_limit_window_secs = v.parse().unwrap_or(self.api.rate_limit_window_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("EXPIRES_TOKEN") {
            self.security.jwt_expiry_minutes = v.parse().unwrap_or(self.security.jwt_expiry_minutes);
        }
        if let Ok(v) = env::var("JWT_HEADER") {
            self.security.registration_header = v;
        }
        if let Ok(v) = env::var("CSRF_HEADER") {
            self.security.csrf_header = v;
        }
        if let Ok(v) = env::var("CSRF_SECRET_KEY") {
            self.security.csrf_secret_key = v;
        }
        if let Ok(v) = env::var("SECURITY_ENFORCE_CSRF") {
            self.security.enforce_csrf = v.parse().unwrap_or(self.security.enforce_csrf);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_AUDIT_LOGGING") {
            self.security.enable_audit_logging = v.parse().unwrap_or(self.security.enable_audit_logging);
        }

        // Quota overrides
        if let Ok(v) = env::var("QUOTA_DEFAULT_SIGNING") {
            self.quota.default_signing_quota = v.parse().unwrap_or(self.quota.default_signing_quota);
        }
        if let Ok(v) = env::var("QUOTA_DEFAULT_CERTIFICATE") {
            self.quota.default_certificate_quota = v.parse().unwrap_or(self.quota.default_certificate_quota);
        }

        // Bootstrap Super Admin
        if let (Ok(username), Ok(password)) = (env::var("BOOTSTRAP_ADMIN_USERNAME"), env::var("BOOTSTRAP_ADMIN_PASSWORD")) {
            self.bootstrap = Some(BootstrapConfig { username, password });
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                enable_rate_limiting: false,
                rate_limit_requests: 1000,
                rate_limit_window_secs: 60,
                default_page_limit: 10,
                max_page_limit: 1000,
            },
            security: SecurityConfig {
                jwt_secret: "development-only-jwt-secret".to_string(),
                jwt_expiry_minutes: 60,
                registration_header: "development-registration".to_string(),
                csrf_header: "development-csrf".to_string(),
                csrf_secret_key: "development-only-csrf-key".to_string(),
                enforce_csrf: false,
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                enable_audit_logging: true,
            },
            quota: QuotaConfig {
                default_signing_quota: 100,
                default_certificate_quota: 100,
            },
            bootstrap: None,
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                enable_rate_limiting: true,
                rate_limit_requests: 100,
                rate_limit_window_secs: 60,
                default_page_limit: 10,
                max_page_limit: 500,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_minutes: 60,
                registration_header: String::new(),
                csrf_header: String::new(),
                csrf_secret_key: String::new(),
                enforce_csrf: true,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                enable_audit_logging: true,
            },
            quota: QuotaConfig {
                default_signing_quota: 100,
                default_certificate_quota: 100,
            },
            bootstrap: None,
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                enable_rate_limiting: true,
                rate_limit_requests: 3,
                rate_limit_window_secs: 5,
                default_page_limit: 10,
                max_page_limit: 100,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_minutes: 60,
                registration_header: String::new(),
                csrf_header: String::new(),
                csrf_secret_key: String::new(),
                enforce_csrf: true,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                enable_audit_logging: true,
            },
            quota: QuotaConfig {
                default_signing_quota: 100,
                default_certificate_quota: 100,
            },
            bootstrap: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert!(!config.api.enable_rate_limiting);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_production_config_requires_secrets() {
        let config = AppConfig::production();
        assert!(config.api.enable_rate_limiting);
        assert_eq!(config.api.rate_limit_requests, 3);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_postgres_backend_requires_url() {
        let mut config = AppConfig::development();
        config.database.backend = StoreBackend::Postgres;
        assert!(config.validate().is_err());
        config.database.url = Some("postgres://localhost/signature".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_page_limits_rejected() {
        let mut config = AppConfig::development();
        config.api.max_page_limit = -1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.api.max_page_limit = 1000;
        config.api.default_page_limit = -10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip_of_preset() {
        let yaml = serde_yaml::to_string(&AppConfig::staging()).unwrap();
        let parsed: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.environment, Environment::Staging);
        assert_eq!(parsed.api.max_page_limit, 500);
    }
}
