use std::str::FromStr;
use std::time::Duration;

use regex::Regex;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::errors::AppError;

/// Hosting providers whose managed Postgres instances refuse plaintext connections.
const MANAGED_HOST_SUFFIXES: &[&str] = &[
    "render.com",
    "neon.tech",
    "supabase.co",
    "supabase.com",
    "amazonaws.com",
    "azure.com",
];

const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslPreference {
    /// Require TLS only for known managed hosts.
    Auto,
    Require,
    Disable,
}

impl FromStr for SslPreference {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "auto" => Ok(SslPreference::Auto),
            "require" | "true" => Ok(SslPreference::Require),
            "disable" | "false" => Ok(SslPreference::Disable),
            other => Err(AppError::Config(format!(
                "Invalid DATABASE_SSL: {}. Must be 'auto', 'require', or 'disable'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub ssl: SslPreference,
    pub search_path: Option<String>,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ssl: SslPreference::Auto,
            search_path: None,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }

    pub fn with_search_path(mut self, schema: impl Into<String>) -> Self {
        self.search_path = Some(schema.into());
        self
    }

    pub fn from_env() -> Result<Self, AppError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL is not set".to_string()))?;

        let ssl = match std::env::var("DATABASE_SSL") {
            Ok(value) => value.parse()?,
            Err(_) => SslPreference::Auto,
        };

        let search_path = std::env::var("DATABASE_SCHEMA")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let acquire_timeout = match std::env::var("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            Ok(value) => value.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
                AppError::Config(format!("Invalid DATABASE_ACQUIRE_TIMEOUT_SECS: {}", value))
            })?,
            Err(_) => Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        };

        let config = Self {
            database_url,
            ssl,
            search_path,
            acquire_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.database_url.trim().is_empty() {
            return Err(AppError::Config("DATABASE_URL is empty".to_string()));
        }

        if let Some(schema) = &self.search_path {
            let identifier = Regex::new(r"^[a-z_][a-z0-9_]{0,62}$")
                .map_err(|e| AppError::Config(e.to_string()))?;
            if !identifier.is_match(schema) {
                return Err(AppError::Config(format!(
                    "DATABASE_SCHEMA must be a lowercase identifier, got '{}'",
                    schema
                )));
            }
        }

        Ok(())
    }

    /// Whether the connection must be encrypted, after applying the
    /// preference and any `sslmode` already present in the URL.
    pub fn requires_tls(&self) -> bool {
        match self.ssl {
            SslPreference::Require => true,
            SslPreference::Disable => false,
            SslPreference::Auto => {
                !url_declares_sslmode(&self.database_url)
                    && is_managed_host(&self.database_url)
            }
        }
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions, AppError> {
        self.validate()?;

        let mut options = PgConnectOptions::from_str(&self.database_url)
            .map_err(|e| AppError::Config(format!("Invalid DATABASE_URL: {}", e)))?;

        match self.ssl {
            SslPreference::Disable => options = options.ssl_mode(PgSslMode::Disable),
            _ if self.requires_tls() => options = options.ssl_mode(PgSslMode::Require),
            _ => {}
        }

        if let Some(schema) = &self.search_path {
            options = options.options([("search_path", schema.as_str())]);
        }

        Ok(options)
    }
}

fn url_declares_sslmode(database_url: &str) -> bool {
    url::Url::parse(database_url)
        .map(|u| u.query_pairs().any(|(k, _)| k == "sslmode"))
        .unwrap_or(false)
}

pub fn is_managed_host(database_url: &str) -> bool {
    let host = match url::Url::parse(database_url) {
        Ok(u) => match u.host_str() {
            Some(h) => h.to_lowercase(),
            None => return false,
        },
        Err(_) => return false,
    };

    MANAGED_HOST_SUFFIXES
        .iter()
        .any(|suffix| host == *suffix || host.ends_with(&format!(".{}", suffix)))
}
