use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_SERVICE_NAME: &str = "stock-constraints-db";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            loki_enabled: std::env::var("LOKI_ENABLED")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            loki_url: std::env::var("LOKI_URL").ok().filter(|u| !u.trim().is_empty()),
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string()),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            log_level: std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info".to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.loki_enabled && self.loki_url.is_none() {
            return Err("LOKI_ENABLED is true but LOKI_URL is not set".to_string());
        }
        Ok(())
    }
}

/// Keeps the Loki shipper alive for the length of a script run. Scripts
/// exit right after their work finishes, so the last buffered lines are only
/// delivered if `shutdown` is awaited before the process ends.
#[derive(Default)]
pub struct LoggingGuard {
    #[cfg(feature = "loki")]
    loki: Option<(tracing_loki::BackgroundTaskController, JoinHandle<()>)>,
    #[cfg(not(feature = "loki"))]
    _shipper: Option<JoinHandle<()>>,
}

impl LoggingGuard {
    pub fn ships_to_loki(&self) -> bool {
        #[cfg(feature = "loki")]
        {
            self.loki.is_some()
        }
        #[cfg(not(feature = "loki"))]
        {
            false
        }
    }

    /// Flush pending log lines and stop the shipper. No-op for console logging.
    pub async fn shutdown(self) {
        #[cfg(feature = "loki")]
        if let Some((controller, handle)) = self.loki {
            controller.shutdown().await;
            if let Err(e) = handle.await {
                eprintln!("Loki log shipper ended abnormally: {}", e);
            }
        }
    }
}

pub fn init_logging(config: LoggingConfig) -> anyhow::Result<LoggingGuard> {
    config.validate().map_err(anyhow::Error::msg)?;

    #[cfg(feature = "loki")]
    if config.loki_enabled {
        if let Some(loki_url) = config.loki_url.clone() {
            return init_with_loki(&config, &loki_url);
        }
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()?;

    Ok(LoggingGuard::default())
}

#[cfg(feature = "loki")]
fn init_with_loki(config: &LoggingConfig, loki_url: &str) -> anyhow::Result<LoggingGuard> {
    let url = url::Url::parse(loki_url)?;

    let (loki_layer, controller, task) = tracing_loki::builder()
        .label("service", &config.service_name)?
        .label("environment", &config.environment)?
        .build_controller_url(url)?;

    let handle = tokio::spawn(task);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(loki_layer)
        .try_init()?;

    tracing::info!("✅ Shipping logs for {} to Loki at {}", config.service_name, loki_url);

    Ok(LoggingGuard {
        loki: Some((controller, handle)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(loki_enabled: bool, loki_url: Option<&str>) -> LoggingConfig {
        LoggingConfig {
            loki_enabled,
            loki_url: loki_url.map(str::to_string),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            environment: "test".to_string(),
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_loki_requires_url() {
        assert!(config(true, None).validate().is_err());
        assert!(config(true, Some("http://localhost:3100")).validate().is_ok());
    }

    #[test]
    fn test_console_only_needs_nothing() {
        assert!(config(false, None).validate().is_ok());
    }

    #[tokio::test]
    async fn test_console_guard_shuts_down_immediately() {
        let guard = LoggingGuard::default();
        assert!(!guard.ships_to_loki());
        guard.shutdown().await;
    }
}
