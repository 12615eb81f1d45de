//! Shared bootstrap for the standalone scripts in `src/bin`.

use std::future::Future;
use std::process::ExitCode;

use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::logging::{init_logging, LoggingConfig, LoggingGuard};

/// Load `.env` and install the tracing subscriber. The returned guard must
/// be shut down before the process exits.
pub fn init() -> Result<LoggingGuard, ExitCode> {
    dotenvy::dotenv().ok();

    init_logging(LoggingConfig::from_env()).map_err(|e| {
        eprintln!("Failed to initialize logging: {}", e);
        ExitCode::from(2)
    })
}

/// Drive a script to completion inside a span tagged with a fresh run id,
/// turning its outcome into the process exit status.
pub async fn run_script<F, T>(script: &'static str, task: F) -> ExitCode
where
    F: Future<Output = Result<T, AppError>>,
{
    let run_id = Uuid::new_v4();

    async move {
        info!("🚀 Starting {}", script);
        match task.await {
            Ok(_) => {
                info!("✅ {} finished", script);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("❌ {} failed: {}", script, e);
                error!("Error details: {:?}", e);
                ExitCode::from(e.exit_code())
            }
        }
    }
    .instrument(info_span!("script", script, %run_id))
    .await
}
