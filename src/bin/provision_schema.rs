use std::process::ExitCode;

use stock_constraints_backend::models::SchemaStatus;
use stock_constraints_backend::services::schema_provisioner;
use stock_constraints_backend::{cli, AppError, DatabaseConfig};
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    let logging = match cli::init() {
        Ok(guard) => guard,
        Err(code) => return code,
    };

    let code = cli::run_script("provision_schema", provision()).await;
    logging.shutdown().await;
    code
}

async fn provision() -> Result<SchemaStatus, AppError> {
    let config = DatabaseConfig::from_env()?;
    let status = schema_provisioner::run(&config).await?;

    info!("Applied {} schema steps to {}", status.steps_applied, status.table);
    if let Some(trigger) = &status.trigger {
        info!("Trigger {} keeps last_updated current", trigger);
    }
    Ok(status)
}
