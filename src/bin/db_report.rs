use std::process::ExitCode;

use stock_constraints_backend::models::DatabaseReport;
use stock_constraints_backend::services::db_report;
use stock_constraints_backend::{cli, AppError, DatabaseConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let logging = match cli::init() {
        Ok(guard) => guard,
        Err(code) => return code,
    };

    let code = cli::run_script("db_report", report()).await;
    logging.shutdown().await;
    code
}

async fn report() -> Result<DatabaseReport, AppError> {
    let config = DatabaseConfig::from_env()?;
    let report = db_report::run(&config).await?;
    db_report::log_report(&report);
    Ok(report)
}
