use std::process::ExitCode;

use stock_constraints_backend::models::SeedReport;
use stock_constraints_backend::services::seed_loader;
use stock_constraints_backend::{cli, AppError, DatabaseConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let logging = match cli::init() {
        Ok(guard) => guard,
        Err(code) => return code,
    };

    let code = cli::run_script("seed_stock_prices", seed()).await;
    logging.shutdown().await;
    code
}

async fn seed() -> Result<SeedReport, AppError> {
    let config = DatabaseConfig::from_env()?;
    let items = seed_loader::catalog_from_env().await?;
    seed_loader::run(&config, &items).await
}
