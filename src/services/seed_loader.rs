//! Seed/Reconciliation Loader
//!
//! Upserts a static list of stock price snapshots keyed by symbol. New
//! symbols are inserted; existing ones have every value column overwritten
//! and `last_updated` refreshed. The list comes either from the built-in
//! catalog or from a JSON file named by `SEED_FILE`.

use std::collections::HashSet;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use sqlx::{Connection, PgConnection};
use tracing::{error, info};

use crate::config::DatabaseConfig;
use crate::db::{stock_price_queries, Database};
use crate::errors::AppError;
use crate::models::{NewStockPrice, SeedReport};

// (symbol, price, change_amount, change_percent, volume, market_cap)
const DEFAULT_SNAPSHOTS: &[(&str, &str, &str, &str, i64, i64)] = &[
    ("AAPL", "175.50", "2.30", "1.33", 52_000_000, 2_750_000_000_000),
    ("MSFT", "378.85", "-1.20", "-0.32", 21_000_000, 2_810_000_000_000),
    ("GOOGL", "138.20", "0.85", "0.62", 25_400_000, 1_740_000_000_000),
    ("AMZN", "145.30", "1.75", "1.22", 41_800_000, 1_500_000_000_000),
    ("NVDA", "495.20", "12.40", "2.57", 38_600_000, 1_220_000_000_000),
    ("META", "325.60", "-4.10", "-1.24", 15_900_000, 837_000_000_000),
    ("TSLA", "248.50", "-3.25", "-1.29", 98_700_000, 790_000_000_000),
    ("JPM", "158.40", "0.60", "0.38", 9_200_000, 458_000_000_000),
    ("V", "260.10", "1.15", "0.44", 5_600_000, 535_000_000_000),
    ("JNJ", "160.80", "-0.45", "-0.28", 6_800_000, 387_000_000_000),
];

fn decimal(symbol: &str, field: &str, raw: &str) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(raw)
        .map_err(|e| AppError::Validation(format!("{} for {} is not a decimal ({}): {}", field, symbol, raw, e)))
}

/// The built-in snapshot list.
pub fn default_catalog() -> Result<Vec<NewStockPrice>, AppError> {
    DEFAULT_SNAPSHOTS
        .iter()
        .map(|(symbol, price, change_amount, change_percent, volume, market_cap)| {
            Ok(NewStockPrice {
                symbol: symbol.to_string(),
                price: decimal(symbol, "price", price)?,
                change_amount: decimal(symbol, "change_amount", change_amount)?,
                change_percent: decimal(symbol, "change_percent", change_percent)?,
                volume: *volume,
                market_cap: *market_cap,
            })
        })
        .collect()
}

/// Parse a JSON array of seed tuples.
pub fn parse_seed_file(contents: &str) -> Result<Vec<NewStockPrice>, AppError> {
    let items: Vec<NewStockPrice> = serde_json::from_str(contents)?;
    if items.is_empty() {
        return Err(AppError::Validation("seed file contains no snapshots".to_string()));
    }
    Ok(items)
}

pub async fn load_seed_file(path: &str) -> Result<Vec<NewStockPrice>, AppError> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        error!("Failed to read seed file {}: {}", path, e);
        AppError::Io(e)
    })?;
    parse_seed_file(&contents)
}

/// `SEED_FILE` if set, otherwise the built-in catalog.
pub async fn catalog_from_env() -> Result<Vec<NewStockPrice>, AppError> {
    match std::env::var("SEED_FILE") {
        Ok(path) if !path.trim().is_empty() => {
            info!("📄 Loading seed snapshots from {}", path);
            load_seed_file(path.trim()).await
        }
        _ => default_catalog(),
    }
}

pub fn validate_batch(items: &[NewStockPrice]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for item in items {
        item.validate()?;
        if !seen.insert(item.symbol.as_str()) {
            return Err(AppError::Validation(format!(
                "symbol {} appears more than once in the seed batch",
                item.symbol
            )));
        }
    }
    Ok(())
}

/// Validate `items`, then upsert them all in one transaction.
pub async fn seed(conn: &mut PgConnection, items: &[NewStockPrice]) -> Result<SeedReport, AppError> {
    validate_batch(items)?;

    let mut report = SeedReport::default();
    let mut tx = conn.begin().await?;

    for item in items {
        match stock_price_queries::upsert(&mut *tx, item).await {
            Ok(true) => {
                report.inserted += 1;
                info!("  ➕ {} inserted at {}", item.symbol, item.price);
            }
            Ok(false) => {
                report.updated += 1;
                info!("  🔄 {} updated to {}", item.symbol, item.price);
            }
            Err(e) => {
                error!("❌ Failed to upsert {} (price: {}): {:?}", item.symbol, item.price, e);
                return Err(AppError::Db(e));
            }
        }
    }

    tx.commit().await?;

    report.total_rows = stock_price_queries::count(conn).await?;
    info!(
        "✅ Seeded {} snapshots ({} inserted, {} updated); stock_prices now holds {} rows",
        items.len(),
        report.inserted,
        report.updated,
        report.total_rows
    );
    Ok(report)
}

/// Connect, seed `items`, and release the connection whatever the outcome.
pub async fn run(config: &DatabaseConfig, items: &[NewStockPrice]) -> Result<SeedReport, AppError> {
    let db = Database::connect(config).await?;

    let result = async {
        let mut conn = db.acquire().await?;
        seed(&mut conn, items).await
    }
    .await;

    db.close().await;
    result
}
