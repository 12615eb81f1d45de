use sqlx::PgConnection;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::db::{catalog_queries, stock_price_queries, Database};
use crate::errors::AppError;
use crate::models::DatabaseReport;
use crate::services::schema_provisioner::STOCK_PRICES;

/// Share of heap block requests served from the buffer cache.
/// None when the server has not touched any user table yet.
pub fn cache_hit_ratio(blocks_hit: i64, blocks_read: i64) -> Option<f64> {
    let total = blocks_hit.checked_add(blocks_read)?;
    if total <= 0 {
        return None;
    }
    Some(blocks_hit as f64 / total as f64)
}

pub async fn collect(conn: &mut PgConnection) -> Result<DatabaseReport, AppError> {
    let (stock_price_rows, latest_update) =
        if catalog_queries::table_exists(&mut *conn, STOCK_PRICES.table).await? {
            (
                Some(stock_price_queries::count(&mut *conn).await?),
                stock_price_queries::latest_update(&mut *conn).await?,
            )
        } else {
            warn!("Table {} has not been provisioned", STOCK_PRICES.table);
            (None, None)
        };

    let (hit, read) = catalog_queries::table_io_totals(&mut *conn).await?;

    Ok(DatabaseReport {
        stock_price_rows,
        latest_update,
        cache_hit_ratio: cache_hit_ratio(hit, read),
    })
}

pub fn log_report(report: &DatabaseReport) {
    match report.stock_price_rows {
        Some(rows) => info!("📈 {}: {} rows", STOCK_PRICES.table, rows),
        None => info!("📈 {}: not provisioned", STOCK_PRICES.table),
    }

    match report.latest_update {
        Some(ts) => info!("🕒 Latest snapshot update: {}", ts.to_rfc3339()),
        None => info!("🕒 Latest snapshot update: never"),
    }

    match report.cache_hit_ratio {
        Some(ratio) => info!("💾 Cache hit ratio: {:.2}%", ratio * 100.0),
        None => info!("💾 Cache hit ratio: no table I/O recorded"),
    }
}

pub async fn run(config: &DatabaseConfig) -> Result<DatabaseReport, AppError> {
    let db = Database::connect(config).await?;

    let result = async {
        let mut conn = db.acquire().await?;
        collect(&mut conn).await
    }
    .await;

    db.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_of_hits() {
        assert_eq!(cache_hit_ratio(99, 1), Some(0.99));
        assert_eq!(cache_hit_ratio(0, 50), Some(0.0));
        assert_eq!(cache_hit_ratio(50, 0), Some(1.0));
    }

    #[test]
    fn test_no_io_has_no_ratio() {
        assert_eq!(cache_hit_ratio(0, 0), None);
    }

    #[test]
    fn test_overflow_has_no_ratio() {
        assert_eq!(cache_hit_ratio(i64::MAX, 1), None);
    }
}
