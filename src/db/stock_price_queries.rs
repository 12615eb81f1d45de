use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use crate::models::{NewStockPrice, StockPriceSnapshot};

/// Insert a snapshot or overwrite the existing row for its symbol in one
/// statement. Returns true when a new row was created.
pub async fn upsert(conn: &mut PgConnection, item: &NewStockPrice) -> Result<bool, sqlx::Error> {
    // xmax is 0 only for a tuple this statement inserted
    sqlx::query_scalar::<_, bool>(
        r#"
        INSERT INTO stock_prices (symbol, price, change_amount, change_percent, volume, market_cap)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (symbol) DO UPDATE SET
            price = EXCLUDED.price,
            change_amount = EXCLUDED.change_amount,
            change_percent = EXCLUDED.change_percent,
            volume = EXCLUDED.volume,
            market_cap = EXCLUDED.market_cap,
            last_updated = CURRENT_TIMESTAMP
        RETURNING (xmax = 0) AS inserted
        "#,
    )
    .bind(&item.symbol)
    .bind(&item.price)
    .bind(&item.change_amount)
    .bind(&item.change_percent)
    .bind(item.volume)
    .bind(item.market_cap)
    .fetch_one(conn)
    .await
}

pub async fn fetch_by_symbol(
    conn: &mut PgConnection,
    symbol: &str,
) -> Result<Option<StockPriceSnapshot>, sqlx::Error> {
    sqlx::query_as::<_, StockPriceSnapshot>(
        r#"
        SELECT id, symbol, price, change_amount, change_percent, volume, market_cap,
               last_updated, created_at
        FROM stock_prices
        WHERE symbol = $1
        "#,
    )
    .bind(symbol)
    .fetch_optional(conn)
    .await
}

pub async fn fetch_all(conn: &mut PgConnection) -> Result<Vec<StockPriceSnapshot>, sqlx::Error> {
    sqlx::query_as::<_, StockPriceSnapshot>(
        r#"
        SELECT id, symbol, price, change_amount, change_percent, volume, market_cap,
               last_updated, created_at
        FROM stock_prices
        ORDER BY symbol ASC
        "#,
    )
    .fetch_all(conn)
    .await
}

pub async fn count(conn: &mut PgConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stock_prices")
        .fetch_one(conn)
        .await
}

pub async fn latest_update(conn: &mut PgConnection) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<DateTime<Utc>>>("SELECT MAX(last_updated) FROM stock_prices")
        .fetch_one(conn)
        .await
}
