//! Schema Provisioner
//!
//! Ensures the `stock_prices` table and its supporting objects exist. Every
//! statement is written so it can be re-run against an already provisioned
//! database without error and without creating duplicates:
//!
//! - tables and indexes use `IF NOT EXISTS`
//! - the trigger function uses `CREATE OR REPLACE`
//! - the trigger is dropped (if present) and recreated
//!
//! All steps of a run execute inside one transaction, so a failing step
//! leaves the database exactly as it was before the run. The transaction
//! first takes a transaction-scoped advisory lock, so overlapping runs take
//! turns instead of racing on the catalog or deadlocking on table locks.
//! After the steps the schema catalog is queried to confirm each expected
//! object is present.

use sqlx::{Connection, PgConnection};
use tracing::{error, info, warn};

use crate::config::DatabaseConfig;
use crate::db::{catalog_queries, Database};
use crate::errors::AppError;
use crate::models::SchemaStatus;

/// Advisory lock key shared by every provisioning run against a database.
pub const PROVISION_LOCK_KEY: &str = "stock_prices";

#[derive(Debug, Clone, Copy)]
pub struct SchemaStep {
    pub name: &'static str,
    pub sql: &'static str,
}

/// A table together with the catalog objects provisioning must leave behind.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub table: &'static str,
    pub unique_constraint: &'static str,
    pub indexes: &'static [&'static str],
    pub trigger: Option<&'static str>,
    pub steps: &'static [SchemaStep],
}

pub const STOCK_PRICES: TableSchema = TableSchema {
    table: "stock_prices",
    unique_constraint: "stock_prices_symbol_key",
    indexes: &["idx_stock_prices_symbol", "idx_stock_prices_last_updated"],
    trigger: Some("trg_stock_prices_last_updated"),
    steps: &[
        SchemaStep {
            name: "create table stock_prices",
            sql: r#"
            CREATE TABLE IF NOT EXISTS stock_prices (
                id SERIAL PRIMARY KEY,
                symbol VARCHAR(10) NOT NULL,
                price NUMERIC(10, 2) NOT NULL,
                change_amount NUMERIC(10, 2) NOT NULL DEFAULT 0,
                change_percent NUMERIC(8, 2) NOT NULL DEFAULT 0,
                volume BIGINT NOT NULL DEFAULT 0,
                market_cap BIGINT NOT NULL DEFAULT 0,
                last_updated TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
                CONSTRAINT stock_prices_symbol_key UNIQUE (symbol)
            )
            "#,
        },
        SchemaStep {
            name: "create index idx_stock_prices_symbol",
            sql: "CREATE INDEX IF NOT EXISTS idx_stock_prices_symbol ON stock_prices (symbol)",
        },
        SchemaStep {
            name: "create index idx_stock_prices_last_updated",
            sql: "CREATE INDEX IF NOT EXISTS idx_stock_prices_last_updated ON stock_prices (last_updated)",
        },
        SchemaStep {
            name: "create function stock_prices_touch_last_updated",
            sql: r#"
            CREATE OR REPLACE FUNCTION stock_prices_touch_last_updated()
            RETURNS TRIGGER AS $$
            BEGIN
                NEW.last_updated = CURRENT_TIMESTAMP;
                RETURN NEW;
            END;
            $$ LANGUAGE plpgsql
            "#,
        },
        SchemaStep {
            name: "drop trigger trg_stock_prices_last_updated",
            sql: "DROP TRIGGER IF EXISTS trg_stock_prices_last_updated ON stock_prices",
        },
        SchemaStep {
            name: "create trigger trg_stock_prices_last_updated",
            sql: r#"
            CREATE TRIGGER trg_stock_prices_last_updated
            BEFORE UPDATE ON stock_prices
            FOR EACH ROW
            EXECUTE FUNCTION stock_prices_touch_last_updated()
            "#,
        },
    ],
};

/// Run `steps` in order inside a single transaction. Returns the number of
/// steps applied; on failure nothing from the batch is kept.
pub async fn apply_steps(conn: &mut PgConnection, steps: &[SchemaStep]) -> Result<usize, AppError> {
    let mut tx = conn.begin().await?;

    // Released automatically on commit or rollback
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(PROVISION_LOCK_KEY)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("❌ Failed to take provisioning lock: {:?}", e);
            AppError::Db(e)
        })?;

    for (i, step) in steps.iter().enumerate() {
        info!("  [{}/{}] {}", i + 1, steps.len(), step.name);

        if let Err(e) = sqlx::query(step.sql).persistent(false).execute(&mut *tx).await {
            error!("❌ Schema step '{}' failed: {:?}", step.name, e);
            if let Err(rollback_err) = tx.rollback().await {
                warn!("Rollback after failed step '{}' also failed: {}", step.name, rollback_err);
            }
            return Err(AppError::Db(e));
        }
    }

    tx.commit().await?;
    Ok(steps.len())
}

/// Confirm every object `schema` declares is present in the current schema.
pub async fn verify(conn: &mut PgConnection, schema: &TableSchema) -> Result<SchemaStatus, AppError> {
    let tables = catalog_queries::find_tables(&mut *conn, schema.table).await?;
    if tables.len() != 1 {
        return Err(AppError::Verification(format!(
            "expected table {} to exist, found {} matching tables",
            schema.table,
            tables.len()
        )));
    }

    let present = catalog_queries::index_names(&mut *conn, schema.table).await?;
    let missing: Vec<&str> = schema
        .indexes
        .iter()
        .copied()
        .filter(|expected| !present.iter().any(|name| name == expected))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Verification(format!(
            "missing indexes on {}: {}",
            schema.table,
            missing.join(", ")
        )));
    }

    if !catalog_queries::unique_constraint_exists(&mut *conn, schema.table, schema.unique_constraint).await? {
        return Err(AppError::Verification(format!(
            "missing unique constraint {} on {}",
            schema.unique_constraint, schema.table
        )));
    }

    if let Some(trigger) = schema.trigger {
        if !catalog_queries::trigger_exists(&mut *conn, schema.table, trigger).await? {
            return Err(AppError::Verification(format!(
                "missing trigger {} on {}",
                trigger, schema.table
            )));
        }
    }

    Ok(SchemaStatus {
        table: schema.table.to_string(),
        indexes: schema.indexes.iter().map(|s| s.to_string()).collect(),
        unique_constraint: schema.unique_constraint.to_string(),
        trigger: schema.trigger.map(str::to_string),
        steps_applied: 0,
    })
}

pub async fn provision(conn: &mut PgConnection, schema: &TableSchema) -> Result<SchemaStatus, AppError> {
    info!("🔧 Provisioning table {} ({} steps)", schema.table, schema.steps.len());

    let applied = apply_steps(&mut *conn, schema.steps).await?;
    let mut status = verify(&mut *conn, schema).await?;
    status.steps_applied = applied;

    info!(
        "✅ Table {} verified: unique constraint {}, indexes [{}]",
        status.table,
        status.unique_constraint,
        status.indexes.join(", ")
    );
    Ok(status)
}

/// Connect, provision `stock_prices`, and release the connection whatever the outcome.
pub async fn run(config: &DatabaseConfig) -> Result<SchemaStatus, AppError> {
    let db = Database::connect(config).await?;

    let result = async {
        let mut conn = db.acquire().await?;
        provision(&mut conn, &STOCK_PRICES).await
    }
    .await;

    db.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(sql: &str) -> String {
        sql.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
    }

    #[test]
    fn test_every_step_is_rerunnable() {
        for step in STOCK_PRICES.steps {
            let sql = normalized(step.sql);
            let idempotent = sql.starts_with("CREATE TABLE IF NOT EXISTS")
                || sql.starts_with("CREATE INDEX IF NOT EXISTS")
                || sql.starts_with("CREATE OR REPLACE FUNCTION")
                || sql.starts_with("DROP TRIGGER IF EXISTS")
                || sql.starts_with("CREATE TRIGGER");
            assert!(idempotent, "step '{}' is not safe to re-run", step.name);
        }
    }

    #[test]
    fn test_trigger_is_dropped_before_it_is_created() {
        let position = |prefix: &str| {
            STOCK_PRICES
                .steps
                .iter()
                .position(|s| normalized(s.sql).starts_with(prefix))
        };

        let drop = position("DROP TRIGGER IF EXISTS").expect("drop step");
        let create = position("CREATE TRIGGER").expect("create step");
        assert!(drop < create);
    }

    #[test]
    fn test_steps_never_touch_rows() {
        for step in STOCK_PRICES.steps {
            let sql = normalized(step.sql);
            for dml in ["INSERT", "UPDATE", "DELETE", "TRUNCATE"] {
                assert!(!sql.starts_with(dml), "step '{}' modifies rows", step.name);
            }
        }
    }

    #[test]
    fn test_declared_objects_are_created_by_steps() {
        let all_sql: String = STOCK_PRICES.steps.iter().map(|s| s.sql).collect();

        assert!(all_sql.contains(STOCK_PRICES.table));
        assert!(all_sql.contains(STOCK_PRICES.unique_constraint));
        for index in STOCK_PRICES.indexes {
            assert!(all_sql.contains(index), "no step creates {}", index);
        }
        assert!(all_sql.contains(STOCK_PRICES.trigger.unwrap()));
    }

    #[test]
    fn test_two_lookup_indexes_declared() {
        assert_eq!(STOCK_PRICES.indexes.len(), 2);
        assert!(STOCK_PRICES.indexes.iter().any(|i| i.ends_with("_symbol")));
        assert!(STOCK_PRICES.indexes.iter().any(|i| i.ends_with("_last_updated")));
    }

    #[test]
    fn test_table_has_every_snapshot_column() {
        let create = normalized(STOCK_PRICES.steps[0].sql);
        for column in [
            "ID SERIAL PRIMARY KEY",
            "SYMBOL VARCHAR(10)",
            "PRICE NUMERIC(10, 2)",
            "CHANGE_AMOUNT NUMERIC(10, 2)",
            "CHANGE_PERCENT NUMERIC(8, 2)",
            "VOLUME BIGINT",
            "MARKET_CAP BIGINT",
            "LAST_UPDATED TIMESTAMPTZ",
            "CREATED_AT TIMESTAMPTZ",
        ] {
            assert!(create.contains(column), "missing column {}", column);
        }
    }
}
