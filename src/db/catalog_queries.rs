use sqlx::PgConnection;

/// Tables in the current schema with the given name. A provisioned table
/// yields exactly one row, an unknown name none.
pub async fn find_tables(
    conn: &mut PgConnection,
    table: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT table_name::text
        FROM information_schema.tables
        WHERE table_schema = current_schema()
          AND table_name = $1
        "#,
    )
    .bind(table)
    .fetch_all(conn)
    .await
}

pub async fn table_exists(conn: &mut PgConnection, table: &str) -> Result<bool, sqlx::Error> {
    Ok(!find_tables(conn, table).await?.is_empty())
}

pub async fn index_names(
    conn: &mut PgConnection,
    table: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT indexname::text
        FROM pg_indexes
        WHERE schemaname = current_schema()
          AND tablename = $1
        ORDER BY indexname
        "#,
    )
    .bind(table)
    .fetch_all(conn)
    .await
}

pub async fn unique_constraint_exists(
    conn: &mut PgConnection,
    table: &str,
    constraint: &str,
) -> Result<bool, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM information_schema.table_constraints
        WHERE table_schema = current_schema()
          AND table_name = $1
          AND constraint_name = $2
          AND constraint_type = 'UNIQUE'
        "#,
    )
    .bind(table)
    .bind(constraint)
    .fetch_one(conn)
    .await?;

    Ok(count > 0)
}

pub async fn trigger_exists(
    conn: &mut PgConnection,
    table: &str,
    trigger: &str,
) -> Result<bool, sqlx::Error> {
    // information_schema.triggers has one row per event
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM information_schema.triggers
        WHERE event_object_schema = current_schema()
          AND event_object_table = $1
          AND trigger_name = $2
        "#,
    )
    .bind(table)
    .bind(trigger)
    .fetch_one(conn)
    .await?;

    Ok(count > 0)
}

/// Buffer cache hits and disk reads summed over all user tables, as
/// `(heap_blks_hit, heap_blks_read)`.
pub async fn table_io_totals(conn: &mut PgConnection) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COALESCE(SUM(heap_blks_hit), 0)::BIGINT,
               COALESCE(SUM(heap_blks_read), 0)::BIGINT
        FROM pg_statio_user_tables
        "#,
    )
    .fetch_one(conn)
    .await
}
