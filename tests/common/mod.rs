/// Helpers for tests that need a live PostgreSQL.
///
/// Each test gets a throwaway schema and points the search path at it, so
/// runs never see each other's tables. Tests using these helpers are marked
/// `#[ignore]` and fail loudly when run without DATABASE_URL.
use sqlx::{Connection, PgConnection};
use stock_constraints_backend::DatabaseConfig;
use uuid::Uuid;

pub struct ScratchSchema {
    pub config: DatabaseConfig,
    admin_url: String,
    schema: String,
}

pub async fn scratch_schema() -> ScratchSchema {
    dotenvy::dotenv().ok();

    let url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must point at PostgreSQL to run the ignored live tests");

    let schema = format!("test_{}", Uuid::new_v4().simple());

    let mut conn = admin_connection(&url).await;
    sqlx::query(&format!("CREATE SCHEMA {}", schema))
        .execute(&mut conn)
        .await
        .expect("failed to create scratch schema");
    conn.close().await.ok();

    ScratchSchema {
        config: DatabaseConfig::new(url.clone()).with_search_path(schema.clone()),
        admin_url: url,
        schema,
    }
}

impl ScratchSchema {
    pub async fn cleanup(self) {
        let mut conn = admin_connection(&self.admin_url).await;
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema))
            .execute(&mut conn)
            .await
            .expect("failed to drop scratch schema");
        conn.close().await.ok();
    }
}

async fn admin_connection(url: &str) -> PgConnection {
    let options = DatabaseConfig::new(url)
        .connect_options()
        .expect("invalid DATABASE_URL");
    PgConnection::connect_with(&options)
        .await
        .expect("failed to connect to DATABASE_URL")
}
