use chrono::{DateTime, Utc};
use serde::Serialize;

// Outcome of a provisioning run, as observed in the schema catalog afterwards.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SchemaStatus {
    pub table: String,
    pub indexes: Vec<String>,
    pub unique_constraint: String,
    pub trigger: Option<String>,
    pub steps_applied: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub updated: usize,
    pub total_rows: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseReport {
    /// None when stock_prices has not been provisioned.
    pub stock_price_rows: Option<i64>,
    pub latest_update: Option<DateTime<Utc>>,
    pub cache_hit_ratio: Option<f64>,
}
