mod stock_price;
mod run_report;

pub use stock_price::{NewStockPrice, StockPriceSnapshot, DECIMAL_SCALE, SYMBOL_PATTERN};
pub use run_report::{DatabaseReport, SchemaStatus, SeedReport};
