mod connection;
pub mod catalog_queries;
pub mod stock_price_queries;

pub use connection::Database;
