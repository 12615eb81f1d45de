pub mod cli;
pub mod config;
pub mod db;
pub mod errors;
pub mod logging;
pub mod models;
pub mod services;

pub use config::DatabaseConfig;
pub use errors::AppError;
