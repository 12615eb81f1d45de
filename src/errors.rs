use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Connection error: {0}")]
    Connection(sqlx::Error),
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Verification failed: {0}")]
    Verification(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Process exit status reported by the entry points.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => 2,
            AppError::Connection(_) => 3,
            AppError::Db(_) => 4,
            AppError::Verification(_) => 5,
            AppError::Validation(_) => 6,
            AppError::Io(_) => 7,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::Validation(format!("malformed seed data: {}", value))
    }
}
