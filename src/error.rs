use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")] Database(#[from] sea_orm::DbErr),

    #[error("Queue error: {0}")] Queue(String),

    #[error("Email error: {0}")] Email(String),

    #[error("Malformed message: {0}")] MalformedMessage(String),

    #[error("Invalid input: {0}")] InvalidInput(String),

    #[error("Configuration error: {0}")] Config(String),

    #[error("Internal error: {0}")] Internal(String),
}

impl AppError {
    /// Whether the enclosing unit of work should be retried (redelivered)
    /// rather than discarded.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Queue(_))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
