use thiserror::Error;

/// Infrastructure-level error from a persistence adapter.
///
/// Kept separate from domain errors so a store outage or timeout is never
/// mistaken for a definitive authentication decision.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Store operation timed out: {0}")]
    Timeout(String),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => RepositoryError::Timeout(err.to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RepositoryError::UniqueViolation(
                    db_err.constraint().unwrap_or("unknown").to_string(),
                )
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}
