use thiserror::Error;

use crate::domain::types::TypeConstraintError;
use crate::embedding::EmbeddingError;

/// Errors surfaced by repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("malformed stored data: {0}")]
    Corrupt(String),
}

impl From<TypeConstraintError> for RepositoryError {
    fn from(err: TypeConstraintError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<EmbeddingError> for RepositoryError {
    fn from(err: EmbeddingError) -> Self {
        Self::Corrupt(err.to_string())
    }
}

/// Convenient alias for results returned from repository functions.
pub type RepositoryResult<T> = Result<T, RepositoryError>;
