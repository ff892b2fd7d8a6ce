use async_trait::async_trait;
use thiserror::Error;

use crate::models::Declaration;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Whole-collection persistence for declarations.
///
/// Backends store the collection as a unit: `save` replaces whatever was
/// stored before, and `load` returns records in the order they were saved.
#[async_trait]
pub trait DeclarationRepository: Send + Sync {
    async fn load(&self) -> Result<Vec<Declaration>, RepositoryError>;

    async fn save(
        &self,
        declarations: &[Declaration],
    ) -> Result<(), RepositoryError>;
}
