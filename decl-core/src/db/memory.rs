use std::sync::Mutex;

use async_trait::async_trait;

use super::factory::{DbConfig, RepositoryFactory};
use super::repository::{DeclarationRepository, RepositoryError};
use crate::models::Declaration;

/// Process-lifetime storage, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    declarations: Mutex<Vec<Declaration>>,
}

impl MemoryRepository {
    pub fn new(declarations: Vec<Declaration>) -> Self {
        Self {
            declarations: Mutex::new(declarations),
        }
    }
}

#[async_trait]
impl DeclarationRepository for MemoryRepository {
    async fn load(&self) -> Result<Vec<Declaration>, RepositoryError> {
        let guard = self
            .declarations
            .lock()
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save(
        &self,
        declarations: &[Declaration],
    ) -> Result<(), RepositoryError> {
        let mut guard = self
            .declarations
            .lock()
            .map_err(|e| RepositoryError::Database(e.to_string()))?;
        *guard = declarations.to_vec();
        Ok(())
    }
}

/// [`RepositoryFactory`] for the `"memory"` backend. The connection string
/// is ignored; every call starts from an empty collection.
pub struct MemoryRepositoryFactory;

#[async_trait]
impl RepositoryFactory for MemoryRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(
        &self,
        _config: &DbConfig,
    ) -> Result<Box<dyn DeclarationRepository>, RepositoryError> {
        Ok(Box::new(MemoryRepository::default()))
    }
}
