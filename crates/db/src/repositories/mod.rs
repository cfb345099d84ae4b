use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use storefront_core::config::SessionConcurrency;
use storefront_core::domain::product::{Category, Product, ProductId};
use storefront_core::domain::session::{Session, SessionId};
use storefront_core::{ApplicationError, ProductCatalog};

pub mod memory;
pub mod product;
pub mod session;

pub use memory::{InMemoryProductRepository, InMemorySessionRepository};
pub use product::{SqlCategoryRepository, SqlProductRepository};
pub use session::SqlSessionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("session version conflict: expected {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::VersionConflict { .. } => Self::Conflict(value.to_string()),
            RepositoryError::Database(_) | RepositoryError::Decode(_) => {
                Self::Persistence(value.to_string())
            }
        }
    }
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;
    /// One lookup for all `ids`; unknown ids are dropped.
    async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;
    /// `None` when no category has that name.
    async fn list_by_category(&self, name: &str)
        -> Result<Option<Vec<Product>>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, RepositoryError>;
    async fn save(&self, category: Category) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, RepositoryError>;
    /// Persists `session` and returns the stored version after the write.
    async fn save(
        &self,
        session: &Session,
        mode: SessionConcurrency,
    ) -> Result<u64, RepositoryError>;
    async fn delete(&self, id: &SessionId) -> Result<bool, RepositoryError>;
    /// Deletes sessions last saved before `cutoff`; returns how many went.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

#[async_trait]
impl ProductCatalog for dyn ProductRepository {
    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, ApplicationError> {
        self.find_many(ids).await.map_err(ApplicationError::from)
    }
}

/// Version a save would produce, or the conflict it would raise, given the
/// version currently stored (`None` when absent).
pub(crate) fn next_version(
    session: &Session,
    stored: Option<u64>,
    mode: SessionConcurrency,
) -> Result<u64, RepositoryError> {
    let found = stored.unwrap_or(0);
    match mode {
        SessionConcurrency::LastWriteWins => Ok(found + 1),
        SessionConcurrency::Optimistic if found == session.version() => Ok(found + 1),
        SessionConcurrency::Optimistic => {
            Err(RepositoryError::VersionConflict { expected: session.version(), found })
        }
    }
}
