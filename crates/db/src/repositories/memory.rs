use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use storefront_core::config::SessionConcurrency;
use storefront_core::domain::product::{Category, CategoryId, Product, ProductId};
use storefront_core::domain::session::{Session, SessionId};

use super::{
    next_version, CategoryRepository, ProductRepository, RepositoryError, SessionRepository,
};

/// Catalog held in memory. Serves both the product and category traits so
/// `list_by_category` can resolve names the way the sql join does.
#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<BTreeMap<ProductId, Product>>,
    categories: RwLock<HashMap<CategoryId, Category>>,
}

impl InMemoryProductRepository {
    pub fn with_catalog(categories: Vec<Category>, products: Vec<Product>) -> Self {
        Self {
            products: RwLock::new(products.into_iter().map(|p| (p.id, p)).collect()),
            categories: RwLock::new(categories.into_iter().map(|c| (c.id, c)).collect()),
        }
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.values().cloned().collect())
    }

    async fn list_by_category(
        &self,
        name: &str,
    ) -> Result<Option<Vec<Product>>, RepositoryError> {
        let category_id = {
            let categories = self.categories.read().await;
            categories.values().find(|category| category.name == name).map(|category| category.id)
        };
        let Some(category_id) = category_id else {
            return Ok(None);
        };

        let products = self.products.read().await;
        Ok(Some(
            products
                .values()
                .filter(|product| product.category_id == Some(category_id))
                .cloned()
                .collect(),
        ))
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        products.insert(product.id, product);
        Ok(())
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut products = self.products.write().await;
        Ok(products.remove(&id).is_some())
    }
}

#[async_trait::async_trait]
impl CategoryRepository for InMemoryProductRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, RepositoryError> {
        let categories = self.categories.read().await;
        Ok(categories.values().find(|category| category.name == name).cloned())
    }

    async fn save(&self, category: Category) -> Result<(), RepositoryError> {
        let mut categories = self.categories.write().await;
        categories.insert(category.id, category);
        Ok(())
    }
}

/// Sessions with the time each was last saved.
#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<SessionId, (Session, DateTime<Utc>)>>,
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id).map(|(stored, _)| {
            Session::restore(stored.id().clone(), stored.values().clone(), stored.version())
        }))
    }

    async fn save(
        &self,
        session: &Session,
        mode: SessionConcurrency,
    ) -> Result<u64, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions.get(session.id()).map(|(stored, _)| stored.version());
        let version = next_version(session, stored, mode)?;

        let mut snapshot = session.clone();
        snapshot.mark_saved(version);
        sessions.insert(session.id().clone(), (snapshot, Utc::now()));
        Ok(version)
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(id).is_some())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, (_, saved_at)| *saved_at >= cutoff);
        Ok((before - sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use serde_json::json;

    use storefront_core::config::SessionConcurrency;
    use storefront_core::domain::product::{Category, CategoryId, Product, ProductId};
    use storefront_core::domain::session::{Session, SessionId};

    use super::{InMemoryProductRepository, InMemorySessionRepository};
    use crate::repositories::{
        CategoryRepository, ProductRepository, RepositoryError, SessionRepository,
    };

    fn catalog() -> InMemoryProductRepository {
        let kitchen = Category::new(CategoryId(2), "Kitchen").expect("category");
        let mut mug = Product::priced(2, "Mug", Decimal::new(500, 2));
        mug.category_id = Some(CategoryId(2));
        let shirt = Product::priced(1, "Shirt", Decimal::new(1000, 2));
        InMemoryProductRepository::with_catalog(vec![kitchen], vec![shirt, mug])
    }

    #[tokio::test]
    async fn product_lookups_mirror_the_sql_repository() {
        let repo = catalog();

        let found = repo.find_many(&[ProductId(2), ProductId(9)]).await.expect("find many");
        assert_eq!(found.iter().map(|p| p.id).collect::<Vec<_>>(), vec![ProductId(2)]);

        let kitchen = repo.list_by_category("Kitchen").await.expect("by category");
        assert_eq!(kitchen.map(|items| items.len()), Some(1));
        assert_eq!(repo.list_by_category("Garden").await.expect("missing"), None);

        assert!(repo.delete(ProductId(1)).await.expect("delete"));
        assert_eq!(repo.list().await.expect("list").len(), 1);
        assert!(CategoryRepository::find_by_name(&repo, "Kitchen")
            .await
            .expect("category")
            .is_some());
    }

    #[tokio::test]
    async fn session_store_hands_out_clean_copies() {
        let repo = InMemorySessionRepository::default();
        let id = SessionId("s-memory".to_string());
        let mut session = Session::new(id.clone());
        session.set("theme", json!("dark"));
        session.mark_modified();

        let version = repo.save(&session, SessionConcurrency::LastWriteWins).await.expect("save");
        let loaded = repo.load(&id).await.expect("load").expect("stored");

        assert_eq!(version, 1);
        assert_eq!(loaded.version(), 1);
        assert!(!loaded.is_modified());
        assert_eq!(loaded.get("theme"), Some(&json!("dark")));
    }

    #[tokio::test]
    async fn optimistic_save_conflicts_on_stale_version() {
        let repo = InMemorySessionRepository::default();
        let id = SessionId("s-stale".to_string());
        repo.save(&Session::new(id.clone()), SessionConcurrency::Optimistic)
            .await
            .expect("seed");

        let first = repo.load(&id).await.expect("load").expect("first");
        let second = repo.load(&id).await.expect("load").expect("second");
        repo.save(&first, SessionConcurrency::Optimistic).await.expect("first save");

        let error = repo
            .save(&second, SessionConcurrency::Optimistic)
            .await
            .expect_err("stale save");
        assert!(matches!(error, RepositoryError::VersionConflict { expected: 1, found: 2 }));
        assert_eq!(
            repo.save(&second, SessionConcurrency::LastWriteWins).await.expect("lww save"),
            3
        );
    }

    #[tokio::test]
    async fn purge_drops_sessions_saved_before_the_cutoff() {
        let repo = InMemorySessionRepository::default();
        let id = SessionId("s-idle".to_string());
        repo.save(&Session::new(id.clone()), SessionConcurrency::LastWriteWins)
            .await
            .expect("save");

        let last_week = Utc::now() - Duration::days(7);
        assert_eq!(repo.purge_older_than(last_week).await.expect("purge"), 0);
        assert!(repo.load(&id).await.expect("load").is_some());

        let tomorrow = Utc::now() + Duration::days(1);
        assert_eq!(repo.purge_older_than(tomorrow).await.expect("purge"), 1);
        assert!(repo.load(&id).await.expect("load").is_none());
    }
}
