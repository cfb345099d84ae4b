use async_trait::async_trait;

use crate::domain::product::{Product, ProductId};
use crate::errors::ApplicationError;

/// Bulk product lookup used by cart aggregates.
///
/// Implementations must resolve all ids in a single round trip and silently
/// omit ids that have no product.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, ApplicationError>;
}

/// Fixed product snapshot, useful for previews and tests.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn remove(&mut self, product_id: &ProductId) -> Option<Product> {
        let index = self.products.iter().position(|product| &product.id == product_id)?;
        Some(self.products.remove(index))
    }
}

#[async_trait]
impl ProductCatalog for Catalog {
    async fn find_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, ApplicationError> {
        Ok(self.products.iter().filter(|product| ids.contains(&product.id)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{Catalog, ProductCatalog};
    use crate::domain::product::{Product, ProductId};

    #[tokio::test]
    async fn snapshot_lookup_omits_unknown_and_removed_ids() {
        let mut catalog = Catalog::new(vec![
            Product::priced(1, "Shirt", Decimal::new(1000, 2)),
            Product::priced(2, "Mug", Decimal::new(500, 2)),
        ]);

        let found = catalog.find_by_ids(&[ProductId(2), ProductId(9)]).await.expect("lookup");
        assert_eq!(found.iter().map(|product| product.id).collect::<Vec<_>>(), vec![ProductId(2)]);

        let removed = catalog.remove(&ProductId(2)).expect("mug removed");
        assert_eq!(removed.name, "Mug");
        assert!(catalog.remove(&ProductId(2)).is_none());

        let found = catalog.find_by_ids(&[ProductId(1), ProductId(2)]).await.expect("lookup");
        assert_eq!(found.iter().map(|product| product.id).collect::<Vec<_>>(), vec![ProductId(1)]);
    }
}
