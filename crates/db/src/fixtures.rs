use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Demo catalog contract checked by `verify` after a seed.
const SEED_CATEGORIES: &[SeedCategory] = &[
    SeedCategory { id: 1, name: "Clothing" },
    SeedCategory { id: 2, name: "Kitchen" },
    SeedCategory { id: 3, name: "Stationery" },
];

const SEED_PRODUCTS: &[SeedProduct] = &[
    SeedProduct { id: 1, name: "Canvas Shirt", price: "10.00", category_id: 1, sale_price: None },
    SeedProduct { id: 2, name: "Enamel Mug", price: "5.00", category_id: 2, sale_price: None },
    SeedProduct {
        id: 3,
        name: "Wool Beanie",
        price: "18.50",
        category_id: 1,
        sale_price: Some("14.99"),
    },
    SeedProduct {
        id: 4,
        name: "Dot Grid Notebook",
        price: "7.25",
        category_id: 3,
        sale_price: None,
    },
    SeedProduct {
        id: 5,
        name: "Pour-over Kettle",
        price: "42.00",
        category_id: 2,
        sale_price: None,
    },
];

/// Deterministic storefront catalog for demos and end-to-end tests.
pub struct CatalogSeedDataset;

impl CatalogSeedDataset {
    pub const SQL: &'static str = include_str!("../../../config/fixtures/catalog_seed_data.sql");

    /// Loads the catalog. Rows are replaced by id, so reloading is idempotent.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        sqlx::raw_sql(Self::SQL).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(SeedResult {
            categories_seeded: SEED_CATEGORIES.len(),
            products_seeded: SEED_PRODUCTS.iter().map(|product| product.name).collect(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for category in SEED_CATEGORIES {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM category WHERE id = ?1 AND name = ?2)",
            )
            .bind(category.id)
            .bind(category.name)
            .fetch_one(pool)
            .await?;
            checks.push((category.name, exists == 1));
        }

        for product in SEED_PRODUCTS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM product
                 WHERE id = ?1 AND name = ?2 AND price = ?3 AND category_id = ?4
                   AND is_sale = ?5 AND sale_price IS ?6)",
            )
            .bind(product.id)
            .bind(product.name)
            .bind(product.price)
            .bind(product.category_id)
            .bind(product.sale_price.is_some())
            .bind(product.sale_price)
            .fetch_one(pool)
            .await?;
            checks.push((product.name, exists == 1));
        }

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes seeded rows. Sessions are left alone.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        for product in SEED_PRODUCTS {
            sqlx::query("DELETE FROM product WHERE id = ?")
                .bind(product.id)
                .execute(&mut *tx)
                .await?;
        }
        for category in SEED_CATEGORIES {
            sqlx::query("DELETE FROM category WHERE id = ?")
                .bind(category.id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedCategory {
    id: i64,
    name: &'static str,
}

#[derive(Debug, Clone, Copy)]
struct SeedProduct {
    id: i64,
    name: &'static str,
    price: &'static str,
    category_id: i64,
    sale_price: Option<&'static str>,
}

#[derive(Debug)]
pub struct SeedResult {
    pub categories_seeded: usize,
    pub products_seeded: Vec<&'static str>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
