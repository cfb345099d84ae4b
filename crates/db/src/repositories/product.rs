use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Row, Sqlite};

use storefront_core::domain::product::{Category, CategoryId, Product, ProductId};

use super::{CategoryRepository, ProductRepository, RepositoryError};
use crate::DbPool;

const PRODUCT_COLUMNS: &str =
    "p.id, p.name, p.description, p.price, p.category_id, p.is_sale, p.sale_price";

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<T>(result: Result<T, sqlx::Error>) -> Result<T, RepositoryError> {
    result.map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value)
        .map_err(|e| RepositoryError::Decode(format!("{field} `{value}` is not a decimal: {e}")))
}

fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    let id: i64 = decode(row.try_get("id"))?;
    let name: String = decode(row.try_get("name"))?;
    let description: String = decode(row.try_get("description"))?;
    let price_str: String = decode(row.try_get("price"))?;
    let category_id: Option<i64> = decode(row.try_get("category_id"))?;
    let is_sale: bool = decode(row.try_get("is_sale"))?;
    let sale_price_str: Option<String> = decode(row.try_get("sale_price"))?;

    let sale_price =
        sale_price_str.as_deref().map(|value| parse_decimal("sale_price", value)).transpose()?;

    Ok(Product {
        id: ProductId(id),
        name,
        description,
        price: parse_decimal("price", &price_str)?,
        category_id: category_id.map(CategoryId),
        is_sale,
        sale_price,
    })
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM product p WHERE p.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn find_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM product p WHERE p.id IN ("));
        let mut separated = query_builder.separated(", ");
        for id in ids {
            separated.push_bind(id.0);
        }
        query_builder.push(")");

        let rows = query_builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_product).collect::<Result<Vec<_>, _>>()
    }

    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM product p ORDER BY p.id"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_product).collect::<Result<Vec<_>, _>>()
    }

    async fn list_by_category(
        &self,
        name: &str,
    ) -> Result<Option<Vec<Product>>, RepositoryError> {
        let category_id: Option<i64> = sqlx::query_scalar("SELECT id FROM category WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        let Some(category_id) = category_id else {
            return Ok(None);
        };

        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product p WHERE p.category_id = ? ORDER BY p.id"
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_product).collect::<Result<Vec<_>, _>>().map(Some)
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO product (id, name, description, price, category_id, is_sale,
                                  sale_price, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 description = excluded.description,
                 price = excluded.price,
                 category_id = excluded.category_id,
                 is_sale = excluded.is_sale,
                 sale_price = excluded.sale_price,
                 updated_at = excluded.updated_at",
        )
        .bind(product.id.0)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.to_string())
        .bind(product.category_id.map(|id| id.0))
        .bind(product.is_sale)
        .bind(product.sale_price.map(|price| price.to_string()))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM product WHERE id = ?").bind(id.0).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct SqlCategoryRepository {
    pool: DbPool,
}

impl SqlCategoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CategoryRepository for SqlCategoryRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query("SELECT id, name FROM category WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let id: i64 = decode(row.try_get("id"))?;
        let name: String = decode(row.try_get("name"))?;
        Category::new(CategoryId(id), name)
            .map(Some)
            .map_err(|e| RepositoryError::Decode(e.to_string()))
    }

    async fn save(&self, category: Category) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO category (id, name) VALUES (?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )
        .bind(category.id.0)
        .bind(&category.name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use storefront_core::domain::product::{Category, CategoryId, Product, ProductId};
    use storefront_core::{Cart, ProductCatalog, Session, SessionId};

    use super::{SqlCategoryRepository, SqlProductRepository};
    use crate::repositories::{CategoryRepository, ProductRepository};
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn product(id: i64, price: Decimal, category: Option<i64>) -> Product {
        Product {
            category_id: category.map(CategoryId),
            ..Product::priced(id, format!("Product {id}"), price)
        }
    }

    #[tokio::test]
    async fn save_and_find_by_id_preserves_decimal_prices() {
        let pool = setup_pool().await;
        let repo = SqlProductRepository::new(pool.clone());
        let mut on_sale = product(1, Decimal::new(1850, 2), None);
        on_sale.is_sale = true;
        on_sale.sale_price = Some(Decimal::new(1499, 2));

        repo.save(on_sale.clone()).await.expect("save");
        let found = repo.find_by_id(ProductId(1)).await.expect("find");

        assert_eq!(found, Some(on_sale));
        assert_eq!(repo.find_by_id(ProductId(2)).await.expect("find missing"), None);

        pool.close().await;
    }

    #[tokio::test]
    async fn find_many_drops_unknown_ids() {
        let pool = setup_pool().await;
        let repo = SqlProductRepository::new(pool.clone());
        repo.save(product(1, Decimal::new(1000, 2), None)).await.expect("save 1");
        repo.save(product(2, Decimal::new(500, 2), None)).await.expect("save 2");

        let mut found = repo
            .find_many(&[ProductId(2), ProductId(1), ProductId(77)])
            .await
            .expect("bulk lookup");
        found.sort_by_key(|product| product.id);

        let ids = found.iter().map(|p| p.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![ProductId(1), ProductId(2)]);
        assert!(repo.find_many(&[]).await.expect("empty lookup").is_empty());

        pool.close().await;
    }

    #[tokio::test]
    async fn list_by_category_distinguishes_missing_category_from_empty() {
        let pool = setup_pool().await;
        let categories = SqlCategoryRepository::new(pool.clone());
        let products = SqlProductRepository::new(pool.clone());
        categories
            .save(Category::new(CategoryId(1), "Kitchen").expect("category"))
            .await
            .expect("save category");
        categories
            .save(Category::new(CategoryId(2), "Garden").expect("category"))
            .await
            .expect("save category");
        products.save(product(1, Decimal::new(500, 2), Some(1))).await.expect("save");
        products.save(product(2, Decimal::new(900, 2), None)).await.expect("save");

        let kitchen = products.list_by_category("Kitchen").await.expect("kitchen");
        assert_eq!(kitchen.map(|items| items.len()), Some(1));
        assert_eq!(products.list_by_category("Garden").await.expect("garden"), Some(Vec::new()));
        assert_eq!(products.list_by_category("Tools").await.expect("tools"), None);

        let found = categories.find_by_name("Kitchen").await.expect("find category");
        assert_eq!(found.map(|category| category.id), Some(CategoryId(1)));

        pool.close().await;
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_was_removed() {
        let pool = setup_pool().await;
        let repo = SqlProductRepository::new(pool.clone());
        repo.save(product(1, Decimal::new(1000, 2), None)).await.expect("save");

        assert!(repo.delete(ProductId(1)).await.expect("delete"));
        assert!(!repo.delete(ProductId(1)).await.expect("delete again"));
        assert!(repo.list().await.expect("list").is_empty());

        pool.close().await;
    }

    #[tokio::test]
    async fn cart_total_against_sql_catalog_skips_deleted_products() {
        let pool = setup_pool().await;
        let repo: Arc<dyn ProductRepository> = Arc::new(SqlProductRepository::new(pool.clone()));
        let shirt = product(1, Decimal::new(1000, 2), None);
        let mug = product(2, Decimal::new(500, 2), None);
        repo.save(shirt.clone()).await.expect("save shirt");
        repo.save(mug.clone()).await.expect("save mug");

        let mut session = Session::new(SessionId("s-sql".to_string()));
        let mut cart = Cart::attach(&mut session).expect("attach");
        cart.add(&shirt, 3);
        cart.add(&mug, 2);
        assert_eq!(cart.total(&*repo).await.expect("total"), Decimal::new(4000, 2));

        repo.delete(ProductId(1)).await.expect("delete shirt");

        assert_eq!(cart.total(&*repo).await.expect("total"), Decimal::new(1000, 2));
        assert_eq!(cart.list_products(&*repo).await.expect("products"), vec![mug]);
        assert_eq!(cart.size(), 2);

        let direct = repo.find_by_ids(&[ProductId(2)]).await.expect("catalog lookup");
        assert_eq!(direct.len(), 1);

        pool.close().await;
    }
}
