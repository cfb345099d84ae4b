//! Readiness report for `/health`: the database answers, every embedded
//! migration is applied, and whether the catalog has anything to sell.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use storefront_db::{migrations::MIGRATOR, DbPool};

#[derive(Clone)]
struct Readiness {
    db_pool: DbPool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Ready,
    /// Serving works, but there is nothing to put in a cart.
    Empty,
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub status: CheckStatus,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: CheckStatus,
    pub database: CheckReport,
    pub schema: CheckReport,
    pub catalog: CheckReport,
    pub checked_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(Readiness { db_pool })
}

async fn health(State(readiness): State<Readiness>) -> (StatusCode, Json<HealthReport>) {
    let report = report(&readiness.db_pool).await;
    let status_code = match report.status {
        CheckStatus::Degraded => StatusCode::SERVICE_UNAVAILABLE,
        CheckStatus::Ready | CheckStatus::Empty => StatusCode::OK,
    };
    (status_code, Json(report))
}

pub async fn report(pool: &DbPool) -> HealthReport {
    let database = database_check(pool).await;
    let schema = schema_check(pool).await;
    let catalog = catalog_check(pool).await;

    let status = if [&database, &schema, &catalog]
        .iter()
        .any(|check| check.status == CheckStatus::Degraded)
    {
        CheckStatus::Degraded
    } else {
        CheckStatus::Ready
    };

    HealthReport { status, database, schema, catalog, checked_at: Utc::now().to_rfc3339() }
}

async fn database_check(pool: &DbPool) -> CheckReport {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => ready("database query succeeded".to_string()),
        Err(error) => degraded(format!("database query failed: {error}")),
    }
}

async fn schema_check(pool: &DbPool) -> CheckReport {
    let known = MIGRATOR.iter().count();
    let applied = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1",
    )
    .fetch_one(pool)
    .await;

    match applied {
        Ok(applied) if usize::try_from(applied).is_ok_and(|applied| applied >= known) => {
            ready(format!("{applied} of {known} migrations applied"))
        }
        Ok(applied) => degraded(format!("{applied} of {known} migrations applied")),
        Err(error) => degraded(format!("migration history unavailable: {error}")),
    }
}

async fn catalog_check(pool: &DbPool) -> CheckReport {
    match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM product").fetch_one(pool).await {
        Ok(0) => CheckReport {
            status: CheckStatus::Empty,
            detail: "catalog has no products; run `storefront seed`".to_string(),
        },
        Ok(products) => ready(format!("{products} products listed")),
        Err(error) => degraded(format!("catalog query failed: {error}")),
    }
}

fn ready(detail: String) -> CheckReport {
    CheckReport { status: CheckStatus::Ready, detail }
}

fn degraded(detail: String) -> CheckReport {
    CheckReport { status: CheckStatus::Degraded, detail }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use storefront_db::{connect_with_settings, migrations, CatalogSeedDataset, DbPool};
    use tower::ServiceExt;

    use super::{report, router, CheckStatus};

    async fn migrated_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn seeded_database_reports_every_check_ready() {
        let pool = migrated_pool().await;
        CatalogSeedDataset::load(&pool).await.expect("seed");

        let report = report(&pool).await;

        assert_eq!(report.status, CheckStatus::Ready);
        assert_eq!(report.database.status, CheckStatus::Ready);
        assert_eq!(report.schema.status, CheckStatus::Ready);
        assert_eq!(report.catalog.status, CheckStatus::Ready);
        assert_eq!(report.catalog.detail, "5 products listed");
        pool.close().await;
    }

    #[tokio::test]
    async fn empty_catalog_is_flagged_but_still_ready() {
        let pool = migrated_pool().await;

        let report = report(&pool).await;

        assert_eq!(report.status, CheckStatus::Ready);
        assert_eq!(report.catalog.status, CheckStatus::Empty);
        pool.close().await;
    }

    #[tokio::test]
    async fn unmigrated_database_is_degraded() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool");

        let report = report(&pool).await;

        assert_eq!(report.status, CheckStatus::Degraded);
        assert_eq!(report.database.status, CheckStatus::Ready);
        assert_eq!(report.schema.status, CheckStatus::Degraded);
        assert_eq!(report.catalog.status, CheckStatus::Degraded);
        pool.close().await;
    }

    #[tokio::test]
    async fn health_route_maps_readiness_to_status_codes() {
        let pool = migrated_pool().await;
        let request = || Request::builder().uri("/health").body(Body::empty()).expect("request");

        let response = router(pool.clone()).oneshot(request()).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["status"], "ready");
        assert_eq!(body["catalog"]["status"], "empty");

        pool.close().await;
        let response = router(pool).oneshot(request()).await.expect("response");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
