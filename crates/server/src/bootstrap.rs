use std::sync::Arc;

use storefront_core::config::{AppConfig, ConfigError};
use storefront_db::repositories::{SqlProductRepository, SqlSessionRepository};
use storefront_db::{connect_with_settings, migrations, DbPool};
use thiserror::Error;
use tracing::info;

use crate::app::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let state = AppState {
        products: Arc::new(SqlProductRepository::new(db_pool.clone())),
        sessions: Arc::new(SqlSessionRepository::new(db_pool.clone())),
        session: config.session.clone(),
    };

    Ok(Application { config, db_pool, state })
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use storefront_core::config::{AppConfig, ConfigOverrides, LoadOptions};
    use storefront_db::CatalogSeedDataset;
    use tower::ServiceExt;

    use crate::app::router;
    use crate::bootstrap::{bootstrap_with_config, Application, BootstrapError};

    async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        bootstrap_with_config(AppConfig::load(options)?).await
    }

    fn in_memory_options() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                database_max_connections: Some(1),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_rejects_invalid_cookie_name() {
        let mut options = in_memory_options();
        options.overrides.session_cookie_name = Some("bad cookie".to_string());

        let error = bootstrap(options).await.err().expect("invalid config should fail");
        assert!(error.to_string().contains("cookie"), "{error}");
    }

    #[tokio::test]
    async fn bootstrapped_router_serves_the_seeded_cart_flow() {
        let app = bootstrap(in_memory_options()).await.expect("bootstrap");
        CatalogSeedDataset::load(&app.db_pool).await.expect("seed");
        let router = router(app.state.clone(), app.db_pool.clone());

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cart/add")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "action": "post", "product_id": "3", "product_qty": "2" })
                            .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .expect("session cookie")
            .to_string();

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/cart")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["quantities"], json!({ "3": 2 }));
        assert_eq!(body["totals"], json!("37.00"));

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        app.db_pool.close().await;
    }
}
