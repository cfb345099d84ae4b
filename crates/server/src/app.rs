use std::sync::Arc;

use axum::Router;
use storefront_core::config::SessionConfig;
use storefront_db::repositories::{ProductRepository, SessionRepository};
use storefront_db::DbPool;
use uuid::Uuid;

use crate::{cart, catalog, health};

#[derive(Clone)]
pub struct AppState {
    pub products: Arc<dyn ProductRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub session: SessionConfig,
}

pub fn router(state: AppState, db_pool: DbPool) -> Router {
    Router::new()
        .merge(cart::routes())
        .merge(catalog::routes())
        .with_state(state)
        .merge(health::router(db_pool))
}

pub fn new_correlation_id() -> String {
    format!("req-{}", Uuid::new_v4().simple())
}
