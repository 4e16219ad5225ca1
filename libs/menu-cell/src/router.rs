use std::sync::Arc;
use axum::{middleware, routing::{get, post, put}, Router};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_menu_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/rules/{tenant_id}", get(get_rules))
        .route("/rules/{tenant_id}", put(put_rules))
        .route("/assignments/{tenant_id}/{patient_id}", post(reassign_menu))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}
