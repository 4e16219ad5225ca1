use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use menu_cell::router::create_menu_router;
use reorder_cell::router::create_reorder_router;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic reorder API is running!" }))
        .nest("/reorders", create_reorder_router(state.clone()))
        .nest("/menu", create_menu_router(state.clone()))
}
