use std::sync::Arc;
use axum::{middleware, routing::post, Router};
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn create_reorder_router(config: Arc<AppConfig>) -> Router {
    let authenticated = Router::new()
        .route("/", post(create_reorder))
        .route("/{id}/approve", post(approve_reorder))
        .route("/{id}/reject", post(reject_reorder))
        .route("/{id}/cancel", post(cancel_reorder))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware));

    // The payment webhook authenticates by body signature, not bearer token.
    Router::new()
        .merge(authenticated)
        .route("/webhooks/payment", post(payment_webhook))
        .with_state(config)
}
