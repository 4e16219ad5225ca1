use std::sync::Arc;

use axum::{
    extract::{Path, State, Extension},
    http::HeaderMap,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::warn;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{CreateReorderRequest, Decision, DecisionRequest, PaymentNotification};
use crate::services::ReorderService;

fn patient_id_from(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::Auth("Invalid user id".to_string()))
}

#[axum::debug_handler]
pub async fn create_reorder(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateReorderRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = patient_id_from(&user)?;
    let service = ReorderService::new(&config);

    let reorder = service.apply(patient_id, request, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(reorder)))
}

#[axum::debug_handler]
pub async fn approve_reorder(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(reorder_id): Path<i64>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Admin role required".to_string()));
    }
    let service = ReorderService::new(&config);

    let outcome = service
        .decide(reorder_id, Decision::Approve, request.karte_note, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(outcome)))
}

#[axum::debug_handler]
pub async fn reject_reorder(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(reorder_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Admin role required".to_string()));
    }
    let service = ReorderService::new(&config);

    let outcome = service
        .decide(reorder_id, Decision::Reject, None, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(outcome)))
}

#[axum::debug_handler]
pub async fn cancel_reorder(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(reorder_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let patient_id = patient_id_from(&user)?;
    let service = ReorderService::new(&config);

    let reorder = service.cancel(reorder_id, patient_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(reorder)))
}

/// Payment-gateway webhook. Once the signature verifies, the gateway
/// contract requires a 200 acknowledgement regardless of the internal
/// outcome; failures are logged, never surfaced, to avoid retry storms.
#[axum::debug_handler]
pub async fn payment_webhook(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get("x-webhook-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing webhook signature".to_string()))?;

    if !verify_webhook_signature(&config.payment_webhook_secret, &body, signature) {
        return Err(AppError::BadRequest("Invalid webhook signature".to_string()));
    }

    let notification: PaymentNotification = match serde_json::from_str(&body) {
        Ok(notification) => notification,
        Err(e) => {
            warn!("Unparseable payment notification: {}", e);
            return Ok(Json(json!({ "received": true })));
        }
    };

    let service = ReorderService::new(&config);
    if let Err(e) = service.confirm_payment(&notification.reference).await {
        warn!(
            "Payment confirmation failed for reference {}: {}",
            notification.reference, e
        );
    }

    Ok(Json(json!({ "received": true })))
}

/// HMAC-SHA256 hex digest of the raw body, compared to the gateway header.
pub fn verify_webhook_signature(secret: &str, body: &str, provided: &str) -> bool {
    if secret.is_empty() {
        return false;
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body.as_bytes());
    let expected: String = mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect();

    expected.eq_ignore_ascii_case(provided)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_roundtrip() {
        let secret = "webhook-secret";
        let body = r#"{"reference":"42"}"#;

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body.as_bytes());
        let signature: String = mac
            .finalize()
            .into_bytes()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect();

        assert!(verify_webhook_signature(secret, body, &signature));
        assert!(!verify_webhook_signature(secret, body, "deadbeef"));
        assert!(!verify_webhook_signature("other-secret", body, &signature));
    }

    #[test]
    fn test_empty_secret_never_verifies() {
        assert!(!verify_webhook_signature("", "{}", ""));
    }
}
