use std::sync::Arc;

use axum::{
    extract::{Path, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::SaveRulesRequest;
use crate::services::MenuRuleService;

fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Auth("Admin role required".to_string()))
    }
}

#[axum::debug_handler]
pub async fn get_rules(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(tenant_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let service = MenuRuleService::new(&config);

    let rule_set = service.load_rules(&tenant_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(rule_set)))
}

#[axum::debug_handler]
pub async fn put_rules(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(tenant_id): Path<String>,
    Json(request): Json<SaveRulesRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let service = MenuRuleService::new(&config);

    let rule_set = service.save_rules(&tenant_id, request.rules, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!(rule_set)))
}

#[axum::debug_handler]
pub async fn reassign_menu(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((tenant_id, patient_id)): Path<(String, Uuid)>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let service = MenuRuleService::new(&config);

    let matched = service.reassign_menu(&tenant_id, patient_id, auth.token())
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({
        "patient_id": patient_id,
        "matched_rule": matched
    })))
}
