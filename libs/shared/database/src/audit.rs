use anyhow::Result;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::supabase::SupabaseClient;

/// Writes audit trail rows through the service-role client. Audit rows are
/// never patient-writable, so row-level security is bypassed here.
pub struct AuditClient {
    supabase: SupabaseClient,
}

impl AuditClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::service(config),
        }
    }

    /// Record an action under a dot-namespaced name, e.g. `reorder.approve`.
    pub async fn record(
        &self,
        action: &str,
        resource_type: &str,
        resource_id: &str,
        details: Value,
    ) -> Result<()> {
        debug!("Recording audit entry: {} {} {}", action, resource_type, resource_id);

        let entry = json!({
            "action": action,
            "resource_type": resource_type,
            "resource_id": resource_id,
            "details": details,
            "created_at": chrono::Utc::now().to_rfc3339()
        });

        let _: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/audit_logs",
            None,
            Some(entry),
            Some(crate::supabase::return_representation()),
        ).await?;

        Ok(())
    }

    /// Best-effort variant: a failed audit write must never block or roll
    /// back the business transition it describes.
    pub async fn record_best_effort(
        &self,
        action: &str,
        resource_type: &str,
        resource_id: &str,
        details: Value,
    ) {
        if let Err(e) = self.record(action, resource_type, resource_id, details).await {
            warn!("Audit write failed for {} on {} {}: {}", action, resource_type, resource_id, e);
        }
    }
}
