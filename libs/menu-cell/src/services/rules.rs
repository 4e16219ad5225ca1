use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use chrono::Utc;
use messaging_cell::LineClient;
use shared_config::AppConfig;
use shared_database::supabase::{upsert_merge_duplicates, SupabaseClient};

use crate::models::{MenuError, MenuRule, MenuRuleSet, PatientContext};
use crate::services::evaluator;

const SETTINGS_KEY: &str = "menu_rules";

pub struct MenuRuleService {
    config: AppConfig,
    supabase: SupabaseClient,
}

impl MenuRuleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.clone(),
            supabase: SupabaseClient::new(config),
        }
    }

    /// Load the tenant's rule set blob; a tenant with no stored rules gets
    /// the empty version-0 set.
    pub async fn load_rules(
        &self,
        tenant_id: &str,
        auth_token: &str,
    ) -> Result<MenuRuleSet, MenuError> {
        debug!("Loading menu rules for tenant: {}", tenant_id);

        let path = format!(
            "/rest/v1/tenant_settings?tenant_id=eq.{}&key=eq.{}&limit=1",
            tenant_id, SETTINGS_KEY
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| MenuError::DatabaseError(e.to_string()))?;

        let Some(row) = rows.into_iter().next() else {
            return Ok(MenuRuleSet::default());
        };

        let value = row.get("value").cloned().unwrap_or(Value::Null);
        serde_json::from_value(value)
            .map_err(|e| MenuError::ValidationError(format!("stored rule set is malformed: {}", e)))
    }

    /// Replace the tenant's rule set, bumping the blob version.
    pub async fn save_rules(
        &self,
        tenant_id: &str,
        rules: Vec<MenuRule>,
        auth_token: &str,
    ) -> Result<MenuRuleSet, MenuError> {
        let current = self.load_rules(tenant_id, auth_token).await?;
        let next = MenuRuleSet {
            version: current.version + 1,
            rules,
        };

        let row = json!({
            "tenant_id": tenant_id,
            "key": SETTINGS_KEY,
            "value": next,
            "updated_at": Utc::now().to_rfc3339()
        });

        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/tenant_settings?on_conflict=tenant_id,key",
                Some(auth_token),
                Some(row),
                Some(upsert_merge_duplicates()),
            )
            .await
            .map_err(|e| MenuError::DatabaseError(e.to_string()))?;

        info!(
            "Saved {} menu rules for tenant {} (version {})",
            next.rules.len(),
            tenant_id,
            next.version
        );

        Ok(next)
    }

    /// Assemble the patient attributes rules evaluate against: tag-id set,
    /// status mark, and free-form field values.
    pub async fn patient_context(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<PatientContext, MenuError> {
        let mut context = PatientContext::default();

        let tags_path = format!(
            "/rest/v1/patient_tags?patient_id=eq.{}&select=tag_id",
            patient_id
        );
        let tags: Vec<Value> = self
            .supabase
            .request(Method::GET, &tags_path, Some(auth_token), None)
            .await
            .map_err(|e| MenuError::DatabaseError(e.to_string()))?;
        context.tag_ids = tags
            .iter()
            .filter_map(|row| row.get("tag_id").and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        let patient_path = format!("/rest/v1/patients?id=eq.{}&select=mark", patient_id);
        let patients: Vec<Value> = self
            .supabase
            .request(Method::GET, &patient_path, Some(auth_token), None)
            .await
            .map_err(|e| MenuError::DatabaseError(e.to_string()))?;
        context.mark = patients
            .first()
            .and_then(|row| row.get("mark"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let fields_path = format!(
            "/rest/v1/patient_fields?patient_id=eq.{}&select=field_id,value",
            patient_id
        );
        let fields: Vec<Value> = self
            .supabase
            .request(Method::GET, &fields_path, Some(auth_token), None)
            .await
            .map_err(|e| MenuError::DatabaseError(e.to_string()))?;
        context.fields = fields
            .iter()
            .filter_map(|row| {
                let field_id = row.get("field_id").and_then(Value::as_str)?;
                let value = row.get("value").and_then(Value::as_str)?;
                Some((field_id.to_string(), value.to_string()))
            })
            .collect();

        Ok(context)
    }

    /// Recompute the patient's menu assignment and push the result to LINE.
    /// Called whenever the patient's tags, mark, or fields change. The LINE
    /// link/unlink is best-effort; the evaluation result is returned either
    /// way.
    pub async fn reassign_menu(
        &self,
        tenant_id: &str,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<MenuRule>, MenuError> {
        let rule_set = self.load_rules(tenant_id, auth_token).await?;
        let context = self.patient_context(patient_id, auth_token).await?;

        let matched = evaluator::evaluate(&rule_set.rules, &context).cloned();

        match &matched {
            Some(rule) => info!(
                "Patient {} matched menu rule '{}' (priority {})",
                patient_id, rule.name, rule.priority
            ),
            None => debug!("Patient {} matched no menu rule", patient_id),
        }

        self.push_assignment(patient_id, matched.as_ref(), auth_token)
            .await;

        Ok(matched)
    }

    async fn push_assignment(
        &self,
        patient_id: Uuid,
        rule: Option<&MenuRule>,
        auth_token: &str,
    ) {
        let line = match LineClient::new(&self.config) {
            Ok(line) => line,
            Err(_) => {
                debug!("Messaging not configured, skipping rich menu update");
                return;
            }
        };

        let path = format!("/rest/v1/patients?id=eq.{}&select=line_user_id", patient_id);
        let rows: Vec<Value> = match self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!("LINE identity lookup failed for patient {}: {}", patient_id, e);
                return;
            }
        };

        let Some(line_user_id) = rows
            .first()
            .and_then(|row| row.get("line_user_id"))
            .and_then(Value::as_str)
        else {
            debug!("Patient {} has no LINE identity, skipping rich menu update", patient_id);
            return;
        };

        let result = match rule {
            Some(rule) => line.link_rich_menu(line_user_id, &rule.rich_menu_id).await,
            // No match: fall back to the channel default menu.
            None => line.unlink_rich_menu(line_user_id).await,
        };

        if let Err(e) = result {
            warn!("Rich menu update failed for patient {}: {}", patient_id, e);
        }
    }
}
