use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use chrono::Utc;
use messaging_cell::LineClient;
use shared_config::AppConfig;
use shared_database::audit::AuditClient;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{
    CreateReorderRequest, Decision, DecisionOutcome, IntakeRecord, ReorderError,
    ReorderRequest, ReorderStatus,
};
use crate::services::dose;
use crate::services::lifecycle::ReorderLifecycleService;

pub struct ReorderService {
    config: AppConfig,
    supabase: SupabaseClient,
    service_db: SupabaseClient,
    audit: AuditClient,
    lifecycle: ReorderLifecycleService,
}

impl ReorderService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.clone(),
            supabase: SupabaseClient::new(config),
            service_db: SupabaseClient::service(config),
            audit: AuditClient::new(config),
            lifecycle: ReorderLifecycleService::new(),
        }
    }

    /// Patient-initiated reorder application. Gated on the latest clinical
    /// intake status and on the absence of an open reorder for the patient.
    pub async fn apply(
        &self,
        patient_id: Uuid,
        request: CreateReorderRequest,
        auth_token: &str,
    ) -> Result<ReorderRequest, ReorderError> {
        debug!("Processing reorder application for patient: {}", patient_id);

        if let Some(intake) = self.latest_intake(patient_id, auth_token).await? {
            if intake.blocks_reorder() {
                return Err(ReorderError::Blocked(
                    "clinical intake status is NG".to_string(),
                ));
            }
        }

        let open_path = format!(
            "/rest/v1/reorders?patient_id=eq.{}&status=in.(pending,confirmed)&limit=1",
            patient_id
        );
        let open: Vec<ReorderRequest> = self
            .supabase
            .request(Method::GET, &open_path, Some(auth_token), None)
            .await
            .map_err(|e| ReorderError::DatabaseError(e.to_string()))?;

        if !open.is_empty() {
            return Err(ReorderError::DuplicateRequest);
        }

        let latest_path = format!(
            "/rest/v1/reorders?patient_id=eq.{}&order=reorder_number.desc&limit=1",
            patient_id
        );
        let latest: Vec<ReorderRequest> = self
            .supabase
            .request(Method::GET, &latest_path, Some(auth_token), None)
            .await
            .map_err(|e| ReorderError::DatabaseError(e.to_string()))?;

        let reorder_number = self
            .lifecycle
            .next_reorder_number(latest.first().map(|r| r.reorder_number));

        let reorder_data = json!({
            "patient_id": patient_id,
            "reorder_number": reorder_number,
            "product_code": request.product_code,
            "status": ReorderStatus::Pending,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        // The store keeps a partial unique index over open reorders per
        // patient; a concurrent second application surfaces here as 409.
        let inserted: Vec<ReorderRequest> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/reorders",
                Some(auth_token),
                Some(reorder_data),
                Some(return_representation()),
            )
            .await
            .map_err(|e| {
                let message = e.to_string();
                if message.starts_with("Conflict") {
                    ReorderError::DuplicateRequest
                } else {
                    ReorderError::DatabaseError(message)
                }
            })?;

        let reorder = inserted
            .into_iter()
            .next()
            .ok_or_else(|| ReorderError::DatabaseError("insert returned no rows".to_string()))?;

        info!(
            "Reorder {} created for patient {} (number {})",
            reorder.id, patient_id, reorder.reorder_number
        );

        // Post-commit side effects; none of these may fail the application.
        self.first_supply_warning(&reorder, auth_token).await;
        self.notify_patient(
            patient_id,
            "We received your repeat prescription request. The clinic will review it shortly.",
            auth_token,
        )
        .await;
        self.audit
            .record_best_effort(
                "reorder.apply",
                "reorder",
                &reorder.id.to_string(),
                json!({
                    "patient_id": patient_id,
                    "product_code": reorder.product_code,
                    "reorder_number": reorder.reorder_number
                }),
            )
            .await;

        Ok(reorder)
    }

    /// Approve or reject a pending reorder. Deciding a non-pending reorder
    /// is an idempotent no-op reported as `Skipped`.
    pub async fn decide(
        &self,
        reorder_id: i64,
        decision: Decision,
        karte_note: Option<String>,
        auth_token: &str,
    ) -> Result<DecisionOutcome, ReorderError> {
        debug!("Processing {:?} for reorder {}", decision, reorder_id);

        let current = self
            .fetch_reorder(reorder_id, auth_token)
            .await?
            .ok_or(ReorderError::NotFound)?;

        if current.status != ReorderStatus::Pending {
            return Ok(Self::skipped(reorder_id, current.status));
        }

        let target = decision.target_status();
        self.lifecycle
            .validate_status_transition(&current.status, &target)?;

        let mut update = json!({
            "status": target,
            "updated_at": Utc::now().to_rfc3339()
        });

        // karte_note is write-once clinical documentation: set only when the
        // record has none, never overwritten.
        if decision == Decision::Approve && current.karte_note.is_none() {
            if let Some(note) = &karte_note {
                update["karte_note"] = json!(note);
            }
        }

        // Status-guarded update: a concurrent decision that already moved the
        // record off pending makes this PATCH match zero rows.
        let guarded_path = format!("/rest/v1/reorders?id=eq.{}&status=eq.pending", reorder_id);
        let updated: Vec<ReorderRequest> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &guarded_path,
                Some(auth_token),
                Some(update),
                Some(return_representation()),
            )
            .await
            .map_err(|e| ReorderError::DatabaseError(e.to_string()))?;

        let reorder = match updated.into_iter().next() {
            Some(reorder) => reorder,
            None => {
                let latest = self
                    .fetch_reorder(reorder_id, auth_token)
                    .await?
                    .ok_or(ReorderError::NotFound)?;
                return Ok(Self::skipped(reorder_id, latest.status));
            }
        };

        info!("Reorder {} moved to {}", reorder.id, reorder.status);

        self.audit
            .record_best_effort(
                decision.audit_action(),
                "reorder",
                &reorder.id.to_string(),
                json!({
                    "patient_id": reorder.patient_id,
                    "status": reorder.status
                }),
            )
            .await;

        let notification = match decision {
            Decision::Approve => {
                "Your repeat prescription was approved. Please proceed to payment."
            }
            Decision::Reject => {
                "Your repeat prescription request could not be approved. The clinic will contact you."
            }
        };
        self.notify_patient(reorder.patient_id, notification, auth_token)
            .await;

        Ok(DecisionOutcome::Applied { reorder })
    }

    /// Patient-initiated cancellation. Ownership is enforced as absence so a
    /// foreign reorder id reveals nothing.
    pub async fn cancel(
        &self,
        reorder_id: i64,
        requesting_patient: Uuid,
        auth_token: &str,
    ) -> Result<ReorderRequest, ReorderError> {
        debug!("Processing cancellation of reorder {} by {}", reorder_id, requesting_patient);

        let current = self
            .fetch_reorder(reorder_id, auth_token)
            .await?
            .ok_or(ReorderError::NotFound)?;

        if current.patient_id != requesting_patient {
            return Err(ReorderError::NotFound);
        }

        if !current.status.is_open() {
            return Err(ReorderError::InvalidState(current.status));
        }

        let guarded_path = format!(
            "/rest/v1/reorders?id=eq.{}&status=in.(pending,confirmed)",
            reorder_id
        );
        let update = json!({
            "status": ReorderStatus::Canceled,
            "updated_at": Utc::now().to_rfc3339()
        });
        let updated: Vec<ReorderRequest> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &guarded_path,
                Some(auth_token),
                Some(update),
                Some(return_representation()),
            )
            .await
            .map_err(|e| ReorderError::DatabaseError(e.to_string()))?;

        let reorder = match updated.into_iter().next() {
            Some(reorder) => reorder,
            None => {
                let latest = self
                    .fetch_reorder(reorder_id, auth_token)
                    .await?
                    .ok_or(ReorderError::NotFound)?;
                return Err(ReorderError::InvalidState(latest.status));
            }
        };

        info!("Reorder {} canceled by patient {}", reorder.id, requesting_patient);

        self.audit
            .record_best_effort(
                "reorder.cancel",
                "reorder",
                &reorder.id.to_string(),
                json!({ "patient_id": reorder.patient_id }),
            )
            .await;

        Ok(reorder)
    }

    /// Mark a confirmed reorder as paid, keyed by the gateway reference.
    /// Runs with the service-role client since webhooks carry no user token.
    /// Returns None when no confirmed reorder matched (already paid, still
    /// pending, or unknown id); callers treat that as a logged no-op.
    pub async fn confirm_payment(
        &self,
        reference: &str,
    ) -> Result<Option<ReorderRequest>, ReorderError> {
        let reorder_id = self.lifecycle.parse_payment_reference(reference)?;

        let guarded_path = format!(
            "/rest/v1/reorders?id=eq.{}&status=eq.confirmed",
            reorder_id
        );
        let update = json!({
            "status": ReorderStatus::Paid,
            "updated_at": Utc::now().to_rfc3339()
        });
        let updated: Vec<ReorderRequest> = self
            .service_db
            .request_with_headers(
                Method::PATCH,
                &guarded_path,
                None,
                Some(update),
                Some(return_representation()),
            )
            .await
            .map_err(|e| ReorderError::DatabaseError(e.to_string()))?;

        let reorder = match updated.into_iter().next() {
            Some(reorder) => reorder,
            None => {
                info!("No confirmed reorder {} to mark paid; ignoring notification", reorder_id);
                return Ok(None);
            }
        };

        info!("Reorder {} marked paid", reorder.id);

        self.audit
            .record_best_effort(
                "reorder.payment",
                "reorder",
                &reorder.id.to_string(),
                json!({ "patient_id": reorder.patient_id }),
            )
            .await;
        self.notify_patient(
            reorder.patient_id,
            "Your payment was received. Your prescription will be shipped shortly.",
            // Webhook flow: read the LINE identity with the service client.
            "",
        )
        .await;

        Ok(Some(reorder))
    }

    async fn fetch_reorder(
        &self,
        reorder_id: i64,
        auth_token: &str,
    ) -> Result<Option<ReorderRequest>, ReorderError> {
        let path = format!("/rest/v1/reorders?id=eq.{}&limit=1", reorder_id);
        let result: Vec<ReorderRequest> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ReorderError::DatabaseError(e.to_string()))?;

        Ok(result.into_iter().next())
    }

    async fn latest_intake(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<IntakeRecord>, ReorderError> {
        let path = format!(
            "/rest/v1/intake_records?patient_id=eq.{}&order=created_at.desc&limit=1",
            patient_id
        );
        let result: Vec<IntakeRecord> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ReorderError::DatabaseError(e.to_string()))?;

        Ok(result.into_iter().next())
    }

    /// First orders at the escalation tier without a same-or-adjacent-tier
    /// confirmed/paid history warn the clinic. Never blocks creation.
    async fn first_supply_warning(&self, reorder: &ReorderRequest, auth_token: &str) {
        let Some(dose_mg) = dose::extract_dose_mg(&reorder.product_code) else {
            return;
        };
        if !dose::requires_first_supply_check(dose_mg) {
            return;
        }

        let history_path = format!(
            "/rest/v1/reorders?patient_id=eq.{}&status=in.(confirmed,paid)",
            reorder.patient_id
        );
        let history: Vec<ReorderRequest> = match self
            .supabase
            .request(Method::GET, &history_path, Some(auth_token), None)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                warn!("First-supply history lookup failed for reorder {}: {}", reorder.id, e);
                return;
            }
        };

        let covered = history
            .iter()
            .filter_map(|prior| dose::extract_dose_mg(&prior.product_code))
            .any(|prior_dose| dose::covers_dose_tier(prior_dose, dose_mg));

        if covered {
            return;
        }

        warn!(
            "Reorder {} is a first {}mg supply for patient {} without prior history",
            reorder.id, dose_mg, reorder.patient_id
        );

        let line = match LineClient::new(&self.config) {
            Ok(line) => line,
            Err(_) => {
                debug!("Messaging not configured, skipping first-supply warning");
                return;
            }
        };
        if let Err(e) = line
            .notify_admin_group(&format!(
                "Reorder #{}: first {}mg request from patient {} without prior supply at an adjacent dose. Please review before approval.",
                reorder.id, dose_mg, reorder.patient_id
            ))
            .await
        {
            warn!("First-supply warning notification failed: {}", e);
        }
    }

    /// Push a LINE message to the patient, best-effort.
    async fn notify_patient(&self, patient_id: Uuid, text: &str, auth_token: &str) {
        let line = match LineClient::new(&self.config) {
            Ok(line) => line,
            Err(_) => {
                debug!("Messaging not configured, skipping patient notification");
                return;
            }
        };

        let path = format!("/rest/v1/patients?id=eq.{}&select=line_user_id", patient_id);
        let db = if auth_token.is_empty() { &self.service_db } else { &self.supabase };
        let token = if auth_token.is_empty() { None } else { Some(auth_token) };
        let rows: Vec<Value> = match db.request(Method::GET, &path, token, None).await {
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
            debug!("Patient {} has no LINE identity, skipping notification", patient_id);
            return;
        };

        if let Err(e) = line.push_text(line_user_id, text).await {
            warn!("Patient notification failed for {}: {}", patient_id, e);
        }
    }

    fn skipped(reorder_id: i64, current_status: ReorderStatus) -> DecisionOutcome {
        DecisionOutcome::Skipped {
            current_status,
            message: format!(
                "reorder {} is already {}, decision skipped",
                reorder_id, current_status
            ),
        }
    }
}
