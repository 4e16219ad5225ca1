use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReorderStatus {
    Pending,
    Confirmed,
    Paid,
    Rejected,
    Canceled,
}

impl ReorderStatus {
    /// A patient may hold at most one open reorder at a time.
    pub fn is_open(&self) -> bool {
        matches!(self, ReorderStatus::Pending | ReorderStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_open()
    }
}

impl fmt::Display for ReorderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReorderStatus::Pending => write!(f, "pending"),
            ReorderStatus::Confirmed => write!(f, "confirmed"),
            ReorderStatus::Paid => write!(f, "paid"),
            ReorderStatus::Rejected => write!(f, "rejected"),
            ReorderStatus::Canceled => write!(f, "canceled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub id: i64,
    pub patient_id: Uuid,
    /// Monotonically increasing per patient. Number 1 is reserved for the
    /// initial reservation-linked order, so the first repeat order is 2.
    pub reorder_number: i64,
    pub product_code: String,
    pub status: ReorderStatus,
    pub karte_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReorderRequest {
    pub product_code: String,
}

/// Latest clinical intake record for a patient. An `NG` status gates new
/// reorder applications; an absent or null status never does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeRecord {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl IntakeRecord {
    pub fn blocks_reorder(&self) -> bool {
        self.status.as_deref() == Some("NG")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target_status(&self) -> ReorderStatus {
        match self {
            Decision::Approve => ReorderStatus::Confirmed,
            Decision::Reject => ReorderStatus::Rejected,
        }
    }

    pub fn audit_action(&self) -> &'static str {
        match self {
            Decision::Approve => "reorder.approve",
            Decision::Reject => "reorder.reject",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub karte_note: Option<String>,
}

/// Approve/reject is idempotent: deciding a non-pending reorder is a
/// successful no-op, not an error.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DecisionOutcome {
    Applied { reorder: ReorderRequest },
    Skipped { current_status: ReorderStatus, message: String },
}

/// Inbound payment-gateway notification body. The reference carries the
/// reorder id the checkout session was created for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub reference: String,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ReorderError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Reorder application blocked: {0}")]
    Blocked(String),

    #[error("An open reorder request already exists for this patient")]
    DuplicateRequest,

    #[error("Reorder not found")]
    NotFound,

    #[error("Reorder cannot be modified in current status: {0}")]
    InvalidState(ReorderStatus),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<ReorderError> for AppError {
    fn from(err: ReorderError) -> Self {
        let message = err.to_string();
        match err {
            ReorderError::ValidationError(_) => AppError::ValidationError(message),
            ReorderError::Blocked(_) => AppError::Conflict(message),
            ReorderError::DuplicateRequest => AppError::Conflict(message),
            ReorderError::NotFound => AppError::NotFound(message),
            ReorderError::InvalidState(_) => AppError::Conflict(message),
            ReorderError::DatabaseError(_) => AppError::Database(message),
        }
    }
}
