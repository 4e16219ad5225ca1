use tracing::{debug, warn};

use crate::models::{ReorderError, ReorderStatus};

pub struct ReorderLifecycleService;

impl ReorderLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: &ReorderStatus,
        new_status: &ReorderStatus,
    ) -> Result<(), ReorderError> {
        debug!("Validating status transition from {:?} to {:?}", current_status, new_status);

        let valid_transitions = self.get_valid_transitions(current_status);

        if !valid_transitions.contains(new_status) {
            warn!("Invalid status transition attempted: {:?} -> {:?}", current_status, new_status);
            return Err(ReorderError::InvalidState(*current_status));
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: &ReorderStatus) -> Vec<ReorderStatus> {
        match current_status {
            ReorderStatus::Pending => vec![
                ReorderStatus::Confirmed,
                ReorderStatus::Rejected,
                ReorderStatus::Canceled,
            ],
            ReorderStatus::Confirmed => vec![
                ReorderStatus::Paid,
                ReorderStatus::Canceled,
            ],
            // Terminal states - no transitions allowed
            ReorderStatus::Paid => vec![],
            ReorderStatus::Rejected => vec![],
            ReorderStatus::Canceled => vec![],
        }
    }

    /// Next reorder number for a patient. Number 1 is reserved for the
    /// initial reservation-linked order, so a patient with no prior reorders
    /// (or only a legacy row numbered 0) gets 2.
    pub fn next_reorder_number(&self, max_existing: Option<i64>) -> i64 {
        max_existing.unwrap_or(1).max(1) + 1
    }

    /// Parse the reorder id out of a payment-gateway reference. Id 1 is the
    /// reserved initial order and never a valid reorder target.
    pub fn parse_payment_reference(&self, reference: &str) -> Result<i64, ReorderError> {
        let id = reference.trim().parse::<i64>().map_err(|_| {
            ReorderError::ValidationError(format!("invalid reorder reference: {}", reference))
        })?;

        if id < 2 {
            return Err(ReorderError::ValidationError(format!(
                "reorder reference {} is reserved",
                id
            )));
        }

        Ok(id)
    }
}

impl Default for ReorderLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
