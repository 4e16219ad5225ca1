use assert_matches::assert_matches;

use reorder_cell::models::{ReorderError, ReorderStatus};
use reorder_cell::services::lifecycle::ReorderLifecycleService;

#[test]
fn test_pending_transitions() {
    let lifecycle = ReorderLifecycleService::new();

    let next = lifecycle.get_valid_transitions(&ReorderStatus::Pending);
    assert!(next.contains(&ReorderStatus::Confirmed));
    assert!(next.contains(&ReorderStatus::Rejected));
    assert!(next.contains(&ReorderStatus::Canceled));
    assert!(!next.contains(&ReorderStatus::Paid));
}

#[test]
fn test_confirmed_transitions() {
    let lifecycle = ReorderLifecycleService::new();

    let next = lifecycle.get_valid_transitions(&ReorderStatus::Confirmed);
    assert!(next.contains(&ReorderStatus::Paid));
    assert!(next.contains(&ReorderStatus::Canceled));
    assert!(!next.contains(&ReorderStatus::Rejected));
}

#[test]
fn test_terminal_states_have_no_transitions() {
    let lifecycle = ReorderLifecycleService::new();

    for status in [ReorderStatus::Paid, ReorderStatus::Rejected, ReorderStatus::Canceled] {
        assert!(lifecycle.get_valid_transitions(&status).is_empty());
    }
}

#[test]
fn test_invalid_transition_reports_current_status() {
    let lifecycle = ReorderLifecycleService::new();

    let result =
        lifecycle.validate_status_transition(&ReorderStatus::Paid, &ReorderStatus::Canceled);
    assert_matches!(result, Err(ReorderError::InvalidState(ReorderStatus::Paid)));
}

#[test]
fn test_numbering_starts_at_two() {
    let lifecycle = ReorderLifecycleService::new();

    assert_eq!(lifecycle.next_reorder_number(None), 2);
}

#[test]
fn test_numbering_increments_past_max() {
    let lifecycle = ReorderLifecycleService::new();

    assert_eq!(lifecycle.next_reorder_number(Some(5)), 6);
}

#[test]
fn test_numbering_treats_zero_like_absence() {
    let lifecycle = ReorderLifecycleService::new();

    assert_eq!(lifecycle.next_reorder_number(Some(0)), 2);
}

#[test]
fn test_payment_reference_parses_plain_id() {
    let lifecycle = ReorderLifecycleService::new();

    assert_eq!(lifecycle.parse_payment_reference("42").unwrap(), 42);
    assert_eq!(lifecycle.parse_payment_reference(" 7 ").unwrap(), 7);
}

#[test]
fn test_payment_reference_rejects_reserved_ids() {
    let lifecycle = ReorderLifecycleService::new();

    assert_matches!(
        lifecycle.parse_payment_reference("1"),
        Err(ReorderError::ValidationError(_))
    );
    assert_matches!(
        lifecycle.parse_payment_reference("0"),
        Err(ReorderError::ValidationError(_))
    );
    assert_matches!(
        lifecycle.parse_payment_reference("-3"),
        Err(ReorderError::ValidationError(_))
    );
}

#[test]
fn test_payment_reference_rejects_non_numeric() {
    let lifecycle = ReorderLifecycleService::new();

    assert_matches!(
        lifecycle.parse_payment_reference("order-42"),
        Err(ReorderError::ValidationError(_))
    );
    assert_matches!(
        lifecycle.parse_payment_reference(""),
        Err(ReorderError::ValidationError(_))
    );
}
