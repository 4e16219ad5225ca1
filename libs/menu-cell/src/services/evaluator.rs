//! Pure rule evaluation. No I/O, safe for unrestricted concurrent use; the
//! caller loads the rule set and patient context and passes both in.

use crate::models::{
    ConditionOperator, FieldOperator, MenuRule, PatientContext, RuleCondition, TagMatchMode,
};

/// Highest-priority enabled rule matching the patient, or None. Disabled
/// rules are excluded before ordering; evaluation short-circuits on the
/// first match.
pub fn evaluate<'a>(rules: &'a [MenuRule], context: &PatientContext) -> Option<&'a MenuRule> {
    let mut candidates: Vec<&MenuRule> = rules.iter().filter(|rule| rule.enabled).collect();
    // Stable sort: rules with equal priority keep their configured order.
    candidates.sort_by_key(|rule| rule.priority);

    candidates.into_iter().find(|rule| rule_matches(rule, context))
}

/// A rule with no conditions never matches, regardless of operator.
pub fn rule_matches(rule: &MenuRule, context: &PatientContext) -> bool {
    if rule.conditions.is_empty() {
        return false;
    }

    match rule.condition_operator {
        ConditionOperator::And => rule
            .conditions
            .iter()
            .all(|condition| condition_matches(condition, context)),
        ConditionOperator::Or => rule
            .conditions
            .iter()
            .any(|condition| condition_matches(condition, context)),
    }
}

fn condition_matches(condition: &RuleCondition, context: &PatientContext) -> bool {
    match condition {
        RuleCondition::Tag { tag_ids, match_mode } => {
            if tag_ids.is_empty() {
                return false;
            }
            match match_mode {
                TagMatchMode::Any => tag_ids.iter().any(|tag| context.tag_ids.contains(tag)),
                TagMatchMode::All => tag_ids.iter().all(|tag| context.tag_ids.contains(tag)),
            }
        }
        RuleCondition::Mark { values } => match &context.mark {
            Some(mark) => values.iter().any(|value| value == mark),
            None => false,
        },
        RuleCondition::Field { field_id, operator, value } => {
            let actual = context
                .fields
                .get(field_id)
                .map(String::as_str)
                .unwrap_or("");
            field_matches(operator, actual, value)
        }
    }
}

/// `>`/`<` compare numerically when both sides parse as numbers and neither
/// is empty; lexicographically otherwise.
pub fn field_matches(operator: &FieldOperator, actual: &str, expected: &str) -> bool {
    match operator {
        FieldOperator::Eq => actual == expected,
        FieldOperator::Ne => actual != expected,
        FieldOperator::Contains => actual.contains(expected),
        FieldOperator::Gt | FieldOperator::Lt => {
            let numeric = if actual.is_empty() || expected.is_empty() {
                None
            } else {
                actual
                    .parse::<f64>()
                    .ok()
                    .zip(expected.parse::<f64>().ok())
            };

            match (operator, numeric) {
                (FieldOperator::Gt, Some((a, e))) => a > e,
                (FieldOperator::Lt, Some((a, e))) => a < e,
                (FieldOperator::Gt, None) => actual > expected,
                (FieldOperator::Lt, None) => actual < expected,
                _ => false,
            }
        }
        FieldOperator::Unknown(_) => false,
    }
}
