use std::collections::{HashMap, HashSet};

use menu_cell::models::{
    ConditionOperator, FieldOperator, MenuRule, MenuRuleSet, PatientContext, RuleCondition,
    TagMatchMode,
};
use menu_cell::services::evaluator::{evaluate, field_matches, rule_matches};

fn rule(id: &str, priority: i32, enabled: bool, conditions: Vec<RuleCondition>) -> MenuRule {
    MenuRule {
        id: id.to_string(),
        name: format!("rule {}", id),
        rich_menu_id: format!("richmenu-{}", id),
        priority,
        enabled,
        condition_operator: ConditionOperator::And,
        conditions,
    }
}

fn tag_condition(tag_ids: &[&str], match_mode: TagMatchMode) -> RuleCondition {
    RuleCondition::Tag {
        tag_ids: tag_ids.iter().map(|t| t.to_string()).collect(),
        match_mode,
    }
}

fn mark_condition(values: &[&str]) -> RuleCondition {
    RuleCondition::Mark {
        values: values.iter().map(|v| v.to_string()).collect(),
    }
}

fn field_condition(field_id: &str, operator: FieldOperator, value: &str) -> RuleCondition {
    RuleCondition::Field {
        field_id: field_id.to_string(),
        operator,
        value: value.to_string(),
    }
}

fn context_with_tags(tags: &[&str]) -> PatientContext {
    PatientContext {
        tag_ids: tags.iter().map(|t| t.to_string()).collect(),
        mark: None,
        fields: HashMap::new(),
    }
}

#[test]
fn test_lowest_priority_enabled_match_wins() {
    let tagged = tag_condition(&["vip"], TagMatchMode::Any);
    let rules = vec![
        rule("a", 3, true, vec![tagged.clone()]),
        rule("b", 1, true, vec![tagged.clone()]),
        rule("c", 2, false, vec![tagged.clone()]),
    ];
    let context = context_with_tags(&["vip"]);

    let matched = evaluate(&rules, &context).unwrap();
    assert_eq!(matched.id, "b");
}

#[test]
fn test_disabled_rules_are_excluded_entirely() {
    // The disabled priority-2 rule would match, but must never be evaluated;
    // the priority-3 rule is the highest-priority enabled match.
    let rules = vec![
        rule("a", 3, true, vec![tag_condition(&["member"], TagMatchMode::Any)]),
        rule("b", 1, true, vec![tag_condition(&["vip"], TagMatchMode::Any)]),
        rule("c", 2, false, vec![tag_condition(&["member"], TagMatchMode::Any)]),
    ];
    let context = context_with_tags(&["member"]);

    let matched = evaluate(&rules, &context).unwrap();
    assert_eq!(matched.id, "a");
}

#[test]
fn test_no_match_returns_none() {
    let rules = vec![rule("a", 1, true, vec![tag_condition(&["vip"], TagMatchMode::Any)])];
    let context = context_with_tags(&["member"]);

    assert!(evaluate(&rules, &context).is_none());
}

#[test]
fn test_equal_priority_keeps_configured_order() {
    let tagged = tag_condition(&["vip"], TagMatchMode::Any);
    let rules = vec![
        rule("first", 1, true, vec![tagged.clone()]),
        rule("second", 1, true, vec![tagged.clone()]),
    ];
    let context = context_with_tags(&["vip"]);

    assert_eq!(evaluate(&rules, &context).unwrap().id, "first");
}

#[test]
fn test_rule_without_conditions_never_matches() {
    let context = context_with_tags(&["vip"]);

    let mut empty_and = rule("a", 1, true, vec![]);
    empty_and.condition_operator = ConditionOperator::And;
    assert!(!rule_matches(&empty_and, &context));

    let mut empty_or = rule("b", 1, true, vec![]);
    empty_or.condition_operator = ConditionOperator::Or;
    assert!(!rule_matches(&empty_or, &context));
}

#[test]
fn test_and_requires_every_condition() {
    let mut r = rule(
        "a",
        1,
        true,
        vec![
            tag_condition(&["vip"], TagMatchMode::Any),
            mark_condition(&["active"]),
        ],
    );
    r.condition_operator = ConditionOperator::And;

    let mut context = context_with_tags(&["vip"]);
    assert!(!rule_matches(&r, &context));

    context.mark = Some("active".to_string());
    assert!(rule_matches(&r, &context));
}

#[test]
fn test_or_requires_any_condition() {
    let mut r = rule(
        "a",
        1,
        true,
        vec![
            tag_condition(&["vip"], TagMatchMode::Any),
            mark_condition(&["active"]),
        ],
    );
    r.condition_operator = ConditionOperator::Or;

    let context = context_with_tags(&["vip"]);
    assert!(rule_matches(&r, &context));

    let no_overlap = context_with_tags(&["member"]);
    assert!(!rule_matches(&r, &no_overlap));
}

#[test]
fn test_tag_condition_any_and_all_modes() {
    let context = context_with_tags(&["a", "b"]);

    let any = rule("r", 1, true, vec![tag_condition(&["b", "z"], TagMatchMode::Any)]);
    assert!(rule_matches(&any, &context));

    let all_hit = rule("r", 1, true, vec![tag_condition(&["a", "b"], TagMatchMode::All)]);
    assert!(rule_matches(&all_hit, &context));

    let all_miss = rule("r", 1, true, vec![tag_condition(&["a", "z"], TagMatchMode::All)]);
    assert!(!rule_matches(&all_miss, &context));
}

#[test]
fn test_tag_condition_with_empty_id_list_never_matches() {
    let context = context_with_tags(&["a"]);

    let empty = rule("r", 1, true, vec![tag_condition(&[], TagMatchMode::Any)]);
    assert!(!rule_matches(&empty, &context));
}

#[test]
fn test_mark_condition_is_membership() {
    let r = rule("r", 1, true, vec![mark_condition(&["active", "paused"])]);

    let mut context = PatientContext::default();
    assert!(!rule_matches(&r, &context));

    context.mark = Some("paused".to_string());
    assert!(rule_matches(&r, &context));

    context.mark = Some("churned".to_string());
    assert!(!rule_matches(&r, &context));
}

#[test]
fn test_field_condition_reads_patient_fields() {
    let r = rule(
        "r",
        1,
        true,
        vec![field_condition("plan", FieldOperator::Eq, "monthly")],
    );

    let mut context = PatientContext {
        tag_ids: HashSet::new(),
        mark: None,
        fields: HashMap::from([("plan".to_string(), "monthly".to_string())]),
    };
    assert!(rule_matches(&r, &context));

    context.fields.insert("plan".to_string(), "yearly".to_string());
    assert!(!rule_matches(&r, &context));
}

#[test]
fn test_missing_field_compares_as_empty_string() {
    let context = PatientContext::default();

    let ne = rule(
        "r",
        1,
        true,
        vec![field_condition("plan", FieldOperator::Ne, "monthly")],
    );
    assert!(rule_matches(&ne, &context));
}

#[test]
fn test_numeric_comparison_preferred_over_lexicographic() {
    // Lexicographically "10" < "9"; numerically 10 > 9. The numeric path
    // must win when both sides parse.
    assert!(field_matches(&FieldOperator::Gt, "10", "9"));
    assert!(!field_matches(&FieldOperator::Lt, "10", "9"));
    assert!(field_matches(&FieldOperator::Gt, "2.5", "2"));
}

#[test]
fn test_lexicographic_fallback_for_non_numeric_values() {
    assert!(field_matches(&FieldOperator::Lt, "apple", "banana"));
    assert!(field_matches(&FieldOperator::Gt, "pear", "apple"));
}

#[test]
fn test_empty_side_falls_back_to_lexicographic() {
    assert!(field_matches(&FieldOperator::Lt, "", "0"));
    assert!(!field_matches(&FieldOperator::Gt, "", "0"));
}

#[test]
fn test_contains_operator() {
    assert!(field_matches(&FieldOperator::Contains, "semaglutide 2.5mg", "2.5"));
    assert!(!field_matches(&FieldOperator::Contains, "semaglutide", "tirz"));
}

#[test]
fn test_unknown_operator_never_matches() {
    let op = FieldOperator::from(">=".to_string());
    assert_eq!(op, FieldOperator::Unknown(">=".to_string()));
    assert!(!field_matches(&op, "10", "9"));
}

#[test]
fn test_rule_set_blob_deserializes_with_tagged_conditions() {
    let blob = serde_json::json!({
        "version": 4,
        "rules": [
            {
                "id": "vip",
                "name": "VIP menu",
                "rich_menu_id": "richmenu-vip",
                "priority": 1,
                "enabled": true,
                "condition_operator": "OR",
                "conditions": [
                    { "type": "tag", "tag_ids": ["vip"], "match_mode": "all" },
                    { "type": "mark", "values": ["active"] },
                    { "type": "field", "field_id": "visits", "operator": ">=", "value": "3" }
                ]
            }
        ]
    });

    let rule_set: MenuRuleSet = serde_json::from_value(blob).unwrap();
    assert_eq!(rule_set.version, 4);
    assert_eq!(rule_set.rules.len(), 1);
    assert_eq!(rule_set.rules[0].condition_operator, ConditionOperator::Or);

    // The unrecognized ">=" operator deserializes but never matches, so the
    // OR rule still matches through its tag condition.
    let context = context_with_tags(&["vip"]);
    assert!(rule_matches(&rule_set.rules[0], &context));

    let field_only = PatientContext {
        tag_ids: HashSet::new(),
        mark: None,
        fields: HashMap::from([("visits".to_string(), "5".to_string())]),
    };
    assert!(!rule_matches(&rule_set.rules[0], &field_only));
}
