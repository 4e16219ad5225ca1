use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::error::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMatchMode {
    #[default]
    Any,
    All,
}

/// Comparison operator for field conditions. Operators outside the known set
/// deserialize to `Unknown` and never match, rather than failing the whole
/// rule-set blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldOperator {
    Eq,
    Ne,
    Contains,
    Gt,
    Lt,
    Unknown(String),
}

impl From<String> for FieldOperator {
    fn from(value: String) -> Self {
        match value.as_str() {
            "=" => FieldOperator::Eq,
            "!=" => FieldOperator::Ne,
            "contains" => FieldOperator::Contains,
            ">" => FieldOperator::Gt,
            "<" => FieldOperator::Lt,
            _ => FieldOperator::Unknown(value),
        }
    }
}

impl From<FieldOperator> for String {
    fn from(value: FieldOperator) -> Self {
        match value {
            FieldOperator::Eq => "=".to_string(),
            FieldOperator::Ne => "!=".to_string(),
            FieldOperator::Contains => "contains".to_string(),
            FieldOperator::Gt => ">".to_string(),
            FieldOperator::Lt => "<".to_string(),
            FieldOperator::Unknown(raw) => raw,
        }
    }
}

/// One typed condition inside a rule. Closed set: adding a kind is a
/// compile-time-checked enumeration change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RuleCondition {
    Tag {
        #[serde(default)]
        tag_ids: Vec<String>,
        #[serde(default)]
        match_mode: TagMatchMode,
    },
    Mark {
        #[serde(default)]
        values: Vec<String>,
    },
    Field {
        field_id: String,
        operator: FieldOperator,
        #[serde(default)]
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConditionOperator {
    And,
    Or,
}

impl Default for ConditionOperator {
    fn default() -> Self {
        ConditionOperator::And
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuRule {
    pub id: String,
    pub name: String,
    /// LINE rich menu shown to patients this rule matches.
    pub rich_menu_id: String,
    /// Lower evaluates first.
    pub priority: i32,
    pub enabled: bool,
    #[serde(default)]
    pub condition_operator: ConditionOperator,
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
}

/// The full ordered rule list, persisted as one versioned blob under a
/// tenant-scoped settings key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MenuRuleSet {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub rules: Vec<MenuRule>,
}

/// The patient attributes rules are evaluated against.
#[derive(Debug, Clone, Default)]
pub struct PatientContext {
    pub tag_ids: HashSet<String>,
    pub mark: Option<String>,
    pub fields: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRulesRequest {
    pub rules: Vec<MenuRule>,
}

#[derive(Debug, Clone, Error)]
pub enum MenuError {
    #[error("Menu rules not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<MenuError> for AppError {
    fn from(err: MenuError) -> Self {
        let message = err.to_string();
        match err {
            MenuError::NotFound => AppError::NotFound(message),
            MenuError::ValidationError(_) => AppError::ValidationError(message),
            MenuError::DatabaseError(_) => AppError::Database(message),
        }
    }
}
