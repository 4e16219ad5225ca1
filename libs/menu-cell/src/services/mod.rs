pub mod evaluator;
pub mod rules;

pub use rules::MenuRuleService;
