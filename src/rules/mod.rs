//! Conditional-logic expressions: evaluation and identity remapping.
//!
//! Evaluation never fails. Anything the engine cannot interpret degrades to the
//! most permissive reading: unrecognized payloads are visible, unresolvable targets
//! follow the missing-value policy of their operator.

mod evaluator;
pub mod expression;
pub mod operators;
mod remap;
mod resolve;
pub mod trace;
pub mod value;

pub use evaluator::RuleEvaluator;
pub use expression::*;
pub use remap::{FieldIdMap, remap_targets};
pub use resolve::{ByElementId, ByFieldName, FieldIndex, TargetResolver};
pub use trace::*;
pub use value::*;

/// Evaluates `expr` against render-time values keyed by element identifier.
pub fn evaluate(expr: Option<&RuleExpression>, values: &ValueMap, fields: &FieldIndex) -> bool {
    RuleEvaluator::new(ByElementId::new(fields), values).evaluate(expr)
}

/// Evaluates `expr` against data keyed by field name, such as a finished submission.
pub fn evaluate_by_name(
    expr: Option<&RuleExpression>,
    data_by_name: &ValueMap,
    fields: &FieldIndex,
) -> bool {
    RuleEvaluator::new(ByFieldName::new(fields), data_by_name).evaluate(expr)
}
