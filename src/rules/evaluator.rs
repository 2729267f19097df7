use super::operators::{apply, missing_value_policy};
use super::{
    Action, Condition, FieldValue, MatchMode, RuleExpression, RuleTrace,
    TargetResolver, ValueMap, Verdict,
};

/// Evaluates rule expressions against a value map.
///
/// The operator table is shared by every entry point; only the way a condition's
/// target becomes a value-map key varies, through `R`.
pub struct RuleEvaluator<'a, R> {
    resolver: R,
    values: &'a ValueMap,
}

impl<'a, R: TargetResolver> RuleEvaluator<'a, R> {
    pub fn new(resolver: R, values: &'a ValueMap) -> Self {
        Self { resolver, values }
    }

    /// Whether the node carrying `expr` is visible (or applicable).
    ///
    /// Absent, empty and unrecognized expressions are visible.
    pub fn evaluate(&self, expr: Option<&RuleExpression>) -> bool {
        match expr.filter(|expr| !expr.is_vacuous()) {
            Some(RuleExpression::Grouped(rules)) => {
                let matched = rules.groups_match.combine(
                    rules
                        .groups
                        .iter()
                        .filter(|g| !g.conditions.is_empty())
                        .map(|g| self.conditions_hold(g.match_mode, &g.conditions)),
                );
                Self::apply_action(rules.action, matched)
            }
            Some(RuleExpression::Flat(rules)) => {
                let matched = self.conditions_hold(rules.match_mode, &rules.conditions);
                Self::apply_action(rules.action, matched)
            }
            _ => true,
        }
    }

    /// Evaluates `expr` and records how each group and condition contributed.
    pub fn explain(&self, expr: Option<&RuleExpression>) -> Verdict {
        let (action, trace) = match expr.filter(|expr| !expr.is_vacuous()) {
            Some(RuleExpression::Grouped(rules)) => {
                let children: Vec<RuleTrace> = rules
                    .groups
                    .iter()
                    .filter(|g| !g.conditions.is_empty())
                    .map(|g| self.trace_conditions(g.match_mode, &g.conditions))
                    .collect();
                let outcome = rules
                    .groups_match
                    .combine(children.iter().map(RuleTrace::outcome));
                let trace = RuleTrace::Combined {
                    op_symbol: rules.groups_match.symbol(),
                    children,
                    outcome,
                };
                (rules.action, trace)
            }
            Some(RuleExpression::Flat(rules)) => (
                rules.action,
                self.trace_conditions(rules.match_mode, &rules.conditions),
            ),
            _ => (Self::declared_action(expr), RuleTrace::Vacuous),
        };

        let visible = match trace {
            RuleTrace::Vacuous => true,
            _ => Self::apply_action(action, trace.outcome()),
        };
        Verdict {
            visible,
            action,
            trace,
        }
    }

    fn declared_action(expr: Option<&RuleExpression>) -> Action {
        match expr {
            Some(RuleExpression::Grouped(rules)) => rules.action,
            Some(RuleExpression::Flat(rules)) => rules.action,
            Some(RuleExpression::Unrecognized(_)) | None => Action::Show,
        }
    }

    fn apply_action(action: Action, matched: bool) -> bool {
        match action {
            Action::Show => matched,
            Action::Hide => !matched,
        }
    }

    fn conditions_hold(&self, mode: MatchMode, conditions: &[Condition]) -> bool {
        mode.combine(conditions.iter().map(|c| self.condition_holds(c)))
    }

    fn lookup<'c>(
        &'c self,
        condition: &'c Condition,
    ) -> (Option<&'c str>, Option<&'a FieldValue>) {
        let key = self.resolver.resolve(condition);
        let actual = key.and_then(|k| self.values.get(k));
        (key, actual)
    }

    fn condition_holds(&self, condition: &Condition) -> bool {
        match self.lookup(condition) {
            (_, Some(actual)) => apply(&condition.operator, actual, &condition.value),
            (_, None) => missing_value_policy(&condition.operator),
        }
    }

    fn trace_conditions(&self, mode: MatchMode, conditions: &[Condition]) -> RuleTrace {
        let children: Vec<RuleTrace> = conditions
            .iter()
            .map(|c| self.trace_condition(c))
            .collect();
        let outcome = mode.combine(children.iter().map(RuleTrace::outcome));
        RuleTrace::Combined {
            op_symbol: mode.symbol(),
            children,
            outcome,
        }
    }

    fn trace_condition(&self, condition: &Condition) -> RuleTrace {
        let (key, actual) = self.lookup(condition);
        let outcome = match actual {
            Some(value) => apply(&condition.operator, value, &condition.value),
            None => missing_value_policy(&condition.operator),
        };
        RuleTrace::Condition {
            key: key.map(str::to_string),
            operator: condition.operator.clone(),
            expected: condition.value.clone(),
            actual: actual.cloned(),
            outcome,
        }
    }
}
