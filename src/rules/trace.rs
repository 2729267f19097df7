use super::{Action, FieldValue, Operator};
use itertools::Itertools;

/// A record of how a rule expression was evaluated, including the values seen.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleTrace {
    /// The expression had no usable condition.
    Vacuous,
    Combined {
        op_symbol: &'static str,
        children: Vec<RuleTrace>,
        outcome: bool,
    },
    Condition {
        /// The resolved data key, `None` when the target could not be resolved.
        key: Option<String>,
        operator: Operator,
        expected: FieldValue,
        /// The value found under `key`, `None` when missing.
        actual: Option<FieldValue>,
        outcome: bool,
    },
}

impl RuleTrace {
    pub fn outcome(&self) -> bool {
        match self {
            RuleTrace::Vacuous => true,
            RuleTrace::Combined { outcome, .. } | RuleTrace::Condition { outcome, .. } => *outcome,
        }
    }

    pub fn precedence(&self) -> u8 {
        match self {
            RuleTrace::Combined { op_symbol, .. } => match *op_symbol {
                "OR" => 1,
                "AND" => 2,
                _ => 0,
            },
            RuleTrace::Condition { .. } | RuleTrace::Vacuous => 9,
        }
    }
}

/// The outcome of evaluating one node's rule expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// Whether the node is visible (or applicable).
    pub visible: bool,
    pub action: Action,
    pub trace: RuleTrace,
}

impl Verdict {
    /// A human-readable explanation of the verdict.
    pub fn reason(&self) -> String {
        TraceFormatter::format_verdict(self)
    }
}

/// Formats rule traces into human-readable strings.
pub struct TraceFormatter;

impl TraceFormatter {
    pub fn format_verdict(verdict: &Verdict) -> String {
        let state = if verdict.visible { "visible" } else { "hidden" };
        if let RuleTrace::Vacuous = verdict.trace {
            return format!("{}: no conditions", state);
        }
        let matched = if verdict.trace.outcome() { "matched" } else { "did not match" };
        let action = match verdict.action {
            Action::Show => "show",
            Action::Hide => "hide",
        };
        format!(
            "{} ({} rule {}): {}",
            state,
            action,
            matched,
            Self::format_trace(&verdict.trace)
        )
    }

    pub fn format_trace(trace: &RuleTrace) -> String {
        Self::format_recursive(trace, 0)
    }

    /// Recursively formats the trace, adding parentheses only when necessary.
    fn format_recursive(trace: &RuleTrace, parent_precedence: u8) -> String {
        let current_precedence = trace.precedence();
        let body = match trace {
            RuleTrace::Vacuous => "true".to_string(),
            RuleTrace::Combined {
                op_symbol,
                children,
                ..
            } => children
                .iter()
                .map(|child| Self::format_recursive(child, current_precedence))
                .join(&format!(" {} ", op_symbol)),
            RuleTrace::Condition {
                key,
                operator,
                expected,
                actual,
                ..
            } => {
                let subject = match (key, actual) {
                    (Some(key), Some(value)) => format!("${} (was {})", key, value),
                    (Some(key), None) => format!("${} (missing)", key),
                    (None, _) => "<unresolved target>".to_string(),
                };
                if Self::is_unary(operator) {
                    format!("{} {}", subject, operator)
                } else {
                    format!("{} {} {}", subject, operator, expected)
                }
            }
        };

        if current_precedence < parent_precedence {
            format!("({})", body)
        } else {
            body
        }
    }

    fn is_unary(operator: &Operator) -> bool {
        matches!(
            operator,
            Operator::IsEmpty | Operator::IsNotEmpty | Operator::Checked | Operator::Unchecked
        )
    }
}
