use super::FieldValue;
use crate::model::FieldId;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A conditional-logic payload attached to a container or field.
///
/// Payloads are stored as loose JSON by the builder. Anything that is neither the
/// grouped nor the legacy flat shape is kept verbatim as `Unrecognized` and
/// evaluates as if no conditions were set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleExpression {
    Grouped(GroupedRules),
    Flat(FlatRules),
    Unrecognized(serde_json::Value),
}

/// The current shape: rule groups combined by `groups_match`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedRules {
    #[serde(default)]
    pub action: Action,
    #[serde(default, alias = "groups_match")]
    pub groups_match: MatchMode,
    pub groups: Vec<RuleGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGroup {
    #[serde(default, rename = "match")]
    pub match_mode: MatchMode,
    pub conditions: Vec<Condition>,
}

/// The legacy shape: one flat list of conditions under a single match mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRules {
    #[serde(default)]
    pub action: Action,
    #[serde(default, rename = "match")]
    pub match_mode: MatchMode,
    pub conditions: Vec<Condition>,
}

/// One comparison against another field's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(
        default,
        deserialize_with = "lenient_field_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_field_id: Option<FieldId>,
    /// Legacy string reference to a field's element identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_element_id: Option<String>,
    pub operator: Operator,
    #[serde(default)]
    pub value: FieldValue,
}

/// Builders leave `targetFieldId` as `""` or a legacy number when unset; those read as absent.
fn lenient_field_id<'de, D>(deserializer: D) -> Result<Option<FieldId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => uuid::Uuid::parse_str(&s).ok().map(FieldId::from),
        _ => None,
    })
}

impl Condition {
    /// A condition targeting a field by identity.
    pub fn on_field(target: FieldId, operator: Operator, value: impl Into<FieldValue>) -> Self {
        Self {
            target_field_id: Some(target),
            target_element_id: None,
            operator,
            value: value.into(),
        }
    }

    /// A condition using the legacy element identifier reference.
    pub fn on_element(element_id: &str, operator: Operator, value: impl Into<FieldValue>) -> Self {
        Self {
            target_field_id: None,
            target_element_id: Some(element_id.to_string()),
            operator,
            value: value.into(),
        }
    }
}

/// What a matching expression does to its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    Show,
    Hide,
}

/// How a list of boolean results is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    #[serde(alias = "and")]
    All,
    #[serde(alias = "or")]
    Any,
}

impl MatchMode {
    pub fn combine<I: IntoIterator<Item = bool>>(&self, results: I) -> bool {
        let mut results = results.into_iter();
        match self {
            MatchMode::All => results.all(|r| r),
            MatchMode::Any => results.any(|r| r),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            MatchMode::All => "AND",
            MatchMode::Any => "OR",
        }
    }
}

/// Defines the operator enum together with its wire names.
macro_rules! define_operators {
    ( $( $(#[$meta:meta])* ($variant:ident, $name:literal) ),* $(,)? ) => {
        /// Comparison operator of a condition.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum Operator {
            $( $(#[$meta])* $variant, )*
            /// An operator this engine does not know; always evaluates to `false`.
            Unknown(String),
        }

        impl Operator {
            pub fn as_str(&self) -> &str {
                match self {
                    $( Operator::$variant => $name, )*
                    Operator::Unknown(name) => name.as_str(),
                }
            }

            pub fn parse(name: &str) -> Self {
                match name {
                    $( $name => Operator::$variant, )*
                    other => Operator::Unknown(other.to_string()),
                }
            }
        }
    };
}

define_operators! {
    (Equals, "equals"),
    (NotEquals, "not_equals"),
    (Contains, "contains"),
    (NotContains, "not_contains"),
    (GreaterThan, "greater_than"),
    (LessThan, "less_than"),
    (GreaterThanOrEqual, "greater_than_or_equal"),
    (LessThanOrEqual, "less_than_or_equal"),
    /// Date alias of `GreaterThan`.
    (After, "after"),
    /// Date alias of `LessThan`.
    (Before, "before"),
    (AfterOrEqual, "after_or_equal"),
    (BeforeOrEqual, "before_or_equal"),
    (IsEmpty, "is_empty"),
    (IsNotEmpty, "is_not_empty"),
    (In, "in"),
    (NotIn, "not_in"),
    (Checked, "checked"),
    (Unchecked, "unchecked"),
}

impl From<String> for Operator {
    fn from(name: String) -> Self {
        Operator::parse(&name)
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RuleExpression {
    /// A legacy flat expression.
    pub fn flat(action: Action, match_mode: MatchMode, conditions: Vec<Condition>) -> Self {
        RuleExpression::Flat(FlatRules {
            action,
            match_mode,
            conditions,
        })
    }

    /// A grouped expression.
    pub fn grouped(action: Action, groups_match: MatchMode, groups: Vec<RuleGroup>) -> Self {
        RuleExpression::Grouped(GroupedRules {
            action,
            groups_match,
            groups,
        })
    }

    /// Reads a payload, keeping anything unrecognized verbatim.
    pub fn from_json(value: serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(RuleExpression::Unrecognized(value))
    }

    /// Every condition of the expression, in declaration order.
    pub fn conditions(&self) -> Box<dyn Iterator<Item = &Condition> + '_> {
        match self {
            RuleExpression::Grouped(rules) => {
                Box::new(rules.groups.iter().flat_map(|g| g.conditions.iter()))
            }
            RuleExpression::Flat(rules) => Box::new(rules.conditions.iter()),
            RuleExpression::Unrecognized(_) => Box::new(std::iter::empty()),
        }
    }

    /// Whether the expression carries no condition at all.
    pub fn is_vacuous(&self) -> bool {
        self.conditions().next().is_none()
    }
}

impl RuleGroup {
    pub fn new(match_mode: MatchMode, conditions: Vec<Condition>) -> Self {
        Self {
            match_mode,
            conditions,
        }
    }
}
