use super::{Condition, FlatRules, GroupedRules, RuleExpression, RuleGroup};
use crate::model::FieldId;
use ahash::AHashMap;
use itertools::Itertools;

/// Old field identity to new field identity.
pub type FieldIdMap = AHashMap<FieldId, FieldId>;

/// Returns a copy of `expr` with every `targetFieldId` rewritten through `map`.
///
/// Ids missing from `map`, legacy `targetElementId` references and unrecognized
/// payloads are carried over untouched. Applying the same map twice is a no-op
/// as long as new ids are not themselves keys of the map.
pub fn remap_targets(expr: &RuleExpression, map: &FieldIdMap) -> RuleExpression {
    expr.remap_targets(map)
}

impl RuleExpression {
    pub fn remap_targets(&self, map: &FieldIdMap) -> RuleExpression {
        match self {
            RuleExpression::Grouped(rules) => RuleExpression::Grouped(GroupedRules {
                action: rules.action,
                groups_match: rules.groups_match,
                groups: rules
                    .groups
                    .iter()
                    .map(|group| RuleGroup {
                        match_mode: group.match_mode,
                        conditions: remap_conditions(&group.conditions, map),
                    })
                    .collect(),
            }),
            RuleExpression::Flat(rules) => RuleExpression::Flat(FlatRules {
                action: rules.action,
                match_mode: rules.match_mode,
                conditions: remap_conditions(&rules.conditions, map),
            }),
            RuleExpression::Unrecognized(raw) => RuleExpression::Unrecognized(raw.clone()),
        }
    }

    /// Distinct field identities referenced by the expression, in first-seen order.
    pub fn target_field_ids(&self) -> Vec<FieldId> {
        self.conditions()
            .filter_map(|c| c.target_field_id)
            .unique()
            .collect()
    }

    /// Referenced field identities that `map` cannot translate.
    pub fn unmapped_targets(&self, map: &FieldIdMap) -> Vec<FieldId> {
        self.target_field_ids()
            .into_iter()
            .filter(|id| !map.contains_key(id))
            .collect()
    }
}

fn remap_conditions(conditions: &[Condition], map: &FieldIdMap) -> Vec<Condition> {
    conditions
        .iter()
        .map(|c| Condition {
            target_field_id: c
                .target_field_id
                .map(|id| map.get(&id).copied().unwrap_or(id)),
            target_element_id: c.target_element_id.clone(),
            operator: c.operator.clone(),
            value: c.value.clone(),
        })
        .collect()
}
