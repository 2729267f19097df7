use super::Condition;
use crate::model::{FieldId, FieldNode};
use ahash::AHashMap;

/// Identity lookup over the fields of one form.
pub struct FieldIndex<'a> {
    fields: &'a [FieldNode],
    by_id: AHashMap<FieldId, &'a FieldNode>,
}

impl<'a> FieldIndex<'a> {
    pub fn new(fields: &'a [FieldNode]) -> Self {
        let by_id = fields.iter().map(|f| (f.id, f)).collect();
        Self { fields, by_id }
    }

    pub fn get(&self, id: &FieldId) -> Option<&'a FieldNode> {
        self.by_id.get(id).copied()
    }

    /// Linear scan for the first field carrying `element_id`.
    pub fn by_element_id(&self, element_id: &str) -> Option<&'a FieldNode> {
        self.fields.iter().find(|f| f.element_id == element_id)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Strategy turning a condition's target into the key of the value map it reads.
///
/// Returning `None` means the target cannot be resolved; the condition then falls
/// back to the missing-value policy of its operator.
pub trait TargetResolver {
    fn resolve<'c>(&'c self, condition: &'c Condition) -> Option<&'c str>;
}

/// Resolves targets to element identifiers, for render-time value maps.
pub struct ByElementId<'a> {
    fields: &'a FieldIndex<'a>,
}

impl<'a> ByElementId<'a> {
    pub fn new(fields: &'a FieldIndex<'a>) -> Self {
        Self { fields }
    }
}

impl TargetResolver for ByElementId<'_> {
    fn resolve<'c>(&'c self, condition: &'c Condition) -> Option<&'c str> {
        condition
            .target_field_id
            .and_then(|id| self.fields.get(&id))
            .map(|field| field.element_id.as_str())
            .or(condition.target_element_id.as_deref())
    }
}

/// Resolves targets to field names, for data keyed by binding name (e.g. a
/// finished submission).
pub struct ByFieldName<'a> {
    fields: &'a FieldIndex<'a>,
}

impl<'a> ByFieldName<'a> {
    pub fn new(fields: &'a FieldIndex<'a>) -> Self {
        Self { fields }
    }
}

impl TargetResolver for ByFieldName<'_> {
    fn resolve<'c>(&'c self, condition: &'c Condition) -> Option<&'c str> {
        condition
            .target_field_id
            .and_then(|id| self.fields.get(&id))
            .or_else(|| {
                condition
                    .target_element_id
                    .as_deref()
                    .and_then(|element_id| self.fields.by_element_id(element_id))
            })
            .map(|field| field.name.as_str())
    }
}
