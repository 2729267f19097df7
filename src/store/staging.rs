//! Write-behind bookkeeping for operations that create a node first and fix its
//! links later, once the identities it points at exist.

use super::FormStore;
use crate::error::StoreError;
use crate::model::{
    Attachment, ContainerId, ContainerNode, FieldId, FieldNode, FormId, NewContainer, NewField,
    NodeHandle, UnresolvedReference,
};
use crate::rules::{FieldIdMap, RuleExpression};
use ahash::AHashMap;
use tracing::{debug, warn};

struct Staged<T> {
    node: T,
    dirty: bool,
}

/// Nodes written to a store during one clone or restore, kept in creation order.
pub(crate) struct StagedNodes {
    form_id: FormId,
    containers: Vec<Staged<ContainerNode>>,
    fields: Vec<Staged<FieldNode>>,
    container_pos: AHashMap<ContainerId, usize>,
    field_pos: AHashMap<FieldId, usize>,
}

impl StagedNodes {
    pub(crate) fn new(form_id: FormId) -> Self {
        Self {
            form_id,
            containers: Vec::new(),
            fields: Vec::new(),
            container_pos: AHashMap::new(),
            field_pos: AHashMap::new(),
        }
    }

    pub(crate) fn create_container<S: FormStore>(
        &mut self,
        store: &mut S,
        draft: NewContainer,
    ) -> Result<ContainerId, StoreError> {
        let id = store.create_container(self.form_id, draft.clone())?;
        self.container_pos.insert(id, self.containers.len());
        self.containers.push(Staged {
            node: draft.into_node(id, self.form_id),
            dirty: false,
        });
        Ok(id)
    }

    pub(crate) fn create_field<S: FormStore>(
        &mut self,
        store: &mut S,
        draft: NewField,
    ) -> Result<FieldId, StoreError> {
        let id = store.create_field(self.form_id, draft.clone())?;
        self.field_pos.insert(id, self.fields.len());
        self.fields.push(Staged {
            node: draft.into_node(id, self.form_id),
            dirty: false,
        });
        Ok(id)
    }

    pub(crate) fn relink_container(&mut self, id: ContainerId, attachment: Attachment) {
        if let Some(&pos) = self.container_pos.get(&id) {
            let staged = &mut self.containers[pos];
            if staged.node.attachment != attachment {
                staged.node.attachment = attachment;
                staged.dirty = true;
            }
        }
    }

    pub(crate) fn relink_field(&mut self, id: FieldId, attachment: Attachment) {
        if let Some(&pos) = self.field_pos.get(&id) {
            let staged = &mut self.fields[pos];
            if staged.node.attachment != attachment {
                staged.node.attachment = attachment;
                staged.dirty = true;
            }
        }
    }

    /// Rewrites rule targets of every staged node through `map`.
    ///
    /// Targets with no counterpart are left in place and returned.
    pub(crate) fn remap_rules(&mut self, map: &FieldIdMap) -> Vec<UnresolvedReference> {
        let mut unresolved = Vec::new();
        for staged in &mut self.containers {
            let node = NodeHandle::Container(staged.node.id);
            if let Some(logic) = staged.node.conditional_logic.as_mut() {
                staged.dirty |= remap_logic(logic, map, node, &mut unresolved);
            }
        }
        for staged in &mut self.fields {
            let node = NodeHandle::Field(staged.node.id);
            if let Some(logic) = staged.node.conditional_logic.as_mut() {
                staged.dirty |= remap_logic(logic, map, node, &mut unresolved);
            }
        }
        unresolved
    }

    pub(crate) fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub(crate) fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Persists every node touched since creation. Returns the number of updates.
    pub(crate) fn flush<S: FormStore>(self, store: &mut S) -> Result<usize, StoreError> {
        let mut updates = 0;
        for staged in self.containers.iter().filter(|s| s.dirty) {
            store.update_container(&staged.node)?;
            updates += 1;
        }
        for staged in self.fields.iter().filter(|s| s.dirty) {
            store.update_field(&staged.node)?;
            updates += 1;
        }
        debug!(form_id = %self.form_id, updates, "flushed staged nodes");
        Ok(updates)
    }
}

fn remap_logic(
    logic: &mut RuleExpression,
    map: &FieldIdMap,
    node: NodeHandle,
    unresolved: &mut Vec<UnresolvedReference>,
) -> bool {
    for target in logic.unmapped_targets(map) {
        let reference = UnresolvedReference::RuleTarget { node, target };
        warn!(%reference, "rule target left unresolved");
        unresolved.push(reference);
    }
    let remapped = logic.remap_targets(map);
    if remapped == *logic {
        return false;
    }
    *logic = remapped;
    true
}
