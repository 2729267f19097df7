use super::FormStore;
use crate::error::StoreError;
use crate::model::{Attachment, ContainerId, FieldId, FormId};
use ahash::AHashSet;
use serde::Serialize;
use tracing::{debug, instrument};

/// Counts of nodes removed by a cascading delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletedNodes {
    pub containers: usize,
    pub fields: usize,
}

impl DeletedNodes {
    pub fn total(&self) -> usize {
        self.containers + self.fields
    }
}

/// Deletes a container with every descendant container, every field attached to
/// any of them, and the owned sub-tree of each repeater removed along the way.
#[instrument(skip(store))]
pub fn delete_container_subtree<S: FormStore>(
    store: &mut S,
    id: ContainerId,
) -> Result<DeletedNodes, StoreError> {
    let form_id = store
        .container(id)?
        .ok_or(StoreError::ContainerNotFound(id))?
        .form_id;
    store.transaction(|store| {
        let mut sweep = Sweep::new(form_id);
        sweep.containers.push(id);
        sweep.run(store)
    })
}

/// Deletes a field and, for a repeater, everything it owns.
#[instrument(skip(store))]
pub fn delete_field_subtree<S: FormStore>(
    store: &mut S,
    id: FieldId,
) -> Result<DeletedNodes, StoreError> {
    let form_id = store
        .field(id)?
        .ok_or(StoreError::FieldNotFound(id))?
        .form_id;
    store.transaction(|store| {
        let mut sweep = Sweep::new(form_id);
        sweep.fields.push(id);
        sweep.run(store)
    })
}

/// Worklist of nodes still to delete. Each node is visited once, so a corrupt
/// cyclic graph still terminates.
struct Sweep {
    form_id: FormId,
    containers: Vec<ContainerId>,
    fields: Vec<FieldId>,
    seen_containers: AHashSet<ContainerId>,
    seen_fields: AHashSet<FieldId>,
    deleted: DeletedNodes,
}

impl Sweep {
    fn new(form_id: FormId) -> Self {
        Self {
            form_id,
            containers: Vec::new(),
            fields: Vec::new(),
            seen_containers: AHashSet::new(),
            seen_fields: AHashSet::new(),
            deleted: DeletedNodes::default(),
        }
    }

    fn run<S: FormStore>(mut self, store: &mut S) -> Result<DeletedNodes, StoreError> {
        loop {
            if let Some(id) = self.containers.pop() {
                if self.seen_containers.insert(id) {
                    self.enqueue_children(store, Attachment::Container(id))?;
                    store.delete_container(id)?;
                    self.deleted.containers += 1;
                }
            } else if let Some(id) = self.fields.pop() {
                if self.seen_fields.insert(id) {
                    self.enqueue_children(store, Attachment::Field(id))?;
                    store.delete_field(id)?;
                    self.deleted.fields += 1;
                }
            } else {
                break;
            }
        }
        debug!(
            containers = self.deleted.containers,
            fields = self.deleted.fields,
            "cascade delete finished"
        );
        Ok(self.deleted)
    }

    fn enqueue_children<S: FormStore>(
        &mut self,
        store: &S,
        anchor: Attachment,
    ) -> Result<(), StoreError> {
        self.containers.extend(
            store
                .child_containers(self.form_id, anchor)?
                .into_iter()
                .map(|c| c.id),
        );
        self.fields.extend(
            store
                .child_fields(self.form_id, anchor)?
                .into_iter()
                .map(|f| f.id),
        );
        Ok(())
    }
}
