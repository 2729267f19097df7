//! The persistence collaborator consumed by the engine.
//!
//! The engine never talks to a storage engine directly. Everything it needs is the
//! `FormStore` trait: create, find, list, update, delete and an all-or-nothing
//! `transaction` wrapping each clone or restore.

use crate::error::StoreError;
use crate::model::{
    Attachment, ContainerId, ContainerNode, FieldId, FieldNode, FormDefinition, FormId,
    FormVersion, NewContainer, NewField, NewForm, NewPage, Page, PageId,
};

mod cascade;
mod memory;
pub(crate) mod staging;

pub use cascade::{DeletedNodes, delete_container_subtree, delete_field_subtree};
pub use memory::MemoryStore;

/// Storage of forms, pages, nodes and versions, keyed by opaque identity.
///
/// Listings return records in insertion order; the tree builder relies on it to
/// break ties between siblings of equal `order`.
pub trait FormStore {
    fn create_form(&mut self, draft: NewForm) -> Result<FormId, StoreError>;
    fn create_page(&mut self, form_id: FormId, draft: NewPage) -> Result<PageId, StoreError>;
    fn create_container(
        &mut self,
        form_id: FormId,
        draft: NewContainer,
    ) -> Result<ContainerId, StoreError>;
    fn create_field(&mut self, form_id: FormId, draft: NewField) -> Result<FieldId, StoreError>;

    fn form(&self, id: FormId) -> Result<Option<FormDefinition>, StoreError>;
    fn page(&self, id: PageId) -> Result<Option<Page>, StoreError>;
    fn container(&self, id: ContainerId) -> Result<Option<ContainerNode>, StoreError>;
    fn field(&self, id: FieldId) -> Result<Option<FieldNode>, StoreError>;

    fn pages(&self, form_id: FormId) -> Result<Vec<Page>, StoreError>;
    fn containers(&self, form_id: FormId) -> Result<Vec<ContainerNode>, StoreError>;
    fn fields(&self, form_id: FormId) -> Result<Vec<FieldNode>, StoreError>;

    /// Containers hanging directly from `anchor`.
    fn child_containers(
        &self,
        form_id: FormId,
        anchor: Attachment,
    ) -> Result<Vec<ContainerNode>, StoreError> {
        Ok(self
            .containers(form_id)?
            .into_iter()
            .filter(|c| c.attachment == anchor)
            .collect())
    }

    /// Fields hanging directly from `anchor`.
    fn child_fields(
        &self,
        form_id: FormId,
        anchor: Attachment,
    ) -> Result<Vec<FieldNode>, StoreError> {
        Ok(self
            .fields(form_id)?
            .into_iter()
            .filter(|f| f.attachment == anchor)
            .collect())
    }

    fn update_form(&mut self, form: &FormDefinition) -> Result<(), StoreError>;
    fn update_container(&mut self, node: &ContainerNode) -> Result<(), StoreError>;
    fn update_field(&mut self, node: &FieldNode) -> Result<(), StoreError>;

    /// Deletes one page. Nodes attached to it are left to the caller.
    fn delete_page(&mut self, id: PageId) -> Result<(), StoreError>;
    /// Deletes one container without touching its descendants.
    fn delete_container(&mut self, id: ContainerId) -> Result<(), StoreError>;
    fn delete_field(&mut self, id: FieldId) -> Result<(), StoreError>;

    fn save_version(&mut self, version: FormVersion) -> Result<(), StoreError>;
    /// Versions of a form, oldest first.
    fn versions(&self, form_id: FormId) -> Result<Vec<FormVersion>, StoreError>;

    /// Runs `f` as one atomic unit: if it fails, none of its writes persist.
    fn transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<StoreError>;
}
