use super::{ContainerNode, FieldNode, FormDefinition, FormId, Page};
use crate::error::StoreError;
use crate::rules::FieldIndex;
use crate::store::FormStore;
use crate::tree::{PageForest, build_page_forests};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Every page and node of one form, held in memory in storage order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormGraph {
    pub form: FormDefinition,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub containers: Vec<ContainerNode>,
    #[serde(default)]
    pub fields: Vec<FieldNode>,
}

impl FormGraph {
    /// Reads a whole form out of a store.
    pub fn load<S: FormStore>(store: &S, form_id: FormId) -> Result<Self, StoreError> {
        let form = store
            .form(form_id)?
            .ok_or(StoreError::FormNotFound(form_id))?;
        Ok(Self {
            form,
            pages: store.pages(form_id)?,
            containers: store.containers(form_id)?,
            fields: store.fields(form_id)?,
        })
    }

    /// Whether the form is split into pages.
    pub fn is_multi_page(&self) -> bool {
        !self.pages.is_empty()
    }

    /// Ordered forests for rendering, one per page (or a single page-less one).
    pub fn forests(&self) -> Vec<PageForest<'_>> {
        build_page_forests(self.form.id, &self.pages, &self.containers, &self.fields)
    }

    pub fn field_index(&self) -> FieldIndex<'_> {
        FieldIndex::new(&self.fields)
    }

    /// Field names used by more than one field, in first-seen order.
    ///
    /// Uniqueness is not enforced by the engine; callers decide whether to warn.
    pub fn duplicate_field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .map(|f| f.name.as_str())
            .duplicates()
            .collect()
    }
}
