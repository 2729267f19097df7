//! Flat snapshots of a form graph and their restoration.
//!
//! A snapshot keeps the live identities of capture time and encodes the tree only
//! through forward-looking parent references, so it can be stored as an opaque
//! JSON blob and rebuilt in any later identity space.

mod restore;
mod versions;

pub use restore::{RestoreReport, restore};
pub use versions::{capture_version, restore_version};

use crate::error::SnapshotError;
use crate::model::{
    Attachment, ContainerId, ContainerKind, ContainerNode, FieldId, FieldNode, FormGraph, FormId,
    Page, PageId,
};
use crate::rules::RuleExpression;
use crate::store::FormStore;
use serde::{Deserialize, Serialize};

/// Highest snapshot layout this crate reads and the one it writes.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default = "first_format")]
    pub format: u32,
    pub form: FormSnapshot,
    #[serde(default)]
    pub fields: Vec<FieldSnapshot>,
    #[serde(default)]
    pub containers: Vec<ContainerSnapshot>,
    #[serde(default)]
    pub pages: Vec<PageSnapshot>,
}

fn first_format() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub settings: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSnapshot {
    pub id: FieldId,
    #[serde(rename = "type")]
    pub field_type: String,
    pub name: String,
    #[serde(default)]
    pub element_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub container_id: Option<ContainerId>,
    #[serde(default)]
    pub parent_field_id: Option<FieldId>,
    #[serde(default)]
    pub page_id: Option<PageId>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub options: serde_json::Value,
    #[serde(default)]
    pub validation_rules: serde_json::Value,
    #[serde(default)]
    pub conditional_logic: Option<RuleExpression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSnapshot {
    pub id: ContainerId,
    #[serde(default)]
    pub parent_id: Option<ContainerId>,
    #[serde(default)]
    pub parent_field_id: Option<FieldId>,
    #[serde(default)]
    pub page_id: Option<PageId>,
    #[serde(rename = "type")]
    pub kind: ContainerKind,
    #[serde(default)]
    pub settings: serde_json::Value,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub conditional_logic: Option<RuleExpression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub id: PageId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub settings: serde_json::Value,
}

impl From<&FieldNode> for FieldSnapshot {
    fn from(field: &FieldNode) -> Self {
        let (page_id, container_id, parent_field_id) = field.attachment.links();
        Self {
            id: field.id,
            field_type: field.field_type.clone(),
            name: field.name.clone(),
            element_id: field.element_id.clone(),
            label: field.label.clone(),
            container_id,
            parent_field_id,
            page_id,
            order: field.order,
            options: field.options.clone(),
            validation_rules: field.validation_rules.clone(),
            conditional_logic: field.conditional_logic.clone(),
        }
    }
}

impl From<&ContainerNode> for ContainerSnapshot {
    fn from(container: &ContainerNode) -> Self {
        let (page_id, parent_id, parent_field_id) = container.attachment.links();
        Self {
            id: container.id,
            parent_id,
            parent_field_id,
            page_id,
            kind: container.kind,
            settings: container.settings.clone(),
            order: container.order,
            conditional_logic: container.conditional_logic.clone(),
        }
    }
}

impl From<&Page> for PageSnapshot {
    fn from(page: &Page) -> Self {
        Self {
            id: page.id,
            title: page.title.clone(),
            order: page.order,
            settings: page.settings.clone(),
        }
    }
}

impl ContainerSnapshot {
    pub fn attachment(&self) -> Attachment {
        Attachment::from_links(self.page_id, self.parent_id, self.parent_field_id)
    }
}

impl FieldSnapshot {
    pub fn attachment(&self) -> Attachment {
        Attachment::from_links(self.page_id, self.container_id, self.parent_field_id)
    }
}

impl Snapshot {
    /// Flattens an in-memory graph.
    pub fn capture(graph: &FormGraph) -> Self {
        Self {
            format: SNAPSHOT_FORMAT_VERSION,
            form: FormSnapshot {
                name: graph.form.name.clone(),
                is_template: graph.form.is_template,
                settings: graph.form.settings.clone(),
            },
            fields: graph.fields.iter().map(FieldSnapshot::from).collect(),
            containers: graph.containers.iter().map(ContainerSnapshot::from).collect(),
            pages: graph.pages.iter().map(PageSnapshot::from).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// Decodes a stored snapshot, refusing layouts newer than this crate understands.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let raw: serde_json::Value =
            serde_json::from_str(json).map_err(|e| SnapshotError::Decode(e.to_string()))?;
        let found = raw
            .get("format")
            .and_then(serde_json::Value::as_u64)
            .map_or(first_format(), |f| u32::try_from(f).unwrap_or(u32::MAX));
        check_format(found)?;
        serde_json::from_value(raw).map_err(|e| SnapshotError::Decode(e.to_string()))
    }

    pub fn node_count(&self) -> usize {
        self.pages.len() + self.containers.len() + self.fields.len()
    }
}

pub(crate) fn check_format(found: u32) -> Result<(), SnapshotError> {
    if found > SNAPSHOT_FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedFormat {
            found,
            supported: SNAPSHOT_FORMAT_VERSION,
        });
    }
    Ok(())
}

/// Captures the current state of a stored form.
pub fn build_snapshot<S: FormStore>(store: &S, form_id: FormId) -> Result<Snapshot, SnapshotError> {
    if store.form(form_id)?.is_none() {
        return Err(SnapshotError::FormNotFound(form_id));
    }
    let graph = FormGraph::load(store, form_id)?;
    Ok(Snapshot::capture(&graph))
}
