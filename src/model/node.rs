use super::{ContainerId, FieldId, FormId, PageId};
use crate::rules::RuleExpression;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The point a container or field hangs from.
///
/// Exactly one attachment exists per node, so a node can never be linked to a page
/// and a parent container at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Attachment {
    /// Top level of a form without pages.
    #[default]
    Root,
    /// Top level of one page of a multi-step form.
    Page(PageId),
    /// Child of a layout container.
    Container(ContainerId),
    /// Owned by a repeater field: the top of a repeater sub-tree for containers,
    /// a nested field for fields.
    Field(FieldId),
}

impl Attachment {
    /// Splits the attachment into the nullable link columns used by flat records.
    pub fn links(&self) -> (Option<PageId>, Option<ContainerId>, Option<FieldId>) {
        match *self {
            Attachment::Root => (None, None, None),
            Attachment::Page(id) => (Some(id), None, None),
            Attachment::Container(id) => (None, Some(id), None),
            Attachment::Field(id) => (None, None, Some(id)),
        }
    }

    /// Rebuilds an attachment from nullable link columns.
    ///
    /// Flat records written by older builders may carry several links at once; the
    /// most specific one wins (container, then repeater field, then page).
    pub fn from_links(
        page: Option<PageId>,
        container: Option<ContainerId>,
        field: Option<FieldId>,
    ) -> Self {
        match (container, field, page) {
            (Some(id), _, _) => Attachment::Container(id),
            (None, Some(id), _) => Attachment::Field(id),
            (None, None, Some(id)) => Attachment::Page(id),
            (None, None, None) => Attachment::Root,
        }
    }
}

impl fmt::Display for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attachment::Root => write!(f, "root"),
            Attachment::Page(id) => write!(f, "page:{}", id),
            Attachment::Container(id) => write!(f, "container:{}", id),
            Attachment::Field(id) => write!(f, "field:{}", id),
        }
    }
}

/// The closed vocabulary of layout element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Container,
    Row,
    Column,
    Card,
    Tabs,
    Tab,
    Table,
    TableRow,
    TableCell,
    Carousel,
    CarouselSlide,
    Section,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Container => "container",
            ContainerKind::Row => "row",
            ContainerKind::Column => "column",
            ContainerKind::Card => "card",
            ContainerKind::Tabs => "tabs",
            ContainerKind::Tab => "tab",
            ContainerKind::Table => "table",
            ContainerKind::TableRow => "table_row",
            ContainerKind::TableCell => "table_cell",
            ContainerKind::Carousel => "carousel",
            ContainerKind::CarouselSlide => "carousel_slide",
            ContainerKind::Section => "section",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed branch node of the form tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerNode {
    pub id: ContainerId,
    pub form_id: FormId,
    pub kind: ContainerKind,
    #[serde(default)]
    pub attachment: Attachment,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub settings: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_logic: Option<RuleExpression>,
}

impl ContainerNode {
    /// The creation payload that would produce a copy of this node.
    pub fn to_draft(&self) -> NewContainer {
        NewContainer {
            kind: self.kind,
            attachment: self.attachment,
            order: self.order,
            settings: self.settings.clone(),
            conditional_logic: self.conditional_logic.clone(),
        }
    }
}

/// A leaf node: one data-collecting control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    pub id: FieldId,
    pub form_id: FormId,
    pub field_type: String,
    /// Data binding key, unique within the form by convention.
    pub name: String,
    /// Element identifier used as the key of render-time value maps.
    #[serde(default)]
    pub element_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub attachment: Attachment,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub options: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_logic: Option<RuleExpression>,
    #[serde(default)]
    pub validation_rules: serde_json::Value,
}

impl FieldNode {
    pub fn to_draft(&self) -> NewField {
        NewField {
            field_type: self.field_type.clone(),
            name: self.name.clone(),
            element_id: self.element_id.clone(),
            label: self.label.clone(),
            attachment: self.attachment,
            order: self.order,
            options: self.options.clone(),
            conditional_logic: self.conditional_logic.clone(),
            validation_rules: self.validation_rules.clone(),
        }
    }
}

/// Creation payload for a `ContainerNode`; the store assigns the identity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContainer {
    pub kind: ContainerKind,
    pub attachment: Attachment,
    pub order: i32,
    pub settings: serde_json::Value,
    pub conditional_logic: Option<RuleExpression>,
}

impl NewContainer {
    pub fn new(kind: ContainerKind, attachment: Attachment, order: i32) -> Self {
        Self {
            kind,
            attachment,
            order,
            settings: serde_json::Value::Null,
            conditional_logic: None,
        }
    }

    pub fn into_node(self, id: ContainerId, form_id: FormId) -> ContainerNode {
        ContainerNode {
            id,
            form_id,
            kind: self.kind,
            attachment: self.attachment,
            order: self.order,
            settings: self.settings,
            conditional_logic: self.conditional_logic,
        }
    }
}

/// Creation payload for a `FieldNode`; the store assigns the identity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewField {
    pub field_type: String,
    pub name: String,
    pub element_id: String,
    pub label: String,
    pub attachment: Attachment,
    pub order: i32,
    pub options: serde_json::Value,
    pub conditional_logic: Option<RuleExpression>,
    pub validation_rules: serde_json::Value,
}

impl NewField {
    /// A field whose element identifier and label default to its name.
    pub fn new(field_type: &str, name: &str, attachment: Attachment, order: i32) -> Self {
        Self {
            field_type: field_type.to_string(),
            name: name.to_string(),
            element_id: name.to_string(),
            label: name.to_string(),
            attachment,
            order,
            options: serde_json::Value::Null,
            conditional_logic: None,
            validation_rules: serde_json::Value::Null,
        }
    }

    pub fn with_logic(mut self, logic: RuleExpression) -> Self {
        self.conditional_logic = Some(logic);
        self
    }

    pub fn into_node(self, id: FieldId, form_id: FormId) -> FieldNode {
        FieldNode {
            id,
            form_id,
            field_type: self.field_type,
            name: self.name,
            element_id: self.element_id,
            label: self.label,
            attachment: self.attachment,
            order: self.order,
            options: self.options,
            conditional_logic: self.conditional_logic,
            validation_rules: self.validation_rules,
        }
    }
}
