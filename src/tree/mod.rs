//! Assembly of flat container and field collections into ordered forests.

use crate::model::{Attachment, ContainerNode, FieldId, FieldNode, FormId, Page, PageId};
use ahash::AHashMap;
use itertools::Itertools;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Which top level of a form a forest is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub form_id: FormId,
    /// `None` selects the top level of a form without pages.
    pub page_id: Option<PageId>,
}

impl Scope {
    pub fn single_page(form_id: FormId) -> Self {
        Self {
            form_id,
            page_id: None,
        }
    }

    pub fn page(form_id: FormId, page_id: PageId) -> Self {
        Self {
            form_id,
            page_id: Some(page_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Element,
    Field,
}

/// A borrowed node of either kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeRef<'a> {
    Element(&'a ContainerNode),
    Field(&'a FieldNode),
}

impl<'a> NodeRef<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Element(_) => NodeKind::Element,
            NodeRef::Field(_) => NodeKind::Field,
        }
    }

    /// The container type or field type of the node.
    pub fn type_tag(&self) -> &'a str {
        match *self {
            NodeRef::Element(c) => c.kind.as_str(),
            NodeRef::Field(f) => f.field_type.as_str(),
        }
    }

    pub fn order(&self) -> i32 {
        match self {
            NodeRef::Element(c) => c.order,
            NodeRef::Field(f) => f.order,
        }
    }
}

/// A node with its ordered children. Fields never have children.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode<'a> {
    pub node: NodeRef<'a>,
    pub children: Vec<TreeNode<'a>>,
}

impl<'a> TreeNode<'a> {
    pub fn kind(&self) -> NodeKind {
        self.node.kind()
    }

    pub fn type_tag(&self) -> &'a str {
        self.node.type_tag()
    }

    /// Number of nodes in this sub-tree, the node itself included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }
}

impl Serialize for TreeNode<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TreeNode", 4)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("typeTag", self.type_tag())?;
        match self.node {
            NodeRef::Element(container) => state.serialize_field("node", container)?,
            NodeRef::Field(field) => state.serialize_field("node", field)?,
        }
        state.serialize_field("children", &self.children)?;
        state.end()
    }
}

pub type Forest<'a> = Vec<TreeNode<'a>>;

/// The forest of one page, or of the whole form when it has no pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageForest<'a> {
    pub page: Option<&'a Page>,
    pub nodes: Forest<'a>,
}

/// Indexes a form's nodes by attachment so several scopes can be built cheaply.
pub struct TreeBuilder<'a> {
    levels: AHashMap<Attachment, Vec<NodeRef<'a>>>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        form_id: FormId,
        containers: &'a [ContainerNode],
        fields: &'a [FieldNode],
    ) -> Self {
        let mut levels: AHashMap<Attachment, Vec<NodeRef<'a>>> = AHashMap::new();
        // Containers go in first: on equal order they precede fields.
        for container in containers.iter().filter(|c| c.form_id == form_id) {
            levels
                .entry(container.attachment)
                .or_default()
                .push(NodeRef::Element(container));
        }
        for field in fields.iter().filter(|f| f.form_id == form_id) {
            levels
                .entry(field.attachment)
                .or_default()
                .push(NodeRef::Field(field));
        }
        // Stable: equal orders keep their original sequence.
        for siblings in levels.values_mut() {
            siblings.sort_by_key(NodeRef::order);
        }
        Self { levels }
    }

    /// The top level of a page, or of a page-less form for `None`.
    pub fn forest(&self, page_id: Option<PageId>) -> Forest<'a> {
        self.level(page_id.map_or(Attachment::Root, Attachment::Page))
    }

    /// The sub-tree owned by a repeater field.
    pub fn repeater_forest(&self, field_id: FieldId) -> Forest<'a> {
        self.level(Attachment::Field(field_id))
    }

    fn level(&self, anchor: Attachment) -> Forest<'a> {
        self.levels
            .get(&anchor)
            .map(|siblings| siblings.iter().map(|node| self.expand(*node)).collect())
            .unwrap_or_default()
    }

    fn expand(&self, node: NodeRef<'a>) -> TreeNode<'a> {
        let children = match node {
            NodeRef::Element(container) => self.level(Attachment::Container(container.id)),
            NodeRef::Field(_) => Vec::new(),
        };
        TreeNode { node, children }
    }
}

/// Builds the ordered forest of one scope.
pub fn build_forest<'a>(
    containers: &'a [ContainerNode],
    fields: &'a [FieldNode],
    scope: Scope,
) -> Forest<'a> {
    TreeBuilder::new(scope.form_id, containers, fields).forest(scope.page_id)
}

/// Builds one forest per page in page order, or a single forest for a page-less form.
pub fn build_page_forests<'a>(
    form_id: FormId,
    pages: &'a [Page],
    containers: &'a [ContainerNode],
    fields: &'a [FieldNode],
) -> Vec<PageForest<'a>> {
    let builder = TreeBuilder::new(form_id, containers, fields);
    let pages: Vec<&Page> = pages
        .iter()
        .filter(|p| p.form_id == form_id)
        .sorted_by_key(|p| p.order)
        .collect();

    if pages.is_empty() {
        return vec![PageForest {
            page: None,
            nodes: builder.forest(None),
        }];
    }
    pages
        .into_iter()
        .map(|page| PageForest {
            page: Some(page),
            nodes: builder.forest(Some(page.id)),
        })
        .collect()
}
