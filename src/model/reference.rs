use super::{ContainerId, FieldId, PageId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a node of either kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NodeHandle {
    Container(ContainerId),
    Field(FieldId),
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeHandle::Container(id) => write!(f, "container {}", id),
            NodeHandle::Field(id) => write!(f, "field {}", id),
        }
    }
}

/// A pointer inside a copied or restored graph that could not be translated into
/// the new identity space.
///
/// `node` is the identity of the freshly written node; the other side is the
/// stale identity it used to point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reference", rename_all = "snake_case")]
pub enum UnresolvedReference {
    /// Link to a page that was not copied. The node now sits at the root.
    Page { node: NodeHandle, page: PageId },
    /// Link to a parent container that was not copied. The node now sits at the root.
    Container {
        node: NodeHandle,
        container: ContainerId,
    },
    /// Link to an owning repeater field that was not copied.
    Repeater { node: NodeHandle, field: FieldId },
    /// Rule condition whose `targetFieldId` has no counterpart; kept as is.
    RuleTarget { node: NodeHandle, target: FieldId },
}

impl UnresolvedReference {
    pub fn node(&self) -> NodeHandle {
        match *self {
            UnresolvedReference::Page { node, .. }
            | UnresolvedReference::Container { node, .. }
            | UnresolvedReference::Repeater { node, .. }
            | UnresolvedReference::RuleTarget { node, .. } => node,
        }
    }
}

impl fmt::Display for UnresolvedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReference::Page { node, page } => {
                write!(f, "{} links to missing page {}", node, page)
            }
            UnresolvedReference::Container { node, container } => {
                write!(f, "{} links to missing container {}", node, container)
            }
            UnresolvedReference::Repeater { node, field } => {
                write!(f, "{} links to missing repeater {}", node, field)
            }
            UnresolvedReference::RuleTarget { node, target } => {
                write!(f, "{} has a rule targeting missing field {}", node, target)
            }
        }
    }
}
