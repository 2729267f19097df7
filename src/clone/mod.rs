//! Deep copy of a form graph into a fresh identity space.
//!
//! Copying has to follow a fixed order: repeater-owned sub-trees can only be copied
//! once the repeater field has its new identity, and fields can only be linked to
//! their containers once every container exists. Links that still cannot be
//! translated are dropped (the node falls back to the root) and reported, never
//! raised as errors.

mod templates;

pub use templates::{instantiate_template, save_as_template};

use crate::config::EngineConfig;
use crate::error::CloneError;
use crate::model::{
    Attachment, ContainerId, ContainerNode, FieldId, FormGraph, FormId, NodeHandle, PageId,
    UnresolvedReference,
};
use crate::rules::FieldIdMap;
use crate::store::FormStore;
use crate::store::staging::StagedNodes;
use ahash::AHashMap;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Old identity to new identity, per kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IdentityMaps {
    pub pages: AHashMap<PageId, PageId>,
    pub containers: AHashMap<ContainerId, ContainerId>,
    pub fields: FieldIdMap,
}

impl IdentityMaps {
    /// Translates an attachment into the new identity space.
    pub fn translate(&self, attachment: Attachment) -> Option<Attachment> {
        match attachment {
            Attachment::Root => Some(Attachment::Root),
            Attachment::Page(id) => self.pages.get(&id).copied().map(Attachment::Page),
            Attachment::Container(id) => {
                self.containers.get(&id).copied().map(Attachment::Container)
            }
            Attachment::Field(id) => self.fields.get(&id).copied().map(Attachment::Field),
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len() + self.containers.len() + self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of a clone: the identity maps plus every reference that was dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloneReport {
    pub source: FormId,
    pub target: FormId,
    pub maps: IdentityMaps,
    pub unresolved: Vec<UnresolvedReference>,
}

impl CloneReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Copies every page, container and field of `source` into `target`.
///
/// Runs as one store transaction: a store failure leaves `target` untouched.
#[instrument(skip(store, config))]
pub fn clone_graph<S: FormStore>(
    store: &mut S,
    config: &EngineConfig,
    source: FormId,
    target: FormId,
) -> Result<CloneReport, CloneError> {
    if source == target {
        return Err(CloneError::SameForm(source));
    }
    if store.form(source)?.is_none() {
        return Err(CloneError::SourceNotFound(source));
    }
    if store.form(target)?.is_none() {
        return Err(CloneError::TargetNotFound(target));
    }
    let graph = FormGraph::load(store, source)?;

    let report = store.transaction(|store| GraphCopy::new(&graph, config, target).run(store))?;
    info!(
        %source,
        %target,
        pages = report.maps.pages.len(),
        containers = report.maps.containers.len(),
        fields = report.maps.fields.len(),
        unresolved = report.unresolved.len(),
        "form graph cloned"
    );
    Ok(report)
}

struct GraphCopy<'a> {
    source: &'a FormGraph,
    config: &'a EngineConfig,
    target: FormId,
    children: AHashMap<Attachment, Vec<&'a ContainerNode>>,
    staged: StagedNodes,
    maps: IdentityMaps,
    unresolved: Vec<UnresolvedReference>,
}

impl<'a> GraphCopy<'a> {
    fn new(source: &'a FormGraph, config: &'a EngineConfig, target: FormId) -> Self {
        let mut children: AHashMap<Attachment, Vec<&ContainerNode>> = AHashMap::new();
        for container in &source.containers {
            children.entry(container.attachment).or_default().push(container);
        }
        Self {
            source,
            config,
            target,
            children,
            staged: StagedNodes::new(target),
            maps: IdentityMaps::default(),
            unresolved: Vec::new(),
        }
    }

    fn run<S: FormStore>(mut self, store: &mut S) -> Result<CloneReport, CloneError> {
        self.copy_pages(store)?;
        self.copy_top_level_containers(store)?;
        let (deferred_containers, deferred_repeaters) = self.copy_fields(store)?;
        self.link_nested_fields(deferred_repeaters);
        self.copy_repeater_subtrees(store)?;
        self.copy_orphaned_containers(store)?;
        self.link_deferred_containers(deferred_containers);

        let unresolved_rules = self.staged.remap_rules(&self.maps.fields);
        self.unresolved.extend(unresolved_rules);
        self.staged.flush(store)?;

        Ok(CloneReport {
            source: self.source.form.id,
            target: self.target,
            maps: self.maps,
            unresolved: self.unresolved,
        })
    }

    fn copy_pages<S: FormStore>(&mut self, store: &mut S) -> Result<(), CloneError> {
        let source = self.source;
        for page in &source.pages {
            let id = store.create_page(self.target, page.to_draft())?;
            self.maps.pages.insert(page.id, id);
        }
        debug!(pages = self.maps.pages.len(), "pages copied");
        Ok(())
    }

    fn copy_top_level_containers<S: FormStore>(
        &mut self,
        store: &mut S,
    ) -> Result<(), CloneError> {
        let source = self.source;
        self.copy_subtree(store, Attachment::Root, Attachment::Root)?;
        for page in &source.pages {
            let Some(&new_page) = self.maps.pages.get(&page.id) else {
                continue;
            };
            self.copy_subtree(store, Attachment::Page(page.id), Attachment::Page(new_page))?;
        }
        debug!(containers = self.maps.containers.len(), "top-level containers copied");
        Ok(())
    }

    /// Copies the containers under `from` depth-first, parents before children.
    fn copy_subtree<S: FormStore>(
        &mut self,
        store: &mut S,
        from: Attachment,
        to: Attachment,
    ) -> Result<(), CloneError> {
        let Some(level) = self.children.get(&from).cloned() else {
            return Ok(());
        };
        for container in level {
            if self.maps.containers.contains_key(&container.id) {
                continue;
            }
            let mut draft = container.to_draft();
            draft.attachment = to;
            let id = self.staged.create_container(store, draft)?;
            self.maps.containers.insert(container.id, id);
            self.copy_subtree(
                store,
                Attachment::Container(container.id),
                Attachment::Container(id),
            )?;
        }
        Ok(())
    }

    /// Creates every field. Links that cannot be written yet are returned as
    /// `(new field, old container)` and `(new field, old repeater)` pairs.
    #[allow(clippy::type_complexity)]
    fn copy_fields<S: FormStore>(
        &mut self,
        store: &mut S,
    ) -> Result<(Vec<(FieldId, ContainerId)>, Vec<(FieldId, FieldId)>), CloneError> {
        let mut deferred_containers = Vec::new();
        let mut deferred_repeaters = Vec::new();
        let source = self.source;
        for field in &source.fields {
            let mut draft = field.to_draft();
            draft.attachment = self
                .maps
                .translate(field.attachment)
                .unwrap_or(Attachment::Root);
            let id = self.staged.create_field(store, draft)?;
            self.maps.fields.insert(field.id, id);

            match field.attachment {
                Attachment::Container(old) if !self.maps.containers.contains_key(&old) => {
                    deferred_containers.push((id, old));
                }
                Attachment::Field(old) => deferred_repeaters.push((id, old)),
                Attachment::Page(old) if !self.maps.pages.contains_key(&old) => {
                    self.drop_link(NodeHandle::Field(id), field.attachment);
                }
                _ => {}
            }
        }
        debug!(
            fields = self.maps.fields.len(),
            deferred = deferred_containers.len() + deferred_repeaters.len(),
            "fields copied"
        );
        Ok((deferred_containers, deferred_repeaters))
    }

    fn link_nested_fields(&mut self, deferred: Vec<(FieldId, FieldId)>) {
        for (id, old_parent) in deferred {
            match self.maps.fields.get(&old_parent) {
                Some(&parent) => self.staged.relink_field(id, Attachment::Field(parent)),
                None => self.drop_link(NodeHandle::Field(id), Attachment::Field(old_parent)),
            }
        }
    }

    fn copy_repeater_subtrees<S: FormStore>(&mut self, store: &mut S) -> Result<(), CloneError> {
        let source = self.source;
        for field in &source.fields {
            if !self.config.is_repeater(field) {
                continue;
            }
            let Some(&new_field) = self.maps.fields.get(&field.id) else {
                continue;
            };
            self.copy_subtree(
                store,
                Attachment::Field(field.id),
                Attachment::Field(new_field),
            )?;
        }
        Ok(())
    }

    /// Copies containers no walk reached: children of missing parents, owned
    /// sub-trees of non-repeater fields and members of parent cycles.
    fn copy_orphaned_containers<S: FormStore>(
        &mut self,
        store: &mut S,
    ) -> Result<(), CloneError> {
        let source = self.source;
        loop {
            let pending: Vec<&ContainerNode> = source
                .containers
                .iter()
                .filter(|c| !self.maps.containers.contains_key(&c.id))
                .collect();
            // Start from a container whose parent is not itself pending, so
            // whole orphaned sub-trees stay linked. A cycle has no such entry.
            let next = pending
                .iter()
                .find(|c| match c.attachment {
                    Attachment::Container(parent) => !pending.iter().any(|p| p.id == parent),
                    _ => true,
                })
                .or_else(|| pending.first())
                .copied();
            let Some(container) = next else {
                return Ok(());
            };

            let mut draft = container.to_draft();
            draft.attachment = self
                .maps
                .translate(container.attachment)
                .unwrap_or(Attachment::Root);
            let id = self.staged.create_container(store, draft)?;
            self.maps.containers.insert(container.id, id);
            if self.maps.translate(container.attachment).is_none() {
                self.drop_link(NodeHandle::Container(id), container.attachment);
            }
            self.copy_subtree(
                store,
                Attachment::Container(container.id),
                Attachment::Container(id),
            )?;
        }
    }

    fn link_deferred_containers(&mut self, deferred: Vec<(FieldId, ContainerId)>) {
        for (id, old_container) in deferred {
            match self.maps.containers.get(&old_container) {
                Some(&container) => self
                    .staged
                    .relink_field(id, Attachment::Container(container)),
                None => self.drop_link(NodeHandle::Field(id), Attachment::Container(old_container)),
            }
        }
    }

    fn drop_link(&mut self, node: NodeHandle, old: Attachment) {
        if let Some(reference) = dropped_link(node, old) {
            warn!(%reference, "link dropped during clone");
            self.unresolved.push(reference);
        }
    }
}

/// The report entry for a link to `old` that could not be translated.
pub(crate) fn dropped_link(node: NodeHandle, old: Attachment) -> Option<UnresolvedReference> {
    match old {
        Attachment::Root => None,
        Attachment::Page(page) => Some(UnresolvedReference::Page { node, page }),
        Attachment::Container(container) => {
            Some(UnresolvedReference::Container { node, container })
        }
        Attachment::Field(field) => Some(UnresolvedReference::Repeater { node, field }),
    }
}
