use super::{ContainerSnapshot, Snapshot, check_format};
use crate::clone::{IdentityMaps, dropped_link};
use crate::config::EngineConfig;
use crate::error::SnapshotError;
use crate::model::{
    Attachment, ContainerId, FieldId, FormId, NewContainer, NewField, NewPage, NodeHandle,
    UnresolvedReference,
};
use crate::store::FormStore;
use crate::store::staging::StagedNodes;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Outcome of a restore.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RestoreReport {
    pub pages: usize,
    pub containers: usize,
    pub fields: usize,
    /// Container passes that created at least one container.
    pub passes: usize,
    /// Snapshot identities of containers whose ancestor chain never resolved.
    pub dropped_containers: Vec<ContainerId>,
    /// Links and rule targets that could not be translated.
    pub unresolved: Vec<UnresolvedReference>,
    /// Snapshot identity to live identity for everything recreated.
    pub maps: IdentityMaps,
}

impl RestoreReport {
    /// Number of restored fields that lost a link to a page, container or repeater.
    pub fn unlinked_fields(&self) -> usize {
        self.unresolved
            .iter()
            .filter(|r| {
                matches!(r.node(), NodeHandle::Field(_))
                    && !matches!(r, UnresolvedReference::RuleTarget { .. })
            })
            .count()
    }

    pub fn is_lossless(&self) -> bool {
        self.dropped_containers.is_empty() && self.unresolved.is_empty()
    }
}

/// Replaces the pages and nodes of `form_id` with the content of `snapshot`.
///
/// Destructive and atomic: the current graph is deleted and rebuilt inside one store
/// transaction. Containers are recreated in bounded relaxation passes; a container
/// whose parent is not created within `config.restore_max_passes` passes is dropped
/// and reported instead of failing the restore.
#[instrument(
    skip(store, config, snapshot),
    fields(containers = snapshot.containers.len(), fields = snapshot.fields.len())
)]
pub fn restore<S: FormStore>(
    store: &mut S,
    config: &EngineConfig,
    form_id: FormId,
    snapshot: &Snapshot,
) -> Result<RestoreReport, SnapshotError> {
    check_format(snapshot.format)?;
    let mut form = store
        .form(form_id)?
        .ok_or(SnapshotError::FormNotFound(form_id))?;

    let report = store.transaction(|store| {
        form.settings = snapshot.form.settings.clone();
        store.update_form(&form)?;
        clear_form(store, form_id)?;
        Rebuild::new(snapshot, config, form_id).run(store)
    })?;

    for id in &report.dropped_containers {
        warn!(container = %id, "container dropped: parent chain did not resolve");
    }
    info!(
        %form_id,
        pages = report.pages,
        containers = report.containers,
        fields = report.fields,
        passes = report.passes,
        dropped = report.dropped_containers.len(),
        "snapshot restored"
    );
    Ok(report)
}

fn clear_form<S: FormStore>(store: &mut S, form_id: FormId) -> Result<(), SnapshotError> {
    for field in store.fields(form_id)? {
        store.delete_field(field.id)?;
    }
    for container in store.containers(form_id)? {
        store.delete_container(container.id)?;
    }
    for page in store.pages(form_id)? {
        store.delete_page(page.id)?;
    }
    Ok(())
}

struct Rebuild<'a> {
    snapshot: &'a Snapshot,
    config: &'a EngineConfig,
    form_id: FormId,
    staged: StagedNodes,
    report: RestoreReport,
    /// New nodes still waiting for their owning repeater, with its snapshot identity.
    repeater_links: Vec<(NodeHandle, FieldId)>,
}

impl<'a> Rebuild<'a> {
    fn new(snapshot: &'a Snapshot, config: &'a EngineConfig, form_id: FormId) -> Self {
        Self {
            snapshot,
            config,
            form_id,
            staged: StagedNodes::new(form_id),
            report: RestoreReport::default(),
            repeater_links: Vec::new(),
        }
    }

    fn run<S: FormStore>(mut self, store: &mut S) -> Result<RestoreReport, SnapshotError> {
        self.restore_pages(store)?;
        self.restore_containers(store)?;
        self.restore_fields(store)?;
        self.link_repeaters();

        let unresolved_rules = self.staged.remap_rules(&self.report.maps.fields);
        self.report.unresolved.extend(unresolved_rules);
        self.report.containers = self.staged.container_count();
        self.report.fields = self.staged.field_count();
        self.staged.flush(store)?;
        Ok(self.report)
    }

    fn restore_pages<S: FormStore>(&mut self, store: &mut S) -> Result<(), SnapshotError> {
        let snapshot = self.snapshot;
        for page in &snapshot.pages {
            if self.report.maps.pages.contains_key(&page.id) {
                continue;
            }
            let id = store.create_page(
                self.form_id,
                NewPage {
                    title: page.title.clone(),
                    order: page.order,
                    settings: page.settings.clone(),
                },
            )?;
            self.report.maps.pages.insert(page.id, id);
        }
        self.report.pages = self.report.maps.pages.len();
        Ok(())
    }

    /// Pass 0 creates every container without a parent container. Each later pass
    /// creates the containers whose parent was created by an earlier pass.
    fn restore_containers<S: FormStore>(&mut self, store: &mut S) -> Result<(), SnapshotError> {
        let snapshot = self.snapshot;
        for pass in 0..self.config.restore_max_passes {
            let ready: Vec<&ContainerSnapshot> = snapshot
                .containers
                .iter()
                .filter(|c| !self.report.maps.containers.contains_key(&c.id))
                .filter(|c| match c.parent_id {
                    None => pass == 0,
                    Some(parent) => self.report.maps.containers.contains_key(&parent),
                })
                .collect();
            if ready.is_empty() {
                break;
            }
            for container in &ready {
                self.restore_container(store, container)?;
            }
            self.report.passes += 1;
            debug!(pass, created = ready.len(), "container pass finished");
        }

        self.report.dropped_containers = snapshot
            .containers
            .iter()
            .filter(|c| !self.report.maps.containers.contains_key(&c.id))
            .map(|c| c.id)
            .collect();
        Ok(())
    }

    fn restore_container<S: FormStore>(
        &mut self,
        store: &mut S,
        container: &ContainerSnapshot,
    ) -> Result<(), SnapshotError> {
        // A duplicate identity within one pass is created once.
        if self.report.maps.containers.contains_key(&container.id) {
            return Ok(());
        }
        let page = container
            .page_id
            .and_then(|p| self.report.maps.pages.get(&p).copied());
        let parent = container
            .parent_id
            .and_then(|p| self.report.maps.containers.get(&p).copied());
        let id = self.staged.create_container(
            store,
            NewContainer {
                kind: container.kind,
                attachment: Attachment::from_links(page, parent, None),
                order: container.order,
                settings: container.settings.clone(),
                conditional_logic: container.conditional_logic.clone(),
            },
        )?;
        self.report.maps.containers.insert(container.id, id);

        let node = NodeHandle::Container(id);
        match (container.parent_id, container.parent_field_id) {
            (None, Some(field)) => self.repeater_links.push((node, field)),
            (None, None) if page.is_none() => {
                if let Some(old) = container.page_id {
                    self.drop_link(node, Attachment::Page(old));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn restore_fields<S: FormStore>(&mut self, store: &mut S) -> Result<(), SnapshotError> {
        let snapshot = self.snapshot;
        for field in &snapshot.fields {
            if self.report.maps.fields.contains_key(&field.id) {
                continue;
            }
            let page = field
                .page_id
                .and_then(|p| self.report.maps.pages.get(&p).copied());
            let container = field
                .container_id
                .and_then(|c| self.report.maps.containers.get(&c).copied());
            let id = self.staged.create_field(
                store,
                NewField {
                    field_type: field.field_type.clone(),
                    name: field.name.clone(),
                    element_id: field.element_id.clone(),
                    label: field.label.clone(),
                    attachment: Attachment::from_links(page, container, None),
                    order: field.order,
                    options: field.options.clone(),
                    conditional_logic: field.conditional_logic.clone(),
                    validation_rules: field.validation_rules.clone(),
                },
            )?;
            self.report.maps.fields.insert(field.id, id);

            let node = NodeHandle::Field(id);
            if let (Some(old), None) = (field.container_id, container) {
                self.drop_link(node, Attachment::Container(old));
            }
            if let (Some(old), None) = (field.page_id, page) {
                self.drop_link(node, Attachment::Page(old));
            }
            if let (None, Some(parent_field)) = (container, field.parent_field_id) {
                self.repeater_links.push((node, parent_field));
            }
        }
        Ok(())
    }

    fn link_repeaters(&mut self) {
        for (node, old_field) in std::mem::take(&mut self.repeater_links) {
            let Some(&field) = self.report.maps.fields.get(&old_field) else {
                self.drop_link(node, Attachment::Field(old_field));
                continue;
            };
            match node {
                NodeHandle::Container(id) => self.staged.relink_container(id, Attachment::Field(field)),
                NodeHandle::Field(id) => self.staged.relink_field(id, Attachment::Field(field)),
            }
        }
    }

    fn drop_link(&mut self, node: NodeHandle, old: Attachment) {
        if let Some(reference) = dropped_link(node, old) {
            warn!(%reference, "link dropped during restore");
            self.report.unresolved.push(reference);
        }
    }
}
