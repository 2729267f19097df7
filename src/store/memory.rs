use super::FormStore;
use crate::error::StoreError;
use crate::model::{
    ContainerId, ContainerNode, FieldId, FieldNode, FormDefinition, FormGraph, FormId,
    FormVersion, NewContainer, NewField, NewForm, NewPage, Page, PageId,
};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use tracing::debug;

/// Insertion-ordered rows with a hash index over their identity.
///
/// Removal leaves a tombstone; the table compacts once tombstones outnumber live rows.
#[derive(Debug, Clone)]
struct Table<K, V> {
    rows: Vec<Option<(K, V)>>,
    index: AHashMap<K, usize>,
    dead: usize,
}

impl<K: Copy + Eq + Hash, V> Table<K, V> {
    fn new() -> Self {
        Self {
            rows: Vec::new(),
            index: AHashMap::new(),
            dead: 0,
        }
    }

    fn insert(&mut self, key: K, row: V) {
        if let Some(&pos) = self.index.get(&key) {
            self.rows[pos] = Some((key, row));
            return;
        }
        self.index.insert(key, self.rows.len());
        self.rows.push(Some((key, row)));
    }

    fn get(&self, key: &K) -> Option<&V> {
        let pos = *self.index.get(key)?;
        self.rows[pos].as_ref().map(|(_, row)| row)
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let pos = *self.index.get(key)?;
        self.rows[pos].as_mut().map(|(_, row)| row)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let pos = self.index.remove(key)?;
        let (_, row) = self.rows[pos].take()?;
        self.dead += 1;
        if self.dead * 2 > self.rows.len() {
            self.compact();
        }
        Some(row)
    }

    fn compact(&mut self) {
        self.rows.retain(Option::is_some);
        self.index.clear();
        for (pos, (key, _)) in self.rows.iter().flatten().enumerate() {
            self.index.insert(*key, pos);
        }
        self.dead = 0;
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn iter(&self) -> impl Iterator<Item = &V> {
        self.rows.iter().flatten().map(|(_, row)| row)
    }

    fn into_rows(self) -> Vec<V> {
        self.rows.into_iter().flatten().map(|(_, row)| row).collect()
    }
}

/// An in-process `FormStore`.
///
/// Transactions checkpoint the whole store and roll back to it on failure. A write
/// limit can be set to make the store fail on purpose after a number of writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "StoreDump", into = "StoreDump")]
pub struct MemoryStore {
    forms: Table<FormId, FormDefinition>,
    pages: Table<PageId, Page>,
    containers: Table<ContainerId, ContainerNode>,
    fields: Table<FieldId, FieldNode>,
    versions: Vec<FormVersion>,
    writes_left: Option<usize>,
}

/// The serialized layout of a `MemoryStore`.
#[derive(Serialize, Deserialize)]
struct StoreDump {
    #[serde(default)]
    forms: Vec<FormDefinition>,
    #[serde(default)]
    pages: Vec<Page>,
    #[serde(default)]
    containers: Vec<ContainerNode>,
    #[serde(default)]
    fields: Vec<FieldNode>,
    #[serde(default)]
    versions: Vec<FormVersion>,
}

impl From<StoreDump> for MemoryStore {
    fn from(dump: StoreDump) -> Self {
        let mut store = MemoryStore::new();
        for form in dump.forms {
            store.forms.insert(form.id, form);
        }
        for page in dump.pages {
            store.pages.insert(page.id, page);
        }
        for container in dump.containers {
            store.containers.insert(container.id, container);
        }
        for field in dump.fields {
            store.fields.insert(field.id, field);
        }
        store.versions = dump.versions;
        store
    }
}

impl From<MemoryStore> for StoreDump {
    fn from(store: MemoryStore) -> Self {
        StoreDump {
            forms: store.forms.into_rows(),
            pages: store.pages.into_rows(),
            containers: store.containers.into_rows(),
            fields: store.fields.into_rows(),
            versions: store.versions,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            forms: Table::new(),
            pages: Table::new(),
            containers: Table::new(),
            fields: Table::new(),
            versions: Vec::new(),
            writes_left: None,
        }
    }

    /// Makes every write after the first `writes` fail with a backend error.
    pub fn with_write_limit(mut self, writes: usize) -> Self {
        self.writes_left = Some(writes);
        self
    }

    pub fn clear_write_limit(&mut self) {
        self.writes_left = None;
    }

    /// Loads a whole form graph, keeping its identities.
    ///
    /// A form already stored under the same id is replaced together with its pages
    /// and nodes. Records are re-owned by the graph's form.
    pub fn import_graph(&mut self, graph: FormGraph) -> Result<FormId, StoreError> {
        let form_id = graph.form.id;
        if self.forms.get(&form_id).is_some() {
            self.purge(form_id);
        }
        self.charge_write()?;
        self.forms.insert(form_id, graph.form);
        for mut page in graph.pages {
            page.form_id = form_id;
            self.pages.insert(page.id, page);
        }
        for mut container in graph.containers {
            container.form_id = form_id;
            self.containers.insert(container.id, container);
        }
        for mut field in graph.fields {
            field.form_id = form_id;
            self.fields.insert(field.id, field);
        }
        debug!(%form_id, "imported form graph");
        Ok(form_id)
    }

    pub fn export_graph(&self, form_id: FormId) -> Result<FormGraph, StoreError> {
        FormGraph::load(self, form_id)
    }

    pub fn form_count(&self) -> usize {
        self.forms.len()
    }

    fn purge(&mut self, form_id: FormId) {
        let pages: Vec<PageId> = owned_ids(&self.pages, form_id, |p| (p.id, p.form_id));
        let containers: Vec<ContainerId> =
            owned_ids(&self.containers, form_id, |c| (c.id, c.form_id));
        let fields: Vec<FieldId> = owned_ids(&self.fields, form_id, |f| (f.id, f.form_id));
        for id in &pages {
            self.pages.remove(id);
        }
        for id in &containers {
            self.containers.remove(id);
        }
        for id in &fields {
            self.fields.remove(id);
        }
        self.forms.remove(&form_id);
    }

    fn charge_write(&mut self) -> Result<(), StoreError> {
        match self.writes_left.as_mut() {
            Some(0) => Err(StoreError::Backend("write limit reached".to_string())),
            Some(left) => {
                *left -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn require_form(&self, form_id: FormId) -> Result<(), StoreError> {
        match self.forms.get(&form_id) {
            Some(_) => Ok(()),
            None => Err(StoreError::FormNotFound(form_id)),
        }
    }
}

fn owned_ids<K: Copy + Eq + Hash, V>(
    table: &Table<K, V>,
    form_id: FormId,
    key: impl Fn(&V) -> (K, FormId),
) -> Vec<K> {
    table
        .iter()
        .map(key)
        .filter(|(_, owner)| *owner == form_id)
        .map(|(id, _)| id)
        .collect()
}

impl FormStore for MemoryStore {
    fn create_form(&mut self, draft: NewForm) -> Result<FormId, StoreError> {
        self.charge_write()?;
        let id = FormId::fresh();
        self.forms.insert(id, draft.into_form(id));
        Ok(id)
    }

    fn create_page(&mut self, form_id: FormId, draft: NewPage) -> Result<PageId, StoreError> {
        self.require_form(form_id)?;
        self.charge_write()?;
        let id = PageId::fresh();
        self.pages.insert(id, draft.into_page(id, form_id));
        Ok(id)
    }

    fn create_container(
        &mut self,
        form_id: FormId,
        draft: NewContainer,
    ) -> Result<ContainerId, StoreError> {
        self.require_form(form_id)?;
        self.charge_write()?;
        let id = ContainerId::fresh();
        self.containers.insert(id, draft.into_node(id, form_id));
        Ok(id)
    }

    fn create_field(&mut self, form_id: FormId, draft: NewField) -> Result<FieldId, StoreError> {
        self.require_form(form_id)?;
        self.charge_write()?;
        let id = FieldId::fresh();
        self.fields.insert(id, draft.into_node(id, form_id));
        Ok(id)
    }

    fn form(&self, id: FormId) -> Result<Option<FormDefinition>, StoreError> {
        Ok(self.forms.get(&id).cloned())
    }

    fn page(&self, id: PageId) -> Result<Option<Page>, StoreError> {
        Ok(self.pages.get(&id).cloned())
    }

    fn container(&self, id: ContainerId) -> Result<Option<ContainerNode>, StoreError> {
        Ok(self.containers.get(&id).cloned())
    }

    fn field(&self, id: FieldId) -> Result<Option<FieldNode>, StoreError> {
        Ok(self.fields.get(&id).cloned())
    }

    fn pages(&self, form_id: FormId) -> Result<Vec<Page>, StoreError> {
        Ok(self
            .pages
            .iter()
            .filter(|p| p.form_id == form_id)
            .cloned()
            .collect())
    }

    fn containers(&self, form_id: FormId) -> Result<Vec<ContainerNode>, StoreError> {
        Ok(self
            .containers
            .iter()
            .filter(|c| c.form_id == form_id)
            .cloned()
            .collect())
    }

    fn fields(&self, form_id: FormId) -> Result<Vec<FieldNode>, StoreError> {
        Ok(self
            .fields
            .iter()
            .filter(|f| f.form_id == form_id)
            .cloned()
            .collect())
    }

    fn update_form(&mut self, form: &FormDefinition) -> Result<(), StoreError> {
        self.require_form(form.id)?;
        self.charge_write()?;
        self.forms.insert(form.id, form.clone());
        Ok(())
    }

    fn update_container(&mut self, node: &ContainerNode) -> Result<(), StoreError> {
        if self.containers.get(&node.id).is_none() {
            return Err(StoreError::ContainerNotFound(node.id));
        }
        self.charge_write()?;
        if let Some(row) = self.containers.get_mut(&node.id) {
            *row = node.clone();
        }
        Ok(())
    }

    fn update_field(&mut self, node: &FieldNode) -> Result<(), StoreError> {
        if self.fields.get(&node.id).is_none() {
            return Err(StoreError::FieldNotFound(node.id));
        }
        self.charge_write()?;
        if let Some(row) = self.fields.get_mut(&node.id) {
            *row = node.clone();
        }
        Ok(())
    }

    fn delete_page(&mut self, id: PageId) -> Result<(), StoreError> {
        if self.pages.get(&id).is_none() {
            return Err(StoreError::PageNotFound(id));
        }
        self.charge_write()?;
        self.pages.remove(&id);
        Ok(())
    }

    fn delete_container(&mut self, id: ContainerId) -> Result<(), StoreError> {
        if self.containers.get(&id).is_none() {
            return Err(StoreError::ContainerNotFound(id));
        }
        self.charge_write()?;
        self.containers.remove(&id);
        Ok(())
    }

    fn delete_field(&mut self, id: FieldId) -> Result<(), StoreError> {
        if self.fields.get(&id).is_none() {
            return Err(StoreError::FieldNotFound(id));
        }
        self.charge_write()?;
        self.fields.remove(&id);
        Ok(())
    }

    fn save_version(&mut self, version: FormVersion) -> Result<(), StoreError> {
        self.require_form(version.form_id)?;
        self.charge_write()?;
        self.versions.push(version);
        Ok(())
    }

    fn versions(&self, form_id: FormId) -> Result<Vec<FormVersion>, StoreError> {
        let mut versions: Vec<FormVersion> = self
            .versions
            .iter()
            .filter(|v| v.form_id == form_id)
            .cloned()
            .collect();
        versions.sort_by_key(|v| v.number);
        Ok(versions)
    }

    fn transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<StoreError>,
    {
        let checkpoint = self.clone();
        let result = f(self);
        if result.is_err() {
            debug!("transaction failed, rolling back");
            *self = checkpoint;
        }
        result
    }
}
