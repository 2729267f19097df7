use super::{FormId, PageId};
use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named form (or form template) owning every page and node beneath it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    pub id: FormId,
    pub name: String,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub settings: serde_json::Value,
}

/// Creation payload for a `FormDefinition`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewForm {
    pub name: String,
    pub is_template: bool,
    pub settings: serde_json::Value,
}

impl NewForm {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_template: false,
            settings: serde_json::Value::Null,
        }
    }

    pub fn template(name: &str) -> Self {
        Self {
            is_template: true,
            ..Self::new(name)
        }
    }

    pub fn into_form(self, id: FormId) -> FormDefinition {
        FormDefinition {
            id,
            name: self.name,
            is_template: self.is_template,
            settings: self.settings,
        }
    }
}

/// One step of a multi-step form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub form_id: FormId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub settings: serde_json::Value,
}

impl Page {
    pub fn to_draft(&self) -> NewPage {
        NewPage {
            title: self.title.clone(),
            order: self.order,
            settings: self.settings.clone(),
        }
    }
}

/// Creation payload for a `Page`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPage {
    pub title: String,
    pub order: i32,
    pub settings: serde_json::Value,
}

impl NewPage {
    pub fn new(title: &str, order: i32) -> Self {
        Self {
            title: title.to_string(),
            order,
            settings: serde_json::Value::Null,
        }
    }

    pub fn into_page(self, id: PageId, form_id: FormId) -> Page {
        Page {
            id,
            form_id,
            title: self.title,
            order: self.order,
            settings: self.settings,
        }
    }
}

/// An immutable, numbered snapshot of a form at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormVersion {
    pub form_id: FormId,
    pub number: u32,
    pub snapshot: Snapshot,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}
