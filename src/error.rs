use crate::model::{ContainerId, FieldId, FormId, PageId};
use thiserror::Error;

/// Errors raised by a persistence collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Form '{0}' not found")]
    FormNotFound(FormId),

    #[error("Page '{0}' not found")]
    PageNotFound(PageId),

    #[error("Container '{0}' not found")]
    ContainerNotFound(ContainerId),

    #[error("Field '{0}' not found")]
    FieldNotFound(FieldId),

    #[error("Version {number} of form '{form_id}' not found")]
    VersionNotFound { form_id: FormId, number: u32 },

    #[error("Storage backend failure: {0}")]
    Backend(String),
}

/// Errors that abort a whole clone operation.
///
/// Unresolvable references inside the source graph are never errors; they are
/// reported through `CloneReport::unresolved` instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CloneError {
    #[error("Source form '{0}' not found")]
    SourceNotFound(FormId),

    #[error("Target form '{0}' not found")]
    TargetNotFound(FormId),

    #[error("Source and target form are the same ('{0}')")]
    SameForm(FormId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors that can occur while capturing, encoding or restoring snapshots.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("Form '{0}' not found")]
    FormNotFound(FormId),

    #[error("Snapshot format {found} is newer than the supported format {supported}")]
    UnsupportedFormat { found: u32, supported: u32 },

    #[error("Failed to encode snapshot: {0}")]
    Encode(String),

    #[error("Failed to decode snapshot: {0}")]
    Decode(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors that can occur while loading an `EngineConfig`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Could not read config file '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Invalid config: {0}")]
    Parse(String),

    #[error("restore_max_passes must be at least 1")]
    ZeroPasses,
}
