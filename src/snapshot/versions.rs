use super::{RestoreReport, build_snapshot, restore};
use crate::config::EngineConfig;
use crate::error::{SnapshotError, StoreError};
use crate::model::{FormId, FormVersion};
use crate::store::FormStore;
use chrono::Utc;
use tracing::{info, instrument};

/// Saves the current state of a form as its next numbered version.
#[instrument(skip(store, notes))]
pub fn capture_version<S: FormStore>(
    store: &mut S,
    form_id: FormId,
    notes: &str,
) -> Result<FormVersion, SnapshotError> {
    let snapshot = build_snapshot(store, form_id)?;
    let number = store
        .versions(form_id)?
        .iter()
        .map(|v| v.number)
        .max()
        .map_or(1, |n| n + 1);
    let version = FormVersion {
        form_id,
        number,
        snapshot,
        notes: notes.to_string(),
        created_at: Utc::now(),
    };
    store.save_version(version.clone())?;
    info!(%form_id, number, "version captured");
    Ok(version)
}

/// Rolls a form back to one of its saved versions.
#[instrument(skip(store, config))]
pub fn restore_version<S: FormStore>(
    store: &mut S,
    config: &EngineConfig,
    form_id: FormId,
    number: u32,
) -> Result<RestoreReport, SnapshotError> {
    let version = store
        .versions(form_id)?
        .into_iter()
        .find(|v| v.number == number)
        .ok_or(StoreError::VersionNotFound { form_id, number })?;
    restore(store, config, form_id, &version.snapshot)
}
