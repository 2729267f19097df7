use super::{CloneReport, clone_graph};
use crate::config::EngineConfig;
use crate::error::CloneError;
use crate::model::{FormId, NewForm};
use crate::store::FormStore;
use tracing::instrument;

/// Creates a live form named `name` from a template and copies the template into it.
#[instrument(skip(store, config))]
pub fn instantiate_template<S: FormStore>(
    store: &mut S,
    config: &EngineConfig,
    template: FormId,
    name: &str,
) -> Result<CloneReport, CloneError> {
    derive_form(store, config, template, name, false)
}

/// Creates a template named `name` from a live form.
#[instrument(skip(store, config))]
pub fn save_as_template<S: FormStore>(
    store: &mut S,
    config: &EngineConfig,
    form: FormId,
    name: &str,
) -> Result<CloneReport, CloneError> {
    derive_form(store, config, form, name, true)
}

fn derive_form<S: FormStore>(
    store: &mut S,
    config: &EngineConfig,
    source: FormId,
    name: &str,
    is_template: bool,
) -> Result<CloneReport, CloneError> {
    store.transaction(|store| {
        let origin = store
            .form(source)?
            .ok_or(CloneError::SourceNotFound(source))?;
        let target = store.create_form(NewForm {
            name: name.to_string(),
            is_template,
            settings: origin.settings,
        })?;
        clone_graph(store, config, source, target)
    })
}
