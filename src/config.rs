use crate::error::ConfigError;
use crate::model::FieldNode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunables shared by the cloner and the restorer.
///
/// Every key is optional when loaded from JSON:
///
/// ```json
/// { "restore_max_passes": 10, "repeater_field_types": ["repeater"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on container relaxation passes during restore; containers whose
    /// ancestor chain is deeper than this are dropped.
    pub restore_max_passes: usize,
    /// Field types that own a repeatable sub-tree.
    pub repeater_field_types: Vec<String>,
}

impl EngineConfig {
    pub const DEFAULT_RESTORE_MAX_PASSES: usize = 10;

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    pub fn with_restore_max_passes(mut self, passes: usize) -> Self {
        self.restore_max_passes = passes;
        self
    }

    pub fn with_repeater_type(mut self, field_type: &str) -> Self {
        if !self.repeater_field_types.iter().any(|t| t == field_type) {
            self.repeater_field_types.push(field_type.to_string());
        }
        self
    }

    pub fn is_repeater(&self, field: &FieldNode) -> bool {
        self.repeater_field_types
            .iter()
            .any(|t| *t == field.field_type)
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.restore_max_passes == 0 {
            return Err(ConfigError::ZeroPasses);
        }
        Ok(self)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            restore_max_passes: Self::DEFAULT_RESTORE_MAX_PASSES,
            repeater_field_types: vec!["repeater".to_string()],
        }
    }
}
