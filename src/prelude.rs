//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and functions of the katachi
//! crate, so callers can get going with a single `use katachi::prelude::*;`.
//!
//! # Example
//!
//! ```rust,no_run
//! use katachi::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let json = std::fs::read_to_string("path/to/form.json")?;
//! let graph: FormGraph = serde_json::from_str(&json)?;
//!
//! for page in graph.forests() {
//!     println!("{} top-level nodes", page.nodes.len());
//! }
//! let snapshot = Snapshot::capture(&graph);
//! println!("{}", snapshot.to_json()?);
//! # Ok(())
//! # }
//! ```

// Data model
pub use crate::model::{
    Attachment, ContainerId, ContainerKind, ContainerNode, FieldId, FieldNode, FormDefinition,
    FormGraph, FormId, FormVersion, NewContainer, NewField, NewForm, NewPage, NodeHandle, Page,
    PageId, UnresolvedReference,
};

// Rules
pub use crate::rules::{
    Action, Condition, FieldIdMap, FieldIndex, FieldValue, MatchMode, Operator, RuleEvaluator,
    RuleExpression, RuleGroup, TraceFormatter, ValueMap, Verdict, evaluate, evaluate_by_name,
    remap_targets,
};

// Tree assembly
pub use crate::tree::{Forest, PageForest, Scope, TreeBuilder, TreeNode, build_forest};

// Cloning and snapshots
pub use crate::clone::{CloneReport, IdentityMaps, clone_graph, instantiate_template, save_as_template};
pub use crate::snapshot::{
    RestoreReport, Snapshot, build_snapshot, capture_version, restore, restore_version,
};

// Persistence and configuration
pub use crate::config::EngineConfig;
pub use crate::store::{FormStore, MemoryStore, delete_container_subtree, delete_field_subtree};

// Error types
pub use crate::error::{CloneError, ConfigError, SnapshotError, StoreError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
