//! # Katachi - Structural Engine for Form-Definition Graphs
//!
//! **Katachi** is the structural core of a visual form builder. A form is a tree of
//! layout containers and leaf fields, and any node may carry a conditional-visibility
//! rule that points at other fields by identity. Katachi owns the parts of that
//! model that are easy to get subtly wrong:
//!
//! 1.  **Tree assembly**: turn the flat node lists a store hands back into ordered,
//!     nested forests, one per page (`tree`).
//! 2.  **Graph cloning**: deep-copy a whole form into a fresh identity space while
//!     rewriting every internal pointer, for "instantiate from template" and
//!     "save as template" (`clone`).
//! 3.  **Snapshots**: flatten a form into an opaque JSON blob and rebuild it later,
//!     resolving forward parent references in bounded passes (`snapshot`).
//! 4.  **Rule evaluation**: decide whether a node is visible given the current values
//!     of other fields (`rules`).
//!
//! Persistence is not part of the engine. Everything that reads or writes goes through
//! the `FormStore` trait; `MemoryStore` is an in-process implementation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use katachi::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let config = EngineConfig::default();
//!     let mut store = MemoryStore::new();
//!
//!     // A template with one checkbox and a text field shown only when it is ticked.
//!     let template = store.create_form(NewForm::template("Contact"))?;
//!     let opt_in = store.create_field(
//!         template,
//!         NewField::new("checkbox", "newsletter", Attachment::Root, 0),
//!     )?;
//!     store.create_field(
//!         template,
//!         NewField::new("email", "email", Attachment::Root, 1).with_logic(RuleExpression::flat(
//!             Action::Show,
//!             MatchMode::All,
//!             vec![Condition::on_field(opt_in, Operator::Checked, FieldValue::Null)],
//!         )),
//!     )?;
//!
//!     // Instantiate it: every identity is new, the rule follows the copied checkbox.
//!     let report = instantiate_template(&mut store, &config, template, "Contact (live)")?;
//!     let graph = FormGraph::load(&store, report.target)?;
//!
//!     let mut values = ValueMap::new();
//!     values.insert("newsletter".to_string(), FieldValue::from("yes"));
//!     let email = &graph.fields[1];
//!     println!(
//!         "email visible: {}",
//!         evaluate(email.conditional_logic.as_ref(), &values, &graph.field_index())
//!     );
//!
//!     // Keep a version and roll back to it later.
//!     capture_version(&mut store, report.target, "first draft")?;
//!     restore_version(&mut store, &config, report.target, 1)?;
//!     Ok(())
//! }
//! ```

pub mod clone;
pub mod config;
pub mod error;
pub mod model;
pub mod prelude;
pub mod rules;
pub mod snapshot;
pub mod store;
pub mod tree;
