pub mod form;
pub mod graph;
pub mod ids;
pub mod node;
pub mod reference;

pub use form::*;
pub use graph::*;
pub use ids::*;
pub use node::*;
pub use reference::*;
