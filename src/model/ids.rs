use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Defines an opaque, UUID-backed identity newtype.
macro_rules! define_ids {
    ( $( $(#[$meta:meta])* $name:ident ),* $(,)? ) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(Uuid);

            impl $name {
                /// Mints a fresh, random identity.
                pub fn fresh() -> Self {
                    Self(Uuid::new_v4())
                }
            }

            impl From<Uuid> for $name {
                fn from(uuid: Uuid) -> Self {
                    Self(uuid)
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

define_ids! {
    /// Identity of a `FormDefinition`.
    FormId,
    /// Identity of a `Page`, scoped to its form.
    PageId,
    /// Identity of a `ContainerNode`, scoped to its form.
    ContainerId,
    /// Identity of a `FieldNode`, scoped to its form.
    FieldId,
}
