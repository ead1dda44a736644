//! Strongly-typed identifiers for Plaza layout entities.
//!
//! All identifiers in Plaza are:
//! - **Strongly typed**: Prevents mixing up different ID types at compile time
//! - **Lexicographically sortable**: ULIDs encode creation time and sort naturally
//! - **Globally unique**: No coordination required for generation
//!
//! # Example
//!
//! ```rust
//! use plaza_core::id::{GadgetId, TabId};
//!
//! let tab = TabId::generate();
//! let gadget = GadgetId::generate();
//!
//! // IDs are different types - this won't compile:
//! // let wrong: TabId = gadget;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::error::{Error, Result};

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Generates a new unique identifier.
            ///
            /// Uses ULID generation which is:
            /// - Lexicographically sortable by creation time
            /// - Globally unique without coordination
            /// - URL-safe and case-insensitive
            #[must_use]
            pub fn generate() -> Self {
                Self(Ulid::new())
            }

            /// Creates an identifier from a raw ULID.
            #[must_use]
            pub const fn from_ulid(ulid: Ulid) -> Self {
                Self(ulid)
            }

            /// Returns the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> Ulid {
                self.0
            }

            /// Returns the creation timestamp encoded in the ID.
            #[must_use]
            pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
                let ms = self.0.timestamp_ms();
                chrono::DateTime::from_timestamp_millis(ms as i64)
                    .unwrap_or_else(chrono::Utc::now)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Ulid::from_string(s)
                    .map(Self)
                    .map_err(|e| Error::InvalidId {
                        message: format!(concat!("invalid ", $label, " ID '{}': {}"), s, e),
                    })
            }
        }
    };
}

entity_id!(
    /// A unique identifier for a tab group.
    ///
    /// A tab group is the ordered set of tabs making up one start page
    /// (a person's, a group's, or a gallery template's).
    TabGroupId,
    "tab group"
);

entity_id!(
    /// A unique identifier for a tab.
    ///
    /// Tabs place a [`TabTemplateId`]-referenced layout at a position
    /// within a tab group.
    TabId,
    "tab"
);

entity_id!(
    /// A unique identifier for a tab template.
    ///
    /// Templates hold the column layout and gadget set a tab displays.
    TabTemplateId,
    "tab template"
);

entity_id!(
    /// A unique identifier for a gadget instance.
    GadgetId,
    "gadget"
);
