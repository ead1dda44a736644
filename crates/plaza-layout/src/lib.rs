//! # plaza-layout
//!
//! Tab and gadget layout lifecycle engine for the Plaza start-page
//! platform.
//!
//! This crate implements the layout domain, providing:
//!
//! - **Layout Store**: Arena-of-records tables for tab groups, tabs, tab
//!   templates, and gadgets, with one lock serializing all mutations
//! - **Gadget Placement**: Move/delete/undelete gadgets while keeping
//!   zone indices contiguous
//! - **Tab Lifecycle**: Delete/undelete tabs with last-reference cascade
//!   to the template and its gadgets
//! - **Tombstone Reaper**: Deferred permanent purge once the undo window
//!   has elapsed
//! - **Lookup Facade**: Read paths resolving tabs with templates and
//!   gadgets eagerly attached
//!
//! ## Soft Delete
//!
//! Deletes are soft: records are tombstoned with a deletion timestamp and
//! keep their position fields so an undelete within the undo window
//! (default 20 minutes) restores them exactly where they were. Tombstones
//! past the window are purged permanently by the reaper, which runs
//! piggybacked on every delete and optionally on a timer.
//!
//! ```text
//! Active ──delete──▶ Deleted (tombstone) ──sweep──▶ Purged (terminal)
//!    ▲                   │
//!    └─────undelete──────┘        (only before purge)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use plaza_core::clock::SystemClock;
//! use plaza_layout::prelude::*;
//!
//! let store = Arc::new(LayoutStore::new());
//! let clock: plaza_core::clock::SharedClock = Arc::new(SystemClock);
//! let placement = PlacementEngine::new(
//!     Arc::clone(&store),
//!     UndoPolicy::default(),
//!     Arc::clone(&clock),
//!     Arc::new(NoopReindex),
//! );
//!
//! let group = store.create_tab_group(false);
//! let tab = store.create_tab(group.id, "Home", LayoutKind::TwoColumn).unwrap();
//! let gadget = store
//!     .create_gadget(tab.template_id, "http://www.example.com/gadget1.xml", 0)
//!     .unwrap();
//!
//! placement.delete_gadget(gadget.id).unwrap();
//! placement.undelete_gadget(gadget.id).unwrap();
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod placement;
pub mod reader;
pub mod reaper;
pub mod record;
pub mod reindex;
pub mod store;

// Re-export main types at crate root
pub use error::{LayoutError, Result};
pub use lifecycle::TabLifecycle;
pub use placement::{MoveGadget, PlacementEngine};
pub use reader::LayoutReader;
pub use reaper::{ReaperHandle, SweepOutcome, TombstoneReaper, UndoPolicy};
pub use record::{Gadget, LayoutKind, ResolvedTab, Tab, TabGroup, TabTemplate};
pub use reindex::{NoopReindex, SearchEntity, SearchReindex};
pub use store::LayoutStore;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{LayoutError, Result};
    pub use crate::lifecycle::TabLifecycle;
    pub use crate::placement::{MoveGadget, PlacementEngine};
    pub use crate::reader::LayoutReader;
    pub use crate::reaper::{SweepOutcome, TombstoneReaper, UndoPolicy};
    pub use crate::record::{Gadget, LayoutKind, ResolvedTab, Tab, TabGroup, TabTemplate};
    pub use crate::reindex::{NoopReindex, SearchEntity, SearchReindex};
    pub use crate::store::LayoutStore;
}
