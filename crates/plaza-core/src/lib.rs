//! # plaza-core
//!
//! Core abstractions for the Plaza start-page platform.
//!
//! This crate provides the foundational types used across all Plaza components:
//!
//! - **Identifiers**: Strongly-typed IDs for tab groups, tabs, templates, and gadgets
//! - **Clock**: Injectable time source so lifecycle windows are testable
//! - **Error Types**: Shared error definitions and result types
//! - **Observability**: Logging bootstrap shared by binaries and test harnesses
//!
//! ## Crate Boundary
//!
//! `plaza-core` is the **only** crate allowed to define shared primitives.
//! Domain crates (layout, streams, profiles) build on these contracts and
//! never redefine them.
//!
//! ## Example
//!
//! ```rust
//! use plaza_core::prelude::*;
//!
//! let tab = TabId::generate();
//! let gadget = GadgetId::generate();
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod clock;
pub mod error;
pub mod id;
pub mod observability;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use plaza_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::clock::{Clock, SharedClock, SystemClock};
    pub use crate::error::{Error, Result};
    pub use crate::id::{GadgetId, TabGroupId, TabId, TabTemplateId};
}

pub use clock::{Clock, SharedClock, SystemClock};
pub use error::{Error, Result};
pub use id::{GadgetId, TabGroupId, TabId, TabTemplateId};
