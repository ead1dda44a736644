//! Error types for layout operations.

use plaza_core::id::{GadgetId, TabGroupId, TabId};
use thiserror::Error;

/// Result type alias for layout operations.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Errors that can occur during layout operations.
///
/// Lookup primitives on the store return `Option`; `NotFound` is produced
/// only at the public facade boundary. The deletion/undeletion variants
/// carry the id the caller was operating on so the service layer can
/// translate them into user-facing messages.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// A referenced entity did not resolve to a record in the expected state.
    #[error("not found: {kind} with id {id}")]
    NotFound {
        /// The kind of entity that was looked up.
        kind: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// The tab-to-group relationship could not be established before a delete.
    #[error("could not delete tab {id}: {reason}")]
    TabDeletion {
        /// The tab the caller tried to delete.
        id: TabId,
        /// Description of the failure.
        reason: String,
    },

    /// The tab tombstone is missing or its owning group cannot be resolved.
    #[error("could not undelete tab {id}: {reason}")]
    TabUndeletion {
        /// The tab the caller tried to undelete.
        id: TabId,
        /// Description of the failure.
        reason: String,
    },

    /// The gadget-to-template relationship could not be established before a delete.
    #[error("could not delete gadget {id}: {reason}")]
    GadgetDeletion {
        /// The gadget the caller tried to delete.
        id: GadgetId,
        /// Description of the failure.
        reason: String,
    },

    /// The gadget tombstone is missing or its owning template cannot be resolved.
    #[error("could not undelete gadget {id}: {reason}")]
    GadgetUndeletion {
        /// The gadget the caller tried to undelete.
        id: GadgetId,
        /// Description of the failure.
        reason: String,
    },

    /// The target tab group is read-only and rejects membership changes.
    #[error("tab group {id} is read-only")]
    ReadOnlyGroup {
        /// The read-only group.
        id: TabGroupId,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl LayoutError {
    /// Creates a not-found error for the given entity kind and id.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}
