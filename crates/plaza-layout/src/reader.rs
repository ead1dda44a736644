//! Read paths over the layout store.
//!
//! The reader is the lookup facade consumed by the service layer and by
//! the mutation engines' callers: resolve a tab with its template and
//! gadgets eagerly attached, walk from a gadget to its owning template or
//! tab, and from a tab to its owning group.
//!
//! Store primitives underneath return `Option`; absence becomes a
//! [`LayoutError::NotFound`] only here, at the facade boundary.

use std::sync::Arc;

use plaza_core::id::{GadgetId, TabId, TabTemplateId};

use crate::error::{LayoutError, Result};
use crate::record::{ResolvedTab, TabGroup, TabTemplate};
use crate::store::{LayoutStore, Tables};

/// Read-only lookup facade over the layout store.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use plaza_layout::reader::LayoutReader;
/// use plaza_layout::record::LayoutKind;
/// use plaza_layout::store::LayoutStore;
///
/// let store = Arc::new(LayoutStore::new());
/// let group = store.create_tab_group(false);
/// let tab = store.create_tab(group.id, "Home", LayoutKind::TwoColumn).unwrap();
///
/// let reader = LayoutReader::new(store);
/// let resolved = reader.find_tab_by_id(tab.id).unwrap();
/// assert_eq!(resolved.template.id, tab.template_id);
/// ```
pub struct LayoutReader {
    store: Arc<LayoutStore>,
}

impl LayoutReader {
    /// Creates a reader over the given store.
    #[must_use]
    pub fn new(store: Arc<LayoutStore>) -> Self {
        Self { store }
    }

    /// Finds an active tab by id with its template and active gadgets
    /// eagerly resolved, gadgets in render order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the tab does not resolve to an active record.
    pub fn find_tab_by_id(&self, tab_id: TabId) -> Result<ResolvedTab> {
        self.store.read(|t| {
            let tab = t
                .tabs
                .get(&tab_id)
                .filter(|tab| tab.is_active())
                .cloned()
                .ok_or_else(|| LayoutError::not_found("tab", tab_id))?;
            resolve(t, tab)
        })
    }

    /// Finds the owning template of an active gadget.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the gadget does not resolve to an active
    /// record or its template has been purged.
    pub fn find_template_by_gadget_id(&self, gadget_id: GadgetId) -> Result<TabTemplate> {
        self.store.read(|t| {
            let gadget = t
                .gadgets
                .get(&gadget_id)
                .filter(|g| g.is_active())
                .ok_or_else(|| LayoutError::not_found("gadget", gadget_id))?;
            t.templates
                .get(&gadget.template_id)
                .cloned()
                .ok_or_else(|| LayoutError::not_found("tab template", gadget.template_id))
        })
    }

    /// Finds the tab containing a gadget, with template and gadgets
    /// eagerly resolved.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the gadget does not resolve to an active
    /// record or no active tab references its template.
    pub fn find_tab_by_gadget_id(&self, gadget_id: GadgetId) -> Result<ResolvedTab> {
        self.store.read(|t| {
            let gadget = t
                .gadgets
                .get(&gadget_id)
                .filter(|g| g.is_active())
                .ok_or_else(|| LayoutError::not_found("gadget", gadget_id))?;
            let tab = t
                .tabs
                .values()
                .filter(|tab| tab.is_active() && tab.template_id == gadget.template_id)
                .min_by_key(|tab| tab.id)
                .cloned()
                .ok_or_else(|| LayoutError::not_found("tab", gadget_id))?;
            resolve(t, tab)
        })
    }

    /// Finds the group owning a tab, filtered by the tab's deletion state.
    ///
    /// With `deleted = false` the tab must be active; with `deleted = true`
    /// it must be a tombstone. This mirrors the two callers: display paths
    /// resolve through active tabs, undelete paths through tombstones.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no tab in the requested state exists or its
    /// group does not resolve.
    pub fn find_tab_group_by_tab_id(&self, tab_id: TabId, deleted: bool) -> Result<TabGroup> {
        self.store.read(|t| {
            let tab = t
                .tabs
                .get(&tab_id)
                .filter(|tab| tab.deleted == deleted)
                .ok_or_else(|| LayoutError::not_found("tab", tab_id))?;
            t.groups
                .get(&tab.tab_group_id)
                .cloned()
                .ok_or_else(|| LayoutError::not_found("tab group", tab.tab_group_id))
        })
    }

    /// Number of tabs, in any lifecycle state short of purged, referencing
    /// the template.
    #[must_use]
    pub fn tab_count_for_template(&self, template_id: TabTemplateId) -> usize {
        self.store.read(|t| t.tab_count_for_template(template_id))
    }
}

fn resolve(t: &Tables, tab: crate::record::Tab) -> Result<ResolvedTab> {
    let template = t
        .templates
        .get(&tab.template_id)
        .cloned()
        .ok_or_else(|| LayoutError::not_found("tab template", tab.template_id))?;
    let gadgets = t.sorted_active_gadgets(template.id);
    Ok(ResolvedTab {
        tab,
        template,
        gadgets,
    })
}
