//! In-memory transactional store for layout records.
//!
//! The store is the only shared mutable resource in the layout engine.
//! All records live in id-indexed tables ([`Tables`]); relationships are
//! foreign-key id fields and every cascade is an explicit query. Public
//! operations elsewhere in the crate run as one logical transaction: a
//! single write-lock scope that validates first, then applies all index
//! shifts as an atomic unit, so a failed operation never persists a
//! partial shift.
//!
//! Positional invariants are re-checked after every transaction. A
//! violation is a programming-logic bug, not a recoverable condition, and
//! panics rather than self-healing.

use std::collections::HashMap;
use std::sync::RwLock;

use plaza_core::id::{GadgetId, TabGroupId, TabId, TabTemplateId};

use crate::error::{LayoutError, Result};
use crate::record::{
    Gadget, LayoutKind, MAX_TAB_NAME_LENGTH, MAX_USER_PREFS_LENGTH, Tab, TabGroup, TabTemplate,
};

/// Converts a table position into a stored index field.
pub(crate) fn index_u32(position: usize) -> u32 {
    u32::try_from(position).unwrap_or(u32::MAX)
}

/// Id-indexed record tables.
///
/// Crate-internal: engines receive `&mut Tables` inside a store
/// transaction and use these primitives; external callers go through the
/// public facades.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub groups: HashMap<TabGroupId, TabGroup>,
    pub tabs: HashMap<TabId, Tab>,
    pub templates: HashMap<TabTemplateId, TabTemplate>,
    pub gadgets: HashMap<GadgetId, Gadget>,
}

impl Tables {
    /// Number of active gadgets in a `(template, zone)` pair.
    pub fn zone_len(&self, template_id: TabTemplateId, zone_number: u32) -> usize {
        self.gadgets
            .values()
            .filter(|g| {
                g.is_active() && g.template_id == template_id && g.zone_number == zone_number
            })
            .count()
    }

    /// Opens a gap at `at` by incrementing the zone index of every active
    /// gadget in the zone at or after it.
    pub fn open_zone_gap(&mut self, template_id: TabTemplateId, zone_number: u32, at: u32) {
        for gadget in self.gadgets.values_mut() {
            if gadget.is_active()
                && gadget.template_id == template_id
                && gadget.zone_number == zone_number
                && gadget.zone_index >= at
            {
                gadget.zone_index += 1;
            }
        }
    }

    /// Closes the gap left at `after` by decrementing the zone index of
    /// every active gadget in the zone strictly after it.
    pub fn close_zone_gap(&mut self, template_id: TabTemplateId, zone_number: u32, after: u32) {
        for gadget in self.gadgets.values_mut() {
            if gadget.is_active()
                && gadget.template_id == template_id
                && gadget.zone_number == zone_number
                && gadget.zone_index > after
            {
                gadget.zone_index -= 1;
            }
        }
    }

    /// Active gadgets of a template, sorted by `(zone_number, zone_index)`.
    pub fn sorted_active_gadgets(&self, template_id: TabTemplateId) -> Vec<Gadget> {
        let mut gadgets: Vec<Gadget> = self
            .gadgets
            .values()
            .filter(|g| g.is_active() && g.template_id == template_id)
            .cloned()
            .collect();
        gadgets.sort_by_key(|g| (g.zone_number, g.zone_index));
        gadgets
    }

    /// Number of tabs, in any lifecycle state short of purged, that
    /// reference the template. Drives the cascade decision on tab delete
    /// and guards template purge.
    pub fn tab_count_for_template(&self, template_id: TabTemplateId) -> usize {
        self.tabs
            .values()
            .filter(|t| t.template_id == template_id)
            .count()
    }

    /// Re-derives `tab_index` from membership order for every tab in the
    /// group. Invoked after every structural mutation of the membership
    /// list; positions are never trusted to stay in sync by convention.
    pub fn reindex_group_tabs(&mut self, group_id: TabGroupId) {
        let tab_ids = match self.groups.get(&group_id) {
            Some(group) => group.tab_ids.clone(),
            None => return,
        };
        for (position, tab_id) in tab_ids.iter().enumerate() {
            if let Some(tab) = self.tabs.get_mut(tab_id) {
                tab.tab_index = index_u32(position);
            }
        }
    }

    /// Verifies every positional invariant, panicking on violation.
    ///
    /// # Panics
    ///
    /// Panics if zone-index or tab-index contiguity is broken, or if a
    /// group membership list references a missing or deleted tab.
    pub fn assert_invariants(&self) {
        let mut zones: HashMap<(TabTemplateId, u32), Vec<u32>> = HashMap::new();
        for gadget in self.gadgets.values().filter(|g| g.is_active()) {
            zones
                .entry((gadget.template_id, gadget.zone_number))
                .or_default()
                .push(gadget.zone_index);
        }
        for ((template_id, zone_number), mut indices) in zones {
            indices.sort_unstable();
            for (position, found) in indices.iter().enumerate() {
                assert!(
                    *found == index_u32(position),
                    "zone-index contiguity broken: template {template_id} zone {zone_number} \
                     expected index {position}, found {found}"
                );
            }
        }

        for group in self.groups.values() {
            for (position, tab_id) in group.tab_ids.iter().enumerate() {
                let tab = self
                    .tabs
                    .get(tab_id)
                    .unwrap_or_else(|| panic!("group {} references missing tab {tab_id}", group.id));
                assert!(
                    tab.is_active(),
                    "group {} references deleted tab {tab_id}",
                    group.id
                );
                assert!(
                    tab.tab_group_id == group.id,
                    "tab {tab_id} is in group {} membership but owned by {}",
                    group.id,
                    tab.tab_group_id
                );
                assert!(
                    tab.tab_index == index_u32(position),
                    "tab-index contiguity broken: tab {tab_id} at position {position} \
                     carries index {}",
                    tab.tab_index
                );
            }
        }

        for tab in self.tabs.values().filter(|t| t.is_active()) {
            let group = self
                .groups
                .get(&tab.tab_group_id)
                .unwrap_or_else(|| panic!("active tab {} has no group", tab.id));
            assert!(
                group.tab_ids.iter().filter(|id| **id == tab.id).count() == 1,
                "active tab {} appears {} times in group {} membership",
                tab.id,
                group.tab_ids.iter().filter(|id| **id == tab.id).count(),
                group.id
            );
        }
    }
}

fn validate_tab_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if len == 0 || len > MAX_TAB_NAME_LENGTH {
        return Err(LayoutError::InvalidInput(format!(
            "tab name must be 1..={MAX_TAB_NAME_LENGTH} characters, got {len}"
        )));
    }
    Ok(())
}

/// The layout store.
///
/// Holds the record tables behind a single lock. Every public operation
/// in the crate (placement, lifecycle, reaper, reads) serializes through
/// it; conflicting writes to the same template or zone therefore cannot
/// interleave.
///
/// # Example
///
/// ```rust
/// use plaza_layout::store::LayoutStore;
/// use plaza_layout::record::LayoutKind;
///
/// let store = LayoutStore::new();
/// let group = store.create_tab_group(false);
/// let tab = store.create_tab(group.id, "Home", LayoutKind::TwoColumn).unwrap();
/// let gadget = store
///     .create_gadget(tab.template_id, "http://www.example.com/gadget1.xml", 0)
///     .unwrap();
/// assert_eq!(gadget.zone_index, 0);
/// ```
#[derive(Debug, Default)]
pub struct LayoutStore {
    tables: RwLock<Tables>,
}

impl LayoutStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs a read-only closure against the tables.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        let tables = self.tables.read().expect("layout store lock poisoned");
        f(&tables)
    }

    /// Runs a closure as one transaction, then re-checks every positional
    /// invariant.
    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut tables = self.tables.write().expect("layout store lock poisoned");
        let out = f(&mut tables);
        tables.assert_invariants();
        out
    }

    /// Creates a new, empty tab group.
    pub fn create_tab_group(&self, read_only: bool) -> TabGroup {
        let group = TabGroup {
            id: TabGroupId::generate(),
            read_only,
            tab_ids: Vec::new(),
        };
        self.write(|t| {
            t.groups.insert(group.id, group.clone());
        });
        group
    }

    /// Creates a tab (and its backing template) appended at the end of the
    /// group's membership.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the group does not exist, `ReadOnlyGroup` if
    /// it rejects membership changes, or `InvalidInput` for a bad name.
    pub fn create_tab(
        &self,
        group_id: TabGroupId,
        name: impl Into<String>,
        layout: LayoutKind,
    ) -> Result<Tab> {
        let name = name.into();
        validate_tab_name(&name)?;
        self.write(|t| {
            let group = t
                .groups
                .get_mut(&group_id)
                .ok_or_else(|| LayoutError::not_found("tab group", group_id))?;
            if group.read_only {
                return Err(LayoutError::ReadOnlyGroup { id: group_id });
            }

            let template = TabTemplate {
                id: TabTemplateId::generate(),
                layout,
                deleted: false,
                date_deleted: None,
            };
            let tab = Tab {
                id: TabId::generate(),
                name,
                tab_group_id: group_id,
                template_id: template.id,
                tab_index: index_u32(group.tab_ids.len()),
                deleted: false,
                date_deleted: None,
            };
            group.tab_ids.push(tab.id);
            t.templates.insert(template.id, template);
            t.tabs.insert(tab.id, tab.clone());
            Ok(tab)
        })
    }

    /// Creates a tab referencing an existing template, appended at the end
    /// of the group's membership.
    ///
    /// Used when a gallery template is placed on a start page; the new tab
    /// shares the template rather than copying it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the group or template does not resolve,
    /// `ReadOnlyGroup` if the group rejects membership changes, or
    /// `InvalidInput` for a bad name.
    pub fn create_tab_from_template(
        &self,
        group_id: TabGroupId,
        name: impl Into<String>,
        template_id: TabTemplateId,
    ) -> Result<Tab> {
        let name = name.into();
        validate_tab_name(&name)?;
        self.write(|t| {
            if !t
                .templates
                .get(&template_id)
                .is_some_and(TabTemplate::is_active)
            {
                return Err(LayoutError::not_found("tab template", template_id));
            }
            let group = t
                .groups
                .get_mut(&group_id)
                .ok_or_else(|| LayoutError::not_found("tab group", group_id))?;
            if group.read_only {
                return Err(LayoutError::ReadOnlyGroup { id: group_id });
            }

            let tab = Tab {
                id: TabId::generate(),
                name,
                tab_group_id: group_id,
                template_id,
                tab_index: index_u32(group.tab_ids.len()),
                deleted: false,
                date_deleted: None,
            };
            group.tab_ids.push(tab.id);
            t.tabs.insert(tab.id, tab.clone());
            Ok(tab)
        })
    }

    /// Sets a group's read-only flag (gallery archival).
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the group does not exist.
    pub fn set_group_read_only(&self, group_id: TabGroupId, read_only: bool) -> Result<()> {
        self.write(|t| {
            let group = t
                .groups
                .get_mut(&group_id)
                .ok_or_else(|| LayoutError::not_found("tab group", group_id))?;
            group.read_only = read_only;
            Ok(())
        })
    }

    /// Creates a gadget appended at the end of the zone.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the template does not resolve to an active
    /// record, or `InvalidInput` if the zone number is outside the
    /// template's layout.
    pub fn create_gadget(
        &self,
        template_id: TabTemplateId,
        definition_url: impl Into<String>,
        zone_number: u32,
    ) -> Result<Gadget> {
        let definition_url = definition_url.into();
        self.write(|t| {
            let template = t
                .templates
                .get(&template_id)
                .filter(|tpl| tpl.is_active())
                .ok_or_else(|| LayoutError::not_found("tab template", template_id))?;
            if zone_number >= template.layout.zone_count() {
                return Err(LayoutError::InvalidInput(format!(
                    "zone {zone_number} is outside a {:?} layout",
                    template.layout
                )));
            }

            let gadget = Gadget {
                id: GadgetId::generate(),
                template_id,
                definition_url,
                zone_number,
                zone_index: index_u32(t.zone_len(template_id, zone_number)),
                minimized: false,
                maximized: false,
                user_prefs: None,
                deleted: false,
                date_deleted: None,
            };
            t.gadgets.insert(gadget.id, gadget.clone());
            Ok(gadget)
        })
    }

    /// Renames an active tab.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the tab does not resolve to an active record,
    /// or `InvalidInput` for a bad name.
    pub fn rename_tab(&self, tab_id: TabId, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        validate_tab_name(&name)?;
        self.write(|t| {
            let tab = t
                .tabs
                .get_mut(&tab_id)
                .filter(|tab| tab.is_active())
                .ok_or_else(|| LayoutError::not_found("tab", tab_id))?;
            tab.name = name;
            Ok(())
        })
    }

    /// Replaces a gadget's user-preference blob.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the gadget does not resolve to an active
    /// record, or `InvalidInput` if the blob exceeds
    /// [`MAX_USER_PREFS_LENGTH`] characters.
    pub fn set_gadget_user_prefs(
        &self,
        gadget_id: GadgetId,
        user_prefs: Option<String>,
    ) -> Result<()> {
        if let Some(prefs) = &user_prefs {
            let len = prefs.chars().count();
            if len > MAX_USER_PREFS_LENGTH {
                return Err(LayoutError::InvalidInput(format!(
                    "user prefs must be at most {MAX_USER_PREFS_LENGTH} characters, got {len}"
                )));
            }
        }
        self.write(|t| {
            let gadget = t
                .gadgets
                .get_mut(&gadget_id)
                .filter(|g| g.is_active())
                .ok_or_else(|| LayoutError::not_found("gadget", gadget_id))?;
            gadget.user_prefs = user_prefs;
            Ok(())
        })
    }

    /// Sets a gadget's minimized/maximized chrome state.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the gadget does not resolve to an active record.
    pub fn set_gadget_chrome(
        &self,
        gadget_id: GadgetId,
        minimized: bool,
        maximized: bool,
    ) -> Result<()> {
        self.write(|t| {
            let gadget = t
                .gadgets
                .get_mut(&gadget_id)
                .filter(|g| g.is_active())
                .ok_or_else(|| LayoutError::not_found("gadget", gadget_id))?;
            gadget.minimized = minimized;
            gadget.maximized = maximized;
            Ok(())
        })
    }

    /// Number of active gadgets in a `(template, zone)` pair.
    #[must_use]
    pub fn zone_len(&self, template_id: TabTemplateId, zone_number: u32) -> usize {
        self.read(|t| t.zone_len(template_id, zone_number))
    }

    /// Snapshot of a tab record in any lifecycle state.
    #[must_use]
    pub fn tab(&self, tab_id: TabId) -> Option<Tab> {
        self.read(|t| t.tabs.get(&tab_id).cloned())
    }

    /// Snapshot of a gadget record in any lifecycle state.
    #[must_use]
    pub fn gadget(&self, gadget_id: GadgetId) -> Option<Gadget> {
        self.read(|t| t.gadgets.get(&gadget_id).cloned())
    }

    /// Snapshot of a template record in any lifecycle state.
    #[must_use]
    pub fn template(&self, template_id: TabTemplateId) -> Option<TabTemplate> {
        self.read(|t| t.templates.get(&template_id).cloned())
    }

    /// Snapshot of a tab group.
    #[must_use]
    pub fn tab_group(&self, group_id: TabGroupId) -> Option<TabGroup> {
        self.read(|t| t.groups.get(&group_id).cloned())
    }

    /// Re-checks every positional invariant outside a transaction.
    ///
    /// # Panics
    ///
    /// Panics if any invariant is broken; see [`Tables::assert_invariants`].
    pub fn verify_invariants(&self) {
        self.read(Tables::assert_invariants);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_tab() -> (LayoutStore, Tab) {
        let store = LayoutStore::new();
        let group = store.create_tab_group(false);
        let tab = store
            .create_tab(group.id, "Home", LayoutKind::ThreeColumn)
            .unwrap();
        (store, tab)
    }

    #[test]
    fn create_tab_appends_at_end() {
        let store = LayoutStore::new();
        let group = store.create_tab_group(false);
        let first = store.create_tab(group.id, "One", LayoutKind::TwoColumn).unwrap();
        let second = store.create_tab(group.id, "Two", LayoutKind::TwoColumn).unwrap();

        assert_eq!(first.tab_index, 0);
        assert_eq!(second.tab_index, 1);
        assert_eq!(
            store.tab_group(group.id).unwrap().tab_ids,
            vec![first.id, second.id]
        );
    }

    #[test]
    fn create_tab_rejects_read_only_group() {
        let store = LayoutStore::new();
        let group = store.create_tab_group(true);
        let err = store
            .create_tab(group.id, "One", LayoutKind::TwoColumn)
            .unwrap_err();
        assert!(matches!(err, LayoutError::ReadOnlyGroup { id } if id == group.id));
    }

    #[test]
    fn create_tab_validates_name_length() {
        let store = LayoutStore::new();
        let group = store.create_tab_group(false);
        assert!(store.create_tab(group.id, "", LayoutKind::TwoColumn).is_err());
        assert!(
            store
                .create_tab(group.id, "a".repeat(MAX_TAB_NAME_LENGTH + 1), LayoutKind::TwoColumn)
                .is_err()
        );
        // boundary values are accepted
        assert!(store.create_tab(group.id, "a", LayoutKind::TwoColumn).is_ok());
        assert!(
            store
                .create_tab(group.id, "a".repeat(MAX_TAB_NAME_LENGTH), LayoutKind::TwoColumn)
                .is_ok()
        );
    }

    #[test]
    fn create_gadget_appends_per_zone() {
        let (store, tab) = store_with_tab();
        let g0 = store
            .create_gadget(tab.template_id, "http://www.example.com/gadget1.xml", 0)
            .unwrap();
        let g1 = store
            .create_gadget(tab.template_id, "http://www.example.com/gadget2.xml", 0)
            .unwrap();
        let other_zone = store
            .create_gadget(tab.template_id, "http://www.example.com/gadget3.xml", 2)
            .unwrap();

        assert_eq!(g0.zone_index, 0);
        assert_eq!(g1.zone_index, 1);
        assert_eq!(other_zone.zone_index, 0);
        store.verify_invariants();
    }

    #[test]
    fn create_gadget_rejects_zone_outside_layout() {
        let store = LayoutStore::new();
        let group = store.create_tab_group(false);
        let tab = store.create_tab(group.id, "Home", LayoutKind::TwoColumn).unwrap();
        let err = store
            .create_gadget(tab.template_id, "http://www.example.com/gadget1.xml", 2)
            .unwrap_err();
        assert!(matches!(err, LayoutError::InvalidInput(_)));
    }

    #[test]
    fn user_prefs_length_is_bounded() {
        let (store, tab) = store_with_tab();
        let gadget = store
            .create_gadget(tab.template_id, "http://www.example.com/gadget1.xml", 0)
            .unwrap();

        store
            .set_gadget_user_prefs(gadget.id, Some("{\"color\":\"blue\"}".to_string()))
            .unwrap();
        let err = store
            .set_gadget_user_prefs(gadget.id, Some("x".repeat(MAX_USER_PREFS_LENGTH + 1)))
            .unwrap_err();
        assert!(matches!(err, LayoutError::InvalidInput(_)));
    }

    #[test]
    fn gadget_chrome_state_roundtrips() {
        let (store, tab) = store_with_tab();
        let gadget = store
            .create_gadget(tab.template_id, "http://www.example.com/gadget1.xml", 0)
            .unwrap();

        store.set_gadget_chrome(gadget.id, true, false).unwrap();
        let stored = store.gadget(gadget.id).unwrap();
        assert!(stored.minimized);
        assert!(!stored.maximized);
    }

    #[test]
    fn rename_tab_rejects_long_name() {
        let (store, tab) = store_with_tab();
        assert!(store.rename_tab(tab.id, "Renamed").is_ok());
        assert!(store.rename_tab(tab.id, "a".repeat(17)).is_err());
        assert_eq!(store.tab(tab.id).unwrap().name, "Renamed");
    }
}
