//! Tab lifecycle manager: delete and undelete tabs with template cascade.
//!
//! Per-tab state machine: **Active → Deleted (tombstoned) → Purged
//! (terminal)**, with **Deleted → Active** permitted only before the
//! reaper purges the tombstone.
//!
//! Deleting the last tab referencing a template cascades the soft delete
//! to the template and its active gadgets, stamping all of them with the
//! same deletion timestamp. Undelete reverses exactly that cascade: only
//! gadgets whose tombstone carries the cascade timestamp reactivate, so a
//! gadget deleted independently beforehand stays deleted.

use std::sync::Arc;
use std::time::Instant;

use plaza_core::clock::SharedClock;
use plaza_core::id::TabId;

use crate::error::{LayoutError, Result};
use crate::reaper::{UndoPolicy, log_sweep, purge_expired};
use crate::record::ResolvedTab;
use crate::reindex::{SearchEntity, SearchReindex};
use crate::store::{LayoutStore, index_u32};

/// The tab lifecycle manager.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use plaza_core::clock::SystemClock;
/// use plaza_layout::lifecycle::TabLifecycle;
/// use plaza_layout::reaper::UndoPolicy;
/// use plaza_layout::record::LayoutKind;
/// use plaza_layout::reindex::NoopReindex;
/// use plaza_layout::store::LayoutStore;
///
/// let store = Arc::new(LayoutStore::new());
/// let lifecycle = TabLifecycle::new(
///     Arc::clone(&store),
///     UndoPolicy::default(),
///     Arc::new(SystemClock),
///     Arc::new(NoopReindex),
/// );
///
/// let group = store.create_tab_group(false);
/// let tab = store.create_tab(group.id, "Home", LayoutKind::TwoColumn).unwrap();
///
/// lifecycle.delete_tab(tab.id).unwrap();
/// let restored = lifecycle.undelete_tab(tab.id).unwrap();
/// assert_eq!(restored.tab.tab_index, 0);
/// ```
pub struct TabLifecycle {
    store: Arc<LayoutStore>,
    policy: UndoPolicy,
    clock: SharedClock,
    reindex: Arc<dyn SearchReindex>,
}

impl TabLifecycle {
    /// Creates a lifecycle manager over the given store.
    #[must_use]
    pub fn new(
        store: Arc<LayoutStore>,
        policy: UndoPolicy,
        clock: SharedClock,
        reindex: Arc<dyn SearchReindex>,
    ) -> Self {
        Self {
            store,
            policy,
            clock,
            reindex,
        }
    }

    /// Soft-deletes a tab, compacting the group's membership.
    ///
    /// If this tab is the last one referencing its template, the template
    /// and its active gadgets are cascade-deleted with the same timestamp
    /// so they can later be undeleted together. The tombstone keeps its
    /// former `tab_index` for exact reinsertion. Piggybacks an expiry
    /// sweep for tombstones past the undo window.
    ///
    /// # Errors
    ///
    /// Returns `TabDeletion` if the tab or its owning group does not
    /// resolve, or `ReadOnlyGroup` if the group rejects membership
    /// changes.
    pub fn delete_tab(&self, tab_id: TabId) -> Result<()> {
        let start = Instant::now();
        let now = self.clock.now();
        let cutoff = self.policy.cutoff(now);

        let deleted = self.store.write(|t| {
            let (group_id, template_id) = match t.tabs.get(&tab_id) {
                Some(tab) if tab.is_active() => (tab.tab_group_id, tab.template_id),
                _ => {
                    return Err(LayoutError::TabDeletion {
                        id: tab_id,
                        reason: "could not find either the specified tab or tab group"
                            .to_string(),
                    });
                }
            };
            let group = t.groups.get(&group_id).ok_or_else(|| LayoutError::TabDeletion {
                id: tab_id,
                reason: "could not find either the specified tab or tab group".to_string(),
            })?;
            if group.read_only {
                return Err(LayoutError::ReadOnlyGroup { id: group_id });
            }
            if !group.tab_ids.contains(&tab_id) {
                return Err(LayoutError::TabDeletion {
                    id: tab_id,
                    reason: "tab is not owned by its tab group".to_string(),
                });
            }

            // last referencing tab: cascade the soft delete so template and
            // gadgets can be undeleted together
            let cascaded = t.tab_count_for_template(template_id) == 1;
            if cascaded {
                for gadget in t
                    .gadgets
                    .values_mut()
                    .filter(|g| g.is_active() && g.template_id == template_id)
                {
                    gadget.deleted = true;
                    gadget.date_deleted = Some(now);
                }
                if let Some(template) = t.templates.get_mut(&template_id) {
                    template.deleted = true;
                    template.date_deleted = Some(now);
                }
            }

            // compact the membership; the tombstone keeps its former index
            if let Some(group) = t.groups.get_mut(&group_id) {
                group.tab_ids.retain(|id| *id != tab_id);
            }
            t.reindex_group_tabs(group_id);
            if let Some(tab) = t.tabs.get_mut(&tab_id) {
                tab.deleted = true;
                tab.date_deleted = Some(now);
            }
            Ok((cascaded.then_some(template_id), purge_expired(t, cutoff)))
        });

        match deleted {
            Ok((cascaded_template, outcome)) => {
                self.reindex.reindex(SearchEntity::Tab(tab_id));
                if let Some(template_id) = cascaded_template {
                    self.reindex.reindex(SearchEntity::TabTemplate(template_id));
                }
                tracing::debug!(
                    tab = %tab_id,
                    cascaded = cascaded_template.is_some(),
                    "soft-deleted tab"
                );
                crate::metrics::record_operation("delete_tab");
                log_sweep("delete_tab", outcome, start.elapsed().as_secs_f64());
                Ok(())
            }
            Err(err) => {
                crate::metrics::record_operation_error("delete_tab");
                Err(err)
            }
        }
    }

    /// Reactivates a tombstoned tab at its former position.
    ///
    /// Reinserts the tab into the group's membership at the tombstoned
    /// index, then reactivates the template and exactly the gadgets that
    /// were cascade-deleted with it.
    ///
    /// # Errors
    ///
    /// Returns `TabUndeletion` if no tombstone exists for the id (never
    /// deleted, or already purged) or the owning group/template no longer
    /// resolves, or `ReadOnlyGroup` if the group rejects membership
    /// changes.
    pub fn undelete_tab(&self, tab_id: TabId) -> Result<ResolvedTab> {
        let restored = self.store.write(|t| {
            let mut tab = match t.tabs.get(&tab_id) {
                Some(tab) if tab.deleted => tab.clone(),
                _ => {
                    return Err(LayoutError::TabUndeletion {
                        id: tab_id,
                        reason: "no tombstone exists for the tab".to_string(),
                    });
                }
            };
            let group = t
                .groups
                .get(&tab.tab_group_id)
                .ok_or_else(|| LayoutError::TabUndeletion {
                    id: tab_id,
                    reason: "owning tab group no longer resolves".to_string(),
                })?;
            if group.read_only {
                return Err(LayoutError::ReadOnlyGroup { id: group.id });
            }
            let mut template =
                t.templates
                    .get(&tab.template_id)
                    .cloned()
                    .ok_or_else(|| LayoutError::TabUndeletion {
                        id: tab_id,
                        reason: "owning tab template no longer resolves".to_string(),
                    })?;

            // reinsert at the tombstoned index, clamped to the current end
            let group_id = group.id;
            let at = usize::try_from(tab.tab_index)
                .unwrap_or(usize::MAX)
                .min(group.tab_ids.len());
            if let Some(group) = t.groups.get_mut(&group_id) {
                group.tab_ids.insert(at, tab_id);
            }
            tab.deleted = false;
            tab.date_deleted = None;
            tab.tab_index = index_u32(at);
            t.tabs.insert(tab_id, tab.clone());
            t.reindex_group_tabs(group_id);

            // reverse the cascade: the template and exactly the gadgets
            // tombstoned with it
            let template_reactivated = template.deleted;
            if template.deleted {
                let cascade_stamp = template.date_deleted;
                template.deleted = false;
                template.date_deleted = None;
                t.templates.insert(template.id, template.clone());
                for gadget in t.gadgets.values_mut().filter(|g| {
                    g.deleted && g.template_id == template.id && g.date_deleted == cascade_stamp
                }) {
                    gadget.deleted = false;
                    gadget.date_deleted = None;
                }
            }

            let gadgets = t.sorted_active_gadgets(template.id);
            Ok((
                template_reactivated,
                ResolvedTab {
                    tab,
                    template,
                    gadgets,
                },
            ))
        });

        match restored {
            Ok((template_reactivated, resolved)) => {
                self.reindex.reindex(SearchEntity::Tab(tab_id));
                if template_reactivated {
                    self.reindex
                        .reindex(SearchEntity::TabTemplate(resolved.template.id));
                }
                tracing::debug!(
                    tab = %tab_id,
                    tab_index = resolved.tab.tab_index,
                    template_reactivated,
                    "undeleted tab"
                );
                crate::metrics::record_operation("undelete_tab");
                Ok(resolved)
            }
            Err(err) => {
                crate::metrics::record_operation_error("undelete_tab");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::LayoutKind;
    use crate::reindex::NoopReindex;
    use plaza_core::clock::SystemClock;
    use plaza_core::id::TabGroupId;

    struct Fixture {
        store: Arc<LayoutStore>,
        lifecycle: TabLifecycle,
        group_id: TabGroupId,
        tabs: Vec<crate::record::Tab>,
    }

    fn fixture(tab_count: usize) -> Fixture {
        let store = Arc::new(LayoutStore::new());
        let lifecycle = TabLifecycle::new(
            Arc::clone(&store),
            UndoPolicy::default(),
            Arc::new(SystemClock),
            Arc::new(NoopReindex),
        );
        let group = store.create_tab_group(false);
        let tabs = (0..tab_count)
            .map(|i| {
                store
                    .create_tab(group.id, format!("Tab {i}"), LayoutKind::TwoColumn)
                    .unwrap()
            })
            .collect();
        Fixture {
            store,
            lifecycle,
            group_id: group.id,
            tabs,
        }
    }

    #[test]
    fn delete_compacts_remaining_tabs() {
        let f = fixture(3);

        f.lifecycle.delete_tab(f.tabs[1].id).unwrap();

        let group = f.store.tab_group(f.group_id).unwrap();
        assert_eq!(group.tab_ids, vec![f.tabs[0].id, f.tabs[2].id]);
        assert_eq!(f.store.tab(f.tabs[0].id).unwrap().tab_index, 0);
        assert_eq!(f.store.tab(f.tabs[2].id).unwrap().tab_index, 1);

        let tombstone = f.store.tab(f.tabs[1].id).unwrap();
        assert!(tombstone.deleted);
        assert_eq!(tombstone.tab_index, 1, "tombstone keeps its former index");
        assert!(tombstone.date_deleted.is_some());
        f.store.verify_invariants();
    }

    #[test]
    fn delete_then_undelete_restores_position() {
        let f = fixture(3);

        f.lifecycle.delete_tab(f.tabs[1].id).unwrap();
        let restored = f.lifecycle.undelete_tab(f.tabs[1].id).unwrap();

        assert_eq!(restored.tab.tab_index, 1);
        let group = f.store.tab_group(f.group_id).unwrap();
        assert_eq!(group.tab_ids, vec![f.tabs[0].id, f.tabs[1].id, f.tabs[2].id]);
        f.store.verify_invariants();
    }

    #[test]
    fn last_reference_cascades_to_template_and_gadgets() {
        let f = fixture(1);
        let template_id = f.tabs[0].template_id;
        let gadget = f
            .store
            .create_gadget(template_id, "http://www.example.com/gadget1.xml", 0)
            .unwrap();

        f.lifecycle.delete_tab(f.tabs[0].id).unwrap();

        let template = f.store.template(template_id).unwrap();
        let gadget = f.store.gadget(gadget.id).unwrap();
        assert!(template.deleted);
        assert!(gadget.deleted);
        assert_eq!(
            template.date_deleted, gadget.date_deleted,
            "cascade stamps template and gadgets together"
        );
    }

    #[test]
    fn undelete_reverses_the_cascade() {
        let f = fixture(1);
        let template_id = f.tabs[0].template_id;
        let gadget = f
            .store
            .create_gadget(template_id, "http://www.example.com/gadget1.xml", 0)
            .unwrap();

        f.lifecycle.delete_tab(f.tabs[0].id).unwrap();
        let restored = f.lifecycle.undelete_tab(f.tabs[0].id).unwrap();

        assert!(!restored.template.deleted);
        assert_eq!(restored.gadgets.len(), 1);
        assert_eq!(restored.gadgets[0].id, gadget.id);
        assert!(!f.store.template(template_id).unwrap().deleted);
    }

    #[test]
    fn shared_template_is_not_cascaded() {
        // two tabs referencing one template: deleting one leaves the
        // template and its gadgets active
        let f = fixture(1);
        let template_id = f.tabs[0].template_id;
        let gadget = f
            .store
            .create_gadget(template_id, "http://www.example.com/gadget1.xml", 0)
            .unwrap();

        // archival copy referencing the same template
        f.store
            .create_tab_from_template(f.group_id, "Archive", template_id)
            .unwrap();

        f.lifecycle.delete_tab(f.tabs[0].id).unwrap();

        assert!(!f.store.template(template_id).unwrap().deleted);
        assert!(!f.store.gadget(gadget.id).unwrap().deleted);
    }

    #[test]
    fn undelete_of_active_tab_fails() {
        let f = fixture(2);
        let err = f.lifecycle.undelete_tab(f.tabs[0].id).unwrap_err();
        assert!(matches!(err, LayoutError::TabUndeletion { id, .. } if id == f.tabs[0].id));
    }

    #[test]
    fn delete_of_unknown_tab_fails() {
        let f = fixture(1);
        let err = f.lifecycle.delete_tab(TabId::generate()).unwrap_err();
        assert!(matches!(err, LayoutError::TabDeletion { .. }));
    }

    #[test]
    fn read_only_group_rejects_delete() {
        let store = Arc::new(LayoutStore::new());
        let lifecycle = TabLifecycle::new(
            Arc::clone(&store),
            UndoPolicy::default(),
            Arc::new(SystemClock),
            Arc::new(NoopReindex),
        );
        let group = store.create_tab_group(false);
        let tab = store.create_tab(group.id, "Home", LayoutKind::TwoColumn).unwrap();
        store.set_group_read_only(group.id, true).unwrap();

        let err = lifecycle.delete_tab(tab.id).unwrap_err();
        assert!(matches!(err, LayoutError::ReadOnlyGroup { id } if id == group.id));
    }
}
