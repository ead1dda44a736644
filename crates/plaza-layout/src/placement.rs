//! Gadget placement engine: delete, undelete, and move gadgets while
//! keeping zone indices contiguous.
//!
//! Every operation runs as one store transaction. Validation happens
//! before the first write, so a failed operation never persists a partial
//! index shift.

use std::sync::Arc;
use std::time::Instant;

use plaza_core::clock::SharedClock;
use plaza_core::id::{GadgetId, TabTemplateId};

use crate::error::{LayoutError, Result};
use crate::reaper::{UndoPolicy, log_sweep, purge_expired};
use crate::record::{Gadget, TabTemplate};
use crate::reindex::{SearchEntity, SearchReindex};
use crate::store::{LayoutStore, index_u32};

/// A gadget relocation request.
///
/// Source coordinates describe where the caller believes the gadget is;
/// they are checked against the stored position before any shift is
/// applied, and the gap the move leaves behind is closed using them, not
/// the post-move position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveGadget {
    /// The gadget being moved.
    pub gadget_id: GadgetId,
    /// Template the gadget is moving from.
    pub source_template_id: TabTemplateId,
    /// Zone the gadget is moving from.
    pub source_zone_number: u32,
    /// Position within the source zone.
    pub source_zone_index: u32,
    /// Template the gadget is moving to.
    pub target_template_id: TabTemplateId,
    /// Zone the gadget is moving to.
    pub target_zone_number: u32,
    /// Position within the target zone. Values past the end of the zone
    /// append the gadget at the end.
    pub target_zone_index: u32,
}

/// The gadget placement engine.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use plaza_core::clock::SystemClock;
/// use plaza_layout::placement::PlacementEngine;
/// use plaza_layout::reaper::UndoPolicy;
/// use plaza_layout::record::LayoutKind;
/// use plaza_layout::reindex::NoopReindex;
/// use plaza_layout::store::LayoutStore;
///
/// let store = Arc::new(LayoutStore::new());
/// let engine = PlacementEngine::new(
///     Arc::clone(&store),
///     UndoPolicy::default(),
///     Arc::new(SystemClock),
///     Arc::new(NoopReindex),
/// );
///
/// let group = store.create_tab_group(false);
/// let tab = store.create_tab(group.id, "Home", LayoutKind::TwoColumn).unwrap();
/// let gadget = store
///     .create_gadget(tab.template_id, "http://www.example.com/gadget1.xml", 0)
///     .unwrap();
///
/// engine.delete_gadget(gadget.id).unwrap();
/// let restored = engine.undelete_gadget(gadget.id).unwrap();
/// assert_eq!(restored.zone_index, gadget.zone_index);
/// ```
pub struct PlacementEngine {
    store: Arc<LayoutStore>,
    policy: UndoPolicy,
    clock: SharedClock,
    reindex: Arc<dyn SearchReindex>,
}

impl PlacementEngine {
    /// Creates a placement engine over the given store.
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

    /// Soft-deletes a gadget, compacting the zone it leaves.
    ///
    /// Active gadgets in the same `(template, zone)` with a higher zone
    /// index shift down by one; the tombstone keeps its pre-deletion index
    /// so it can be reinserted at the same place later. Piggybacks an
    /// expiry sweep for tombstones past the undo window.
    ///
    /// # Errors
    ///
    /// Returns `GadgetDeletion` if the gadget or its owning template does
    /// not resolve to an active record.
    pub fn delete_gadget(&self, gadget_id: GadgetId) -> Result<()> {
        let start = Instant::now();
        let now = self.clock.now();
        let cutoff = self.policy.cutoff(now);

        let swept = self.store.write(|t| {
            let (template_id, zone_number, zone_index) = match t.gadgets.get(&gadget_id) {
                Some(g) if g.is_active() => (g.template_id, g.zone_number, g.zone_index),
                _ => {
                    return Err(LayoutError::GadgetDeletion {
                        id: gadget_id,
                        reason: "could not find either the specified gadget or tab template"
                            .to_string(),
                    });
                }
            };
            if !t
                .templates
                .get(&template_id)
                .is_some_and(TabTemplate::is_active)
            {
                return Err(LayoutError::GadgetDeletion {
                    id: gadget_id,
                    reason: "could not find either the specified gadget or tab template"
                        .to_string(),
                });
            }

            // close the gap the gadget leaves; the gadget itself keeps its index
            t.close_zone_gap(template_id, zone_number, zone_index);
            if let Some(gadget) = t.gadgets.get_mut(&gadget_id) {
                gadget.deleted = true;
                gadget.date_deleted = Some(now);
            }
            Ok(purge_expired(t, cutoff))
        });

        match swept {
            Ok(outcome) => {
                self.reindex.reindex(SearchEntity::Gadget(gadget_id));
                tracing::debug!(gadget = %gadget_id, "soft-deleted gadget");
                crate::metrics::record_operation("delete_gadget");
                log_sweep("delete_gadget", outcome, start.elapsed().as_secs_f64());
                Ok(())
            }
            Err(err) => {
                crate::metrics::record_operation_error("delete_gadget");
                Err(err)
            }
        }
    }

    /// Reactivates a soft-deleted gadget at its tombstoned position.
    ///
    /// Active gadgets in the zone at or after the stored index shift up by
    /// one, reopening the gap the delete closed. A stored index past the
    /// current end of the zone (possible after intervening deletes)
    /// reinserts at the end instead of tearing a hole.
    ///
    /// # Errors
    ///
    /// Returns `GadgetUndeletion` if no tombstone exists for the id (never
    /// deleted, or already purged) or its owning template no longer
    /// resolves.
    pub fn undelete_gadget(&self, gadget_id: GadgetId) -> Result<Gadget> {
        let restored = self.store.write(|t| {
            let (template_id, zone_number, stored_index) = match t.gadgets.get(&gadget_id) {
                Some(g) if g.deleted => (g.template_id, g.zone_number, g.zone_index),
                _ => {
                    return Err(LayoutError::GadgetUndeletion {
                        id: gadget_id,
                        reason: "no tombstone exists for the gadget".to_string(),
                    });
                }
            };
            if !t.templates.contains_key(&template_id) {
                return Err(LayoutError::GadgetUndeletion {
                    id: gadget_id,
                    reason: "owning tab template no longer resolves".to_string(),
                });
            }

            let restore_at = stored_index.min(index_u32(t.zone_len(template_id, zone_number)));
            t.open_zone_gap(template_id, zone_number, restore_at);
            match t.gadgets.get_mut(&gadget_id) {
                Some(gadget) => {
                    gadget.deleted = false;
                    gadget.date_deleted = None;
                    gadget.zone_index = restore_at;
                    Ok(gadget.clone())
                }
                None => Err(LayoutError::GadgetUndeletion {
                    id: gadget_id,
                    reason: "gadget tombstone vanished mid-transaction".to_string(),
                }),
            }
        });

        match restored {
            Ok(gadget) => {
                self.reindex.reindex(SearchEntity::Gadget(gadget_id));
                tracing::debug!(gadget = %gadget_id, zone_index = gadget.zone_index, "undeleted gadget");
                crate::metrics::record_operation("undelete_gadget");
                Ok(gadget)
            }
            Err(err) => {
                crate::metrics::record_operation_error("undelete_gadget");
                Err(err)
            }
        }
    }

    /// Relocates a gadget between positions, zones, or templates.
    ///
    /// Three-phase index update: open a gap at the target position, move
    /// the gadget into it, then close the gap left at the original source
    /// position. The gap must open before the gadget moves so indices
    /// cannot collide when source and target zones coincide. Pure
    /// relocation: lifecycle fields are never touched and no expiry sweep
    /// runs.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the gadget or target template does not
    /// resolve to an active record, or `InvalidInput` if the source
    /// coordinates disagree with the stored position or the target zone is
    /// outside the target layout.
    pub fn move_gadget(&self, request: &MoveGadget) -> Result<()> {
        let moved = self.store.write(|t| {
            let gadget = t
                .gadgets
                .get(&request.gadget_id)
                .filter(|g| g.is_active())
                .ok_or_else(|| LayoutError::not_found("gadget", request.gadget_id))?;
            if gadget.template_id != request.source_template_id
                || gadget.zone_number != request.source_zone_number
                || gadget.zone_index != request.source_zone_index
            {
                return Err(LayoutError::InvalidInput(format!(
                    "source coordinates (template {}, zone {}, index {}) do not match the stored \
                     gadget position",
                    request.source_template_id,
                    request.source_zone_number,
                    request.source_zone_index
                )));
            }
            let target_template = t
                .templates
                .get(&request.target_template_id)
                .filter(|tpl| tpl.is_active())
                .ok_or_else(|| LayoutError::not_found("tab template", request.target_template_id))?;
            if request.target_zone_number >= target_template.layout.zone_count() {
                return Err(LayoutError::InvalidInput(format!(
                    "zone {} is outside a {:?} layout",
                    request.target_zone_number, target_template.layout
                )));
            }

            let target_len = t.zone_len(request.target_template_id, request.target_zone_number);
            let target_index = request.target_zone_index.min(index_u32(target_len));

            // phase 1: open a gap at the target position
            t.open_zone_gap(
                request.target_template_id,
                request.target_zone_number,
                target_index,
            );
            // phase 2: relocate the gadget into it
            if let Some(gadget) = t.gadgets.get_mut(&request.gadget_id) {
                gadget.template_id = request.target_template_id;
                gadget.zone_number = request.target_zone_number;
                gadget.zone_index = target_index;
            }
            // phase 3: close the gap at the original source position
            t.close_zone_gap(
                request.source_template_id,
                request.source_zone_number,
                request.source_zone_index,
            );
            Ok(())
        });

        match moved {
            Ok(()) => {
                tracing::debug!(
                    gadget = %request.gadget_id,
                    source_template = %request.source_template_id,
                    source_zone = request.source_zone_number,
                    source_index = request.source_zone_index,
                    target_template = %request.target_template_id,
                    target_zone = request.target_zone_number,
                    target_index = request.target_zone_index,
                    "moved gadget"
                );
                crate::metrics::record_operation("move_gadget");
                Ok(())
            }
            Err(err) => {
                crate::metrics::record_operation_error("move_gadget");
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

    fn engine_with_store() -> (Arc<LayoutStore>, PlacementEngine) {
        let store = Arc::new(LayoutStore::new());
        let engine = PlacementEngine::new(
            Arc::clone(&store),
            UndoPolicy::default(),
            Arc::new(SystemClock),
            Arc::new(NoopReindex),
        );
        (store, engine)
    }

    fn template_with_zone(
        store: &LayoutStore,
        count: usize,
    ) -> (TabTemplateId, Vec<Gadget>) {
        let group = store.create_tab_group(false);
        let tab = store
            .create_tab(group.id, "Home", LayoutKind::ThreeColumn)
            .unwrap();
        let gadgets = (0..count)
            .map(|i| {
                store
                    .create_gadget(
                        tab.template_id,
                        format!("http://www.example.com/gadget{i}.xml"),
                        0,
                    )
                    .unwrap()
            })
            .collect();
        (tab.template_id, gadgets)
    }

    fn zone_order(store: &LayoutStore, gadgets: &[Gadget]) -> Vec<u32> {
        gadgets
            .iter()
            .map(|g| store.gadget(g.id).unwrap().zone_index)
            .collect()
    }

    #[test]
    fn delete_compacts_the_zone() {
        let (store, engine) = engine_with_store();
        let (_, gadgets) = template_with_zone(&store, 3);

        engine.delete_gadget(gadgets[1].id).unwrap();

        let g1 = store.gadget(gadgets[0].id).unwrap();
        let g2 = store.gadget(gadgets[1].id).unwrap();
        let g3 = store.gadget(gadgets[2].id).unwrap();
        assert_eq!(g1.zone_index, 0);
        assert!(g2.deleted);
        assert_eq!(g2.zone_index, 1, "tombstone keeps its pre-deletion index");
        assert!(g2.date_deleted.is_some());
        assert_eq!(g3.zone_index, 1);
        store.verify_invariants();
    }

    #[test]
    fn undelete_restores_the_original_position() {
        let (store, engine) = engine_with_store();
        let (_, gadgets) = template_with_zone(&store, 3);

        engine.delete_gadget(gadgets[1].id).unwrap();
        let restored = engine.undelete_gadget(gadgets[1].id).unwrap();

        assert!(!restored.deleted);
        assert!(restored.date_deleted.is_none());
        assert_eq!(restored.zone_index, 1);
        assert_eq!(zone_order(&store, &gadgets), vec![0, 1, 2]);
        store.verify_invariants();
    }

    #[test]
    fn undelete_of_only_gadget_in_zone() {
        let (store, engine) = engine_with_store();
        let (_, gadgets) = template_with_zone(&store, 1);

        engine.delete_gadget(gadgets[0].id).unwrap();
        let restored = engine.undelete_gadget(gadgets[0].id).unwrap();
        assert_eq!(restored.zone_index, 0);
    }

    #[test]
    fn undelete_clamps_when_zone_shrank() {
        let (store, engine) = engine_with_store();
        let (_, gadgets) = template_with_zone(&store, 3);

        // tombstone the last gadget (index 2), then shrink the zone below it
        engine.delete_gadget(gadgets[2].id).unwrap();
        engine.delete_gadget(gadgets[0].id).unwrap();
        engine.delete_gadget(gadgets[1].id).unwrap();

        let restored = engine.undelete_gadget(gadgets[2].id).unwrap();
        assert_eq!(restored.zone_index, 0, "reinserts at the end of the empty zone");
        store.verify_invariants();
    }

    #[test]
    fn delete_twice_fails() {
        let (store, engine) = engine_with_store();
        let (_, gadgets) = template_with_zone(&store, 2);

        engine.delete_gadget(gadgets[0].id).unwrap();
        let err = engine.delete_gadget(gadgets[0].id).unwrap_err();
        assert!(matches!(err, LayoutError::GadgetDeletion { id, .. } if id == gadgets[0].id));
    }

    #[test]
    fn undelete_of_active_gadget_fails() {
        let (store, engine) = engine_with_store();
        let (_, gadgets) = template_with_zone(&store, 2);

        let err = engine.undelete_gadget(gadgets[0].id).unwrap_err();
        assert!(matches!(err, LayoutError::GadgetUndeletion { id, .. } if id == gadgets[0].id));
    }

    #[test]
    fn unknown_gadget_fails_with_deletion_error() {
        let (_, engine) = engine_with_store();
        let err = engine.delete_gadget(GadgetId::generate()).unwrap_err();
        assert!(matches!(err, LayoutError::GadgetDeletion { .. }));
    }

    #[test]
    fn move_within_zone_preserves_relative_order() {
        let (store, engine) = engine_with_store();
        let (template_id, gadgets) = template_with_zone(&store, 3);

        // move the last gadget to the front
        engine
            .move_gadget(&MoveGadget {
                gadget_id: gadgets[2].id,
                source_template_id: template_id,
                source_zone_number: 0,
                source_zone_index: 2,
                target_template_id: template_id,
                target_zone_number: 0,
                target_zone_index: 0,
            })
            .unwrap();

        assert_eq!(zone_order(&store, &gadgets), vec![1, 2, 0]);
        store.verify_invariants();
    }

    #[test]
    fn move_across_templates_updates_both_zones() {
        let (store, engine) = engine_with_store();
        let (source_template, source_gadgets) = template_with_zone(&store, 3);
        let (target_template, target_gadgets) = template_with_zone(&store, 2);

        engine
            .move_gadget(&MoveGadget {
                gadget_id: source_gadgets[1].id,
                source_template_id: source_template,
                source_zone_number: 0,
                source_zone_index: 1,
                target_template_id: target_template,
                target_zone_number: 0,
                target_zone_index: 0,
            })
            .unwrap();

        let moved = store.gadget(source_gadgets[1].id).unwrap();
        assert_eq!(moved.template_id, target_template);
        assert_eq!(moved.zone_index, 0);
        assert!(!moved.deleted, "move never touches lifecycle fields");

        // source zone compacted, target zone shifted
        assert_eq!(store.gadget(source_gadgets[0].id).unwrap().zone_index, 0);
        assert_eq!(store.gadget(source_gadgets[2].id).unwrap().zone_index, 1);
        assert_eq!(store.gadget(target_gadgets[0].id).unwrap().zone_index, 1);
        assert_eq!(store.gadget(target_gadgets[1].id).unwrap().zone_index, 2);
        store.verify_invariants();
    }

    #[test]
    fn move_conserves_zone_counts() {
        let (store, engine) = engine_with_store();
        let (source_template, source_gadgets) = template_with_zone(&store, 3);
        let (target_template, _) = template_with_zone(&store, 2);

        engine
            .move_gadget(&MoveGadget {
                gadget_id: source_gadgets[0].id,
                source_template_id: source_template,
                source_zone_number: 0,
                source_zone_index: 0,
                target_template_id: target_template,
                target_zone_number: 1,
                target_zone_index: 0,
            })
            .unwrap();

        assert_eq!(store.zone_len(source_template, 0), 2);
        assert_eq!(store.zone_len(target_template, 1), 1);
    }

    #[test]
    fn move_past_end_appends() {
        let (store, engine) = engine_with_store();
        let (template_id, gadgets) = template_with_zone(&store, 3);

        engine
            .move_gadget(&MoveGadget {
                gadget_id: gadgets[0].id,
                source_template_id: template_id,
                source_zone_number: 0,
                source_zone_index: 0,
                target_template_id: template_id,
                target_zone_number: 0,
                target_zone_index: 99,
            })
            .unwrap();

        assert_eq!(zone_order(&store, &gadgets), vec![2, 0, 1]);
        store.verify_invariants();
    }

    #[test]
    fn move_with_stale_source_coordinates_fails() {
        let (store, engine) = engine_with_store();
        let (template_id, gadgets) = template_with_zone(&store, 2);

        let err = engine
            .move_gadget(&MoveGadget {
                gadget_id: gadgets[0].id,
                source_template_id: template_id,
                source_zone_number: 0,
                source_zone_index: 1, // actually at 0
                target_template_id: template_id,
                target_zone_number: 1,
                target_zone_index: 0,
            })
            .unwrap_err();
        assert!(matches!(err, LayoutError::InvalidInput(_)));
        assert_eq!(zone_order(&store, &gadgets), vec![0, 1], "no partial shift applied");
    }

    #[test]
    fn move_to_zone_outside_layout_fails() {
        let (store, engine) = engine_with_store();
        let (template_id, gadgets) = template_with_zone(&store, 1);

        let err = engine
            .move_gadget(&MoveGadget {
                gadget_id: gadgets[0].id,
                source_template_id: template_id,
                source_zone_number: 0,
                source_zone_index: 0,
                target_template_id: template_id,
                target_zone_number: 7,
                target_zone_index: 0,
            })
            .unwrap_err();
        assert!(matches!(err, LayoutError::InvalidInput(_)));
    }
}
