//! Property tests for the positional invariants.
//!
//! The store re-checks contiguity after every transaction and panics on a
//! violation, so any operation sequence that corrupts a zone fails these
//! tests by itself; the explicit assertions cover conservation and
//! round-trip positioning on top of that.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use proptest::prelude::*;

use plaza_core::id::{GadgetId, TabTemplateId};
use plaza_layout::placement::MoveGadget;
use plaza_layout::prelude::*;
use plaza_test_utils::LayoutFixture;

/// One step of a random operation sequence.
#[derive(Debug, Clone)]
enum Op {
    Delete(usize),
    Undelete(usize),
    Move {
        who: usize,
        to_zone: u32,
        to_index: u32,
    },
}

fn op_strategy(gadget_count: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..gadget_count).prop_map(Op::Delete),
        (0..gadget_count).prop_map(Op::Undelete),
        ((0..gadget_count), 0u32..3, 0u32..8).prop_map(|(who, to_zone, to_index)| Op::Move {
            who,
            to_zone,
            to_index,
        }),
    ]
}

fn apply(fixture: &LayoutFixture, template_id: TabTemplateId, gadgets: &[GadgetId], op: &Op) {
    match op {
        Op::Delete(who) => {
            // deleting a tombstone is a legal caller mistake; it must fail
            // cleanly without disturbing the zone
            let _ = fixture.placement.delete_gadget(gadgets[*who]);
        }
        Op::Undelete(who) => {
            let _ = fixture.placement.undelete_gadget(gadgets[*who]);
        }
        Op::Move {
            who,
            to_zone,
            to_index,
        } => {
            let Some(current) = fixture.store.gadget(gadgets[*who]) else {
                return;
            };
            if current.deleted {
                return;
            }
            let _ = fixture.placement.move_gadget(&MoveGadget {
                gadget_id: current.id,
                source_template_id: current.template_id,
                source_zone_number: current.zone_number,
                source_zone_index: current.zone_index,
                target_template_id: template_id,
                target_zone_number: *to_zone,
                target_zone_index: *to_index,
            });
        }
    }
}

proptest! {
    /// After any operation sequence, every zone's active gadgets carry
    /// exactly the indices `0..M`, and no gadget has been lost or
    /// duplicated (the undo window never elapses here, so tombstones
    /// survive).
    #[test]
    fn contiguity_holds_across_random_operations(
        ops in prop::collection::vec(op_strategy(6), 1..40)
    ) {
        let fixture = LayoutFixture::new();
        let seeded = fixture.tab_with_gadgets(
            "Home",
            LayoutKind::ThreeColumn,
            &[0, 0, 1, 1, 2, 2],
        );

        for op in &ops {
            apply(&fixture, seeded.template_id, &seeded.gadgets, op);
            fixture.store.verify_invariants();
        }

        let survivors = seeded
            .gadgets
            .iter()
            .filter(|id| fixture.store.gadget(**id).is_some())
            .count();
        prop_assert_eq!(survivors, seeded.gadgets.len());
    }

    /// Delete-then-undelete of an active gadget restores its exact
    /// `(template, zone, index)` coordinates.
    #[test]
    fn round_trip_restores_coordinates(
        warmup in prop::collection::vec(op_strategy(6), 0..20),
        who in 0usize..6,
    ) {
        let fixture = LayoutFixture::new();
        let seeded = fixture.tab_with_gadgets(
            "Home",
            LayoutKind::ThreeColumn,
            &[0, 0, 1, 1, 2, 2],
        );

        for op in &warmup {
            apply(&fixture, seeded.template_id, &seeded.gadgets, op);
        }

        let gadget = fixture.store.gadget(seeded.gadgets[who]).unwrap();
        prop_assume!(!gadget.deleted);

        fixture.placement.delete_gadget(gadget.id).unwrap();
        let restored = fixture.placement.undelete_gadget(gadget.id).unwrap();

        prop_assert_eq!(restored.template_id, gadget.template_id);
        prop_assert_eq!(restored.zone_number, gadget.zone_number);
        prop_assert_eq!(restored.zone_index, gadget.zone_index);
        fixture.store.verify_invariants();
    }

    /// A move conserves counts: the source zone shrinks by one and the
    /// target zone grows by one, with relative order preserved elsewhere.
    #[test]
    fn move_conserves_zone_counts(
        to_zone in 0u32..3,
        to_index in 0u32..8,
    ) {
        let fixture = LayoutFixture::new();
        let seeded = fixture.tab_with_gadgets(
            "Home",
            LayoutKind::ThreeColumn,
            &[0, 0, 0, 1, 2],
        );

        let moving = fixture.store.gadget(seeded.gadgets[1]).unwrap();
        let source_before = fixture.store.zone_len(seeded.template_id, moving.zone_number);
        let target_before = fixture.store.zone_len(seeded.template_id, to_zone);

        fixture.placement.move_gadget(&MoveGadget {
            gadget_id: moving.id,
            source_template_id: moving.template_id,
            source_zone_number: moving.zone_number,
            source_zone_index: moving.zone_index,
            target_template_id: seeded.template_id,
            target_zone_number: to_zone,
            target_zone_index: to_index,
        }).unwrap();

        let source_after = fixture.store.zone_len(seeded.template_id, moving.zone_number);
        let target_after = fixture.store.zone_len(seeded.template_id, to_zone);

        if to_zone == moving.zone_number {
            prop_assert_eq!(source_after, source_before);
        } else {
            prop_assert_eq!(source_after, source_before - 1);
            prop_assert_eq!(target_after, target_before + 1);
        }
        fixture.store.verify_invariants();
    }
}
