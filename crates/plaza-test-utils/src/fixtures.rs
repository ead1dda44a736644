//! Pre-wired layout fixtures.

use std::sync::{Arc, Mutex};

use plaza_core::clock::SharedClock;
use plaza_core::id::{GadgetId, TabGroupId, TabId, TabTemplateId};
use plaza_layout::lifecycle::TabLifecycle;
use plaza_layout::placement::PlacementEngine;
use plaza_layout::reader::LayoutReader;
use plaza_layout::reaper::{TombstoneReaper, UndoPolicy};
use plaza_layout::record::LayoutKind;
use plaza_layout::reindex::{SearchEntity, SearchReindex};
use plaza_layout::store::LayoutStore;

use crate::simulation::SimulatedClock;

/// Reindex hook that records every notification for assertions.
#[derive(Debug, Default)]
pub struct RecordingReindex {
    events: Mutex<Vec<SearchEntity>>,
}

impl RecordingReindex {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every notification received so far.
    pub fn events(&self) -> Vec<SearchEntity> {
        self.events.lock().expect("reindex recorder poisoned").clone()
    }
}

impl SearchReindex for RecordingReindex {
    fn reindex(&self, entity: SearchEntity) {
        self.events
            .lock()
            .expect("reindex recorder poisoned")
            .push(entity);
    }
}

/// Ids of a tab seeded by [`LayoutFixture::tab_with_gadgets`].
#[derive(Debug, Clone)]
pub struct SeededTab {
    /// The created tab.
    pub tab_id: TabId,
    /// The tab's template.
    pub template_id: TabTemplateId,
    /// Created gadgets, in creation order.
    pub gadgets: Vec<GadgetId>,
}

/// A store plus every engine, wired over a simulated clock and a
/// recording reindex hook.
pub struct LayoutFixture {
    /// The shared store.
    pub store: Arc<LayoutStore>,
    /// The simulated clock driving all lifecycle timestamps.
    pub clock: Arc<SimulatedClock>,
    /// The recording reindex hook.
    pub reindex: Arc<RecordingReindex>,
    /// Placement engine over the store.
    pub placement: PlacementEngine,
    /// Lifecycle manager over the store.
    pub lifecycle: TabLifecycle,
    /// Lookup facade over the store.
    pub reader: LayoutReader,
    /// Reaper over the store.
    pub reaper: TombstoneReaper,
    /// A pre-created writable tab group.
    pub group_id: TabGroupId,
}

impl LayoutFixture {
    /// Creates a fixture with the default 20-minute undo window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(UndoPolicy::default())
    }

    /// Creates a fixture with a custom undo policy.
    #[must_use]
    pub fn with_policy(policy: UndoPolicy) -> Self {
        let store = Arc::new(LayoutStore::new());
        let clock = Arc::new(SimulatedClock::deterministic());
        let shared_clock: SharedClock = clock.clone();
        let reindex = Arc::new(RecordingReindex::new());
        let placement = PlacementEngine::new(
            Arc::clone(&store),
            policy,
            Arc::clone(&shared_clock),
            reindex.clone(),
        );
        let lifecycle = TabLifecycle::new(
            Arc::clone(&store),
            policy,
            Arc::clone(&shared_clock),
            reindex.clone(),
        );
        let reader = LayoutReader::new(Arc::clone(&store));
        let reaper = TombstoneReaper::new(Arc::clone(&store), policy, shared_clock);
        let group_id = store.create_tab_group(false).id;
        Self {
            store,
            clock,
            reindex,
            placement,
            lifecycle,
            reader,
            reaper,
            group_id,
        }
    }

    /// Creates a tab in the fixture group with one gadget per `zones`
    /// entry, appended in order.
    pub fn tab_with_gadgets(&self, name: &str, layout: LayoutKind, zones: &[u32]) -> SeededTab {
        let tab = self
            .store
            .create_tab(self.group_id, name, layout)
            .expect("fixture tab");
        let gadgets = zones
            .iter()
            .enumerate()
            .map(|(i, zone)| {
                self.store
                    .create_gadget(
                        tab.template_id,
                        format!("http://www.example.com/gadget{i}.xml"),
                        *zone,
                    )
                    .expect("fixture gadget")
                    .id
            })
            .collect();
        SeededTab {
            tab_id: tab.id,
            template_id: tab.template_id,
            gadgets,
        }
    }
}

impl Default for LayoutFixture {
    fn default() -> Self {
        Self::new()
    }
}
