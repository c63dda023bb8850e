use std::collections::BTreeSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;

use crate::models::character::{CharacterId, SectorId, ShipId};
use crate::models::garrison::Garrison;

/// Cheap-to-read snapshot of "who/what is in this sector right now",
/// consulted on every movement and event-filter resolution. Held behind an
/// `ArcSwap` per sector so readers never block on a writer and writers
/// publish a whole new snapshot atomically rather than mutating shared
/// state in place (spec.md §4.5 "SectorIndex"; not present in the teacher,
/// adopted from the broader corpus's copy-on-write convention for
/// hot-path-read/rare-write registries).
#[derive(Debug, Clone, Default)]
pub struct SectorRecord {
    pub characters: BTreeSet<CharacterId>,
    pub ships: BTreeSet<ShipId>,
    /// A sector holds at most one garrison at a time; see
    /// `check_invariants` in [`crate::models::garrison::Garrison`].
    pub garrison: Option<Garrison>,
    /// Set while a sector-combat encounter is in progress; garrisons
    /// involved in active combat are consulted only via the encounter's own
    /// participant list, not via this field (spec.md §4.5 note).
    pub combat_active: bool,
}

pub struct SectorIndex {
    sectors: DashMap<SectorId, Arc<ArcSwap<SectorRecord>>>,
}

impl Default for SectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SectorIndex {
    pub fn new() -> Self {
        Self { sectors: DashMap::new() }
    }

    fn slot(&self, sector_id: SectorId) -> Arc<ArcSwap<SectorRecord>> {
        self.sectors
            .entry(sector_id)
            .or_insert_with(|| Arc::new(ArcSwap::from_pointee(SectorRecord::default())))
            .clone()
    }

    pub fn snapshot(&self, sector_id: SectorId) -> Arc<SectorRecord> {
        self.slot(sector_id).load_full()
    }

    /// Publishes a new snapshot built from the current one via `f`. Callers
    /// must hold the relevant `port:<sector_id>`/`combat:<sector_id>` lock
    /// for read-modify-write sequences that must not race with a concurrent
    /// mutation of the same sector.
    pub fn update<F>(&self, sector_id: SectorId, f: F)
    where
        F: FnOnce(&SectorRecord) -> SectorRecord,
    {
        let slot = self.slot(sector_id);
        let current = slot.load_full();
        let next = f(&current);
        slot.store(Arc::new(next));
    }

    pub fn move_character(&self, character_id: &str, from: SectorId, to: SectorId) {
        self.update(from, |rec| {
            let mut next = rec.clone();
            next.characters.remove(character_id);
            next
        });
        self.update(to, |rec| {
            let mut next = rec.clone();
            next.characters.insert(character_id.to_string());
            next
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_character_updates_both_sectors() {
        let index = SectorIndex::new();
        index.update(1, |rec| {
            let mut next = rec.clone();
            next.characters.insert("char-1".to_string());
            next
        });

        index.move_character("char-1", 1, 2);

        assert!(!index.snapshot(1).characters.contains("char-1"));
        assert!(index.snapshot(2).characters.contains("char-1"));
    }

    #[test]
    fn snapshot_is_immutable_after_publish() {
        let index = SectorIndex::new();
        let before = index.snapshot(5);
        index.update(5, |rec| {
            let mut next = rec.clone();
            next.combat_active = true;
            next
        });
        assert!(!before.combat_active);
        assert!(index.snapshot(5).combat_active);
    }
}
