use std::collections::{BTreeMap, BTreeSet};

use dashmap::DashMap;

use crate::lock_manager::LockManager;
use crate::models::character::{CharacterId, SectorId};

/// What a character has personally observed: sectors visited and the last
/// known port code per sector (spec.md §3 "per-character map knowledge").
/// Unlike `SectorIndex`, which is ground truth, a `KnowledgeStore` entry can
/// be stale the moment it's read — that's expected, it's what `my_map`
/// reports back to the player.
#[derive(Debug, Clone, Default)]
pub struct CharacterKnowledge {
    pub visited_sectors: BTreeSet<SectorId>,
    pub known_port_codes: BTreeMap<SectorId, String>,
}

pub struct KnowledgeStore {
    entries: DashMap<CharacterId, CharacterKnowledge>,
}

impl Default for KnowledgeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    pub fn snapshot(&self, character_id: &str) -> CharacterKnowledge {
        self.entries.get(character_id).map(|r| r.clone()).unwrap_or_default()
    }

    /// Records a sector visit and, if known, the port code observed there.
    /// Callers should hold `knowledge:<character_id>` while calling this
    /// alongside other mutations in the same command (spec.md §4.2).
    pub fn record_visit(&self, character_id: &str, sector_id: SectorId, port_code: Option<String>) {
        let mut entry = self.entries.entry(character_id.to_string()).or_default();
        entry.visited_sectors.insert(sector_id);
        if let Some(code) = port_code {
            entry.known_port_codes.insert(sector_id, code);
        }
    }

    pub fn lock_key(character_id: &str) -> String {
        LockManager::knowledge_key(character_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_visit_accumulates_across_calls() {
        let store = KnowledgeStore::new();
        store.record_visit("char-1", 1, Some("SSS".to_string()));
        store.record_visit("char-1", 2, None);

        let knowledge = store.snapshot("char-1");
        assert_eq!(knowledge.visited_sectors, BTreeSet::from([1, 2]));
        assert_eq!(knowledge.known_port_codes.get(&1), Some(&"SSS".to_string()));
        assert!(!knowledge.known_port_codes.contains_key(&2));
    }
}
