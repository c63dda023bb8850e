use std::collections::BTreeMap;

use crate::models::character::SectorId;
use crate::models::ship::{ShipType, ShipTypeStats};

/// External collaborator the core consults for data it does not itself
/// generate: ship stat tables and sector adjacency (spec.md §1 Non-goals —
/// "universe generation" and "ship balance tuning" are explicitly out of
/// scope, but the core still needs *some* source for them). Kept as a
/// trait so a production deployment can back it with a generated universe
/// while tests use a small fixed one.
pub trait ReferenceData: Send + Sync {
    fn ship_stats(&self, ship_type: ShipType) -> ShipTypeStats;
    fn adjacent_sectors(&self, sector_id: SectorId) -> Vec<SectorId>;
    fn is_adjacent(&self, from: SectorId, to: SectorId) -> bool {
        self.adjacent_sectors(from).contains(&to)
    }
}

/// Fixed in-memory reference table, suitable for tests and small
/// deployments; `World::new` accepts any `Arc<dyn ReferenceData>` so a
/// generated universe can be swapped in without touching the core.
pub struct StaticReferenceData {
    stats: BTreeMap<ShipType, ShipTypeStats>,
    adjacency: BTreeMap<SectorId, Vec<SectorId>>,
}

impl StaticReferenceData {
    pub fn new(adjacency: BTreeMap<SectorId, Vec<SectorId>>) -> Self {
        let stats = default_ship_stats();
        Self { stats, adjacency }
    }

    pub fn with_stats(mut self, ship_type: ShipType, stats: ShipTypeStats) -> Self {
        self.stats.insert(ship_type, stats);
        self
    }
}

fn default_ship_stats() -> BTreeMap<ShipType, ShipTypeStats> {
    let mut map = BTreeMap::new();
    map.insert(
        ShipType::Scout,
        ShipTypeStats {
            ship_type: ShipType::Scout,
            max_fighters: 50,
            max_shields: 50,
            cargo_capacity: 10,
            warp_power_capacity: 20,
            turns_per_warp: 1,
            price: 5_000,
            trade_in_value: 2_500,
        },
    );
    map.insert(
        ShipType::Freighter,
        ShipTypeStats {
            ship_type: ShipType::Freighter,
            max_fighters: 75,
            max_shields: 100,
            cargo_capacity: 75,
            warp_power_capacity: 40,
            turns_per_warp: 2,
            price: 20_000,
            trade_in_value: 10_000,
        },
    );
    map.insert(
        ShipType::Frigate,
        ShipTypeStats {
            ship_type: ShipType::Frigate,
            max_fighters: 200,
            max_shields: 150,
            cargo_capacity: 30,
            warp_power_capacity: 60,
            turns_per_warp: 2,
            price: 45_000,
            trade_in_value: 22_500,
        },
    );
    map.insert(
        ShipType::Cruiser,
        ShipTypeStats {
            ship_type: ShipType::Cruiser,
            max_fighters: 500,
            max_shields: 400,
            cargo_capacity: 50,
            warp_power_capacity: 100,
            turns_per_warp: 3,
            price: 120_000,
            trade_in_value: 60_000,
        },
    );
    map.insert(
        ShipType::EscapePod,
        ShipTypeStats {
            ship_type: ShipType::EscapePod,
            max_fighters: 0,
            max_shields: 0,
            cargo_capacity: 0,
            warp_power_capacity: 5,
            turns_per_warp: 1,
            price: 0,
            trade_in_value: 0,
        },
    );
    map
}

/// Builds a simple bidirectional ring of `count` sectors (each adjacent to
/// its immediate neighbors, wrapping around). Universe generation is out of
/// scope (spec.md §1 Non-goals), but a runnable deployment still needs some
/// topology to hand `StaticReferenceData`; this is the smallest one that
/// exercises movement and adjacency checks meaningfully.
pub fn ring_adjacency(count: i64) -> BTreeMap<SectorId, Vec<SectorId>> {
    let mut adjacency = BTreeMap::new();
    if count <= 1 {
        return adjacency;
    }
    for sector_id in 0..count {
        let prev = if sector_id == 0 { count - 1 } else { sector_id - 1 };
        let next = (sector_id + 1) % count;
        adjacency.insert(sector_id, vec![prev, next]);
    }
    adjacency
}

impl ReferenceData for StaticReferenceData {
    fn ship_stats(&self, ship_type: ShipType) -> ShipTypeStats {
        self.stats.get(&ship_type).copied().unwrap_or(ShipTypeStats {
            ship_type,
            max_fighters: 0,
            max_shields: 0,
            cargo_capacity: 0,
            warp_power_capacity: 0,
            turns_per_warp: 1,
            price: 0,
            trade_in_value: 0,
        })
    }

    fn adjacent_sectors(&self, sector_id: SectorId) -> Vec<SectorId> {
        self.adjacency.get(&sector_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;

    #[test]
    fn adjacency_is_symmetric_when_constructed_so() {
        let data = StaticReferenceData::new(btreemap! {
            1 => vec![2],
            2 => vec![1, 3],
            3 => vec![2],
        });
        assert!(data.is_adjacent(1, 2));
        assert!(data.is_adjacent(2, 1));
        assert!(!data.is_adjacent(1, 3));
    }
}
