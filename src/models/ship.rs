use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::character::{CharacterId, CorpId, ShipId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ShipType {
    Scout,
    Freighter,
    Frigate,
    Cruiser,
    EscapePod,
}

/// Read-only reference row for a ship type, consumed from `ReferenceData`.
/// Universe/ship-stat generation is out of scope; this struct is the
/// external-collaborator contract the core requires (spec.md §1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipTypeStats {
    pub ship_type: ShipType,
    pub max_fighters: i64,
    pub max_shields: i64,
    pub cargo_capacity: i64,
    pub warp_power_capacity: i64,
    pub turns_per_warp: i64,
    pub price: i64,
    pub trade_in_value: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShipOwnerKind {
    Character,
    Corporation,
    Unowned,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShipState {
    pub fighters: i64,
    pub shields: i64,
    pub warp_power: i64,
    pub cargo: BTreeMap<String, i64>,
    pub credits: i64,
}

impl ShipState {
    pub fn cargo_used(&self) -> i64 {
        self.cargo.values().sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ship {
    pub ship_id: ShipId,
    pub ship_type: ShipType,
    pub name: String,
    pub owner_kind: ShipOwnerKind,
    pub owner_id: Option<String>,
    pub state: ShipState,
}

impl Ship {
    /// Invariant from spec.md §3: 0 <= fighters/shields/warp_power <= max,
    /// and sum(cargo) <= cargo_capacity.
    pub fn check_invariants(&self, stats: &ShipTypeStats) -> bool {
        self.state.fighters >= 0
            && self.state.fighters <= stats.max_fighters
            && self.state.shields >= 0
            && self.state.shields <= stats.max_shields
            && self.state.warp_power >= 0
            && self.state.warp_power <= stats.warp_power_capacity
            && self.state.cargo_used() <= stats.cargo_capacity
    }

    pub fn owned_by_character(&self, character_id: &CharacterId) -> bool {
        matches!(self.owner_kind, ShipOwnerKind::Character) && self.owner_id.as_deref() == Some(character_id.as_str())
    }

    pub fn owned_by_corp(&self, corp_id: &CorpId) -> bool {
        matches!(self.owner_kind, ShipOwnerKind::Corporation) && self.owner_id.as_deref() == Some(corp_id.as_str())
    }
}
