use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::character::SectorId;

/// Topology is read-only reference data (spec.md §1): sector adjacency is
/// supplied externally, not generated by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sector {
    pub sector_id: SectorId,
    pub adjacent: BTreeSet<SectorId>,
    pub planets: Vec<Planet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Planet {
    pub planet_id: String,
    pub class_code: String,
}

/// Three-character buy/sell classifier, e.g. "SSS", "BBS".
pub type PortCode = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub sector_id: SectorId,
    pub code: PortCode,
    pub stock: BTreeMap<String, i64>,
    pub max_capacity: BTreeMap<String, i64>,
}

impl Port {
    pub fn check_invariants(&self) -> bool {
        self.stock.iter().all(|(commodity, units)| {
            let cap = self.max_capacity.get(commodity).copied().unwrap_or(0);
            *units >= 0 && *units <= cap
        })
    }

    /// A port's classifier marks each commodity slot buy ('B') or sell ('S').
    /// Buying from the player's perspective requires the port to sell, i.e.
    /// the slot is 'S'; selling to the port requires a 'B' slot.
    pub fn commodity_index(&self, commodity: &str, commodities: &[&str]) -> Option<usize> {
        commodities.iter().position(|c| *c == commodity)
    }
}
