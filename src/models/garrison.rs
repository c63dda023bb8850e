use serde::{Deserialize, Serialize};

use super::character::{CharacterId, SectorId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GarrisonMode {
    Offensive,
    Defensive,
    Toll,
}

/// At most one per (sector, owner) pair; spec.md §3 "Sector rule" enforces
/// that a sector holds either zero garrisons or exactly one owner's.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Garrison {
    pub sector_id: SectorId,
    pub owner_id: CharacterId,
    pub fighters: i64,
    pub mode: GarrisonMode,
    pub toll_amount: i64,
    pub toll_balance: i64,
}

impl Garrison {
    pub fn new(sector_id: SectorId, owner_id: CharacterId, fighters: i64, mode: GarrisonMode, toll_amount: i64) -> Self {
        Self {
            sector_id,
            owner_id,
            fighters,
            mode,
            toll_amount,
            toll_balance: 0,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.fighters <= 0
    }
}
