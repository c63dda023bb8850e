use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CharacterId = String;
pub type ShipId = String;
pub type CorpId = String;
pub type SectorId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CharacterKind {
    Human,
    Npc,
    CorporationShip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub character_id: CharacterId,
    pub name: String,
    pub kind: CharacterKind,
    pub sector_id: SectorId,
    pub in_hyperspace: bool,
    pub last_active: DateTime<Utc>,
    pub corporation_id: Option<CorpId>,
    pub ship_id: ShipId,
    pub credits_on_hand: i64,
    pub credits_in_bank: i64,
}

impl Character {
    pub fn new(character_id: impl Into<String>, name: impl Into<String>, sector_id: SectorId, ship_id: impl Into<String>) -> Self {
        Self {
            character_id: character_id.into(),
            name: name.into(),
            kind: CharacterKind::Human,
            sector_id,
            in_hyperspace: false,
            last_active: Utc::now(),
            corporation_id: None,
            ship_id: ship_id.into(),
            credits_on_hand: 0,
            credits_in_bank: 0,
        }
    }

    /// Total credits held, used by property tests (P3) to check conservation.
    pub fn total_credits(&self) -> i64 {
        self.credits_on_hand + self.credits_in_bank
    }
}
