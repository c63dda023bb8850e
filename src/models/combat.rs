use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::character::{CharacterId, SectorId};
use super::garrison::GarrisonMode;
use super::salvage::SalvageContainer;

pub type CombatId = String;
pub type CombatantId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CombatantKind {
    Character,
    Garrison,
    EscapePod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combatant {
    pub combatant_id: CombatantId,
    pub kind: CombatantKind,
    pub name: String,
    pub fighters: i64,
    pub shields: i64,
    pub max_fighters: i64,
    pub max_shields: i64,
    pub owner_character_id: Option<CharacterId>,
    /// Set once a `flee` action downgraded to brace, or succeeds and the
    /// combatant leaves; used by damage computation (reduced efficacy vs
    /// fleeing targets, spec.md §4.7 step 3).
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub fleeing: bool,
    /// `None` for non-garrison combatants; drives the garrison AI branch of
    /// `RoundResolver::normalize_actions` (spec.md §4.7 step 1).
    #[serde(default)]
    pub garrison_mode: Option<GarrisonMode>,
}

impl Combatant {
    pub fn is_defeated(&self) -> bool {
        self.fighters <= 0 && self.shields <= 0
    }

    pub fn check_invariants(&self) -> bool {
        self.fighters >= 0
            && self.fighters <= self.max_fighters
            && self.shields >= 0
            && self.shields <= self.max_shields
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Attack,
    Brace,
    Flee,
    Pay,
    Timeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub kind: ActionKind,
    #[serde(default)]
    pub commit: i64,
    pub target_id: Option<CombatantId>,
    pub destination_sector: Option<SectorId>,
}

impl Action {
    pub fn brace() -> Self {
        Self {
            kind: ActionKind::Brace,
            commit: 0,
            target_id: None,
            destination_sector: None,
        }
    }

    pub fn attack(target_id: CombatantId, commit: i64) -> Self {
        Self {
            kind: ActionKind::Attack,
            commit,
            target_id: Some(target_id),
            destination_sector: None,
        }
    }
}

/// Context captured at encounter creation/merge time: initiator, why it
/// started, and the garrisons captured into it (so they can be returned to
/// `SectorIndex` on end — spec.md §9's garrison lifecycle design note).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EncounterContext {
    pub initiator_id: Option<CharacterId>,
    pub reason: String,
    pub garrison_sources: Vec<CombatantId>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EncounterResult {
    TollSatisfied,
    AdminTerminated,
    SideDefeated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    pub combat_id: CombatId,
    pub sector_id: SectorId,
    pub round: u32,
    pub participants: BTreeMap<CombatantId, Combatant>,
    pub deadline: DateTime<Utc>,
    pub context: EncounterContext,
    #[serde(default)]
    pub pending_actions: BTreeMap<CombatantId, Action>,
    pub result: Option<EncounterResult>,
    #[serde(default)]
    pub salvage: Vec<SalvageContainer>,
}

impl Encounter {
    pub fn is_ended(&self) -> bool {
        self.result.is_some()
    }

    pub fn live_participants(&self) -> impl Iterator<Item = (&CombatantId, &Combatant)> {
        self.participants.iter().filter(|(_, c)| c.fighters > 0)
    }

    /// End-state detection per spec.md §4.7 step 6(a): all remaining live
    /// combatants share an owner, or there's at most one live side.
    pub fn all_live_share_owner(&self) -> bool {
        let owners: std::collections::BTreeSet<Option<&CharacterId>> = self
            .live_participants()
            .map(|(_, c)| c.owner_character_id.as_ref())
            .collect();
        owners.len() <= 1
    }
}
