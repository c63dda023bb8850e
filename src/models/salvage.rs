use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::character::SectorId;

/// Salvage never exposes the defeated character_id — only the ship's name
/// and type, per spec.md §3 ("never exposes the defeated character_id").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalvageSource {
    pub ship_name: String,
    pub ship_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalvageContainer {
    pub salvage_id: String,
    pub sector_id: SectorId,
    pub cargo: BTreeMap<String, i64>,
    pub scrap: i64,
    pub credits: i64,
    pub expires_at: DateTime<Utc>,
    pub source: SalvageSource,
}

impl SalvageContainer {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
