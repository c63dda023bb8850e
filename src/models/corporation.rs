use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::character::{CharacterId, CorpId, ShipId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Corporation {
    pub corp_id: CorpId,
    pub name: String,
    pub invite_code: String,
    pub founded_at: DateTime<Utc>,
    pub members: BTreeSet<CharacterId>,
    pub ships: BTreeSet<ShipId>,
}

impl Corporation {
    pub fn new(corp_id: CorpId, name: impl Into<String>, invite_code: impl Into<String>, founder: CharacterId) -> Self {
        let mut members = BTreeSet::new();
        members.insert(founder);
        Self {
            corp_id,
            name: name.into(),
            invite_code: invite_code.into(),
            founded_at: Utc::now(),
            members,
            ships: BTreeSet::new(),
        }
    }
}
