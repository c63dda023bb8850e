use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::character::{CharacterId, CorpId, SectorId};

/// Resolved synchronously by the caller against a consistent snapshot, per
/// spec.md §4.3 ("filter resolution is synchronous ... the bus MUST NOT
/// re-check state later").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventFilter {
    CharacterList { ids: Vec<CharacterId> },
    SectorOccupants { sector_id: SectorId, exclude: Option<CharacterId> },
    CorporationMembers { corp_id: CorpId },
    AdminOnly,
}

impl EventFilter {
    pub fn character_list(ids: impl IntoIterator<Item = CharacterId>) -> Self {
        EventFilter::CharacterList { ids: ids.into_iter().collect() }
    }

    pub fn sector(sector_id: SectorId) -> Self {
        EventFilter::SectorOccupants { sector_id, exclude: None }
    }

    pub fn sector_excluding(sector_id: SectorId, exclude: CharacterId) -> Self {
        EventFilter::SectorOccupants { sector_id, exclude: Some(exclude) }
    }
}

/// The unit of fan-out, stamped with a monotonic `causal_sequence` by
/// `EventBus::emit` (spec.md §3 "Events").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_name: String,
    pub payload: Value,
    pub summary: Option<String>,
    #[serde(skip)]
    pub filter: EventFilterOrResolved,
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
}

/// Events carry either an unresolved filter (before `emit`) or the
/// already-resolved recipient set (after); kept as one type so callers can
/// build an `Event` before sequence assignment without an extra wrapper.
#[derive(Debug, Clone, Default)]
pub enum EventFilterOrResolved {
    #[default]
    None,
    Unresolved(Box<EventFilterHolder>),
    Resolved(Vec<CharacterId>, bool),
}

#[derive(Debug, Clone)]
pub struct EventFilterHolder(pub EventFilter);

impl Event {
    pub fn new(event_name: impl Into<String>, payload: Value, filter: EventFilter) -> Self {
        Self {
            event_name: event_name.into(),
            payload,
            summary: None,
            filter: EventFilterOrResolved::Unresolved(Box::new(EventFilterHolder(filter))),
            sequence: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}
