use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorEnvelope;

/// Canonical event names (spec.md §6 "Canonical event set"). Kept as
/// `&'static str` constants rather than an enum since dispatcher code
/// mostly needs to pass them straight into `Event::new` alongside a
/// `serde_json::Value` payload whose shape varies per name.
pub mod event_names {
    pub const STATUS_SNAPSHOT: &str = "status.snapshot";
    pub const STATUS_UPDATE: &str = "status.update";
    pub const MAP_KNOWLEDGE: &str = "map.knowledge";
    pub const MAP_LOCAL: &str = "map.local";
    pub const MAP_REGION: &str = "map.region";
    pub const COURSE_PLOT: &str = "course.plot";
    pub const MOVEMENT_START: &str = "movement.start";
    pub const MOVEMENT_COMPLETE: &str = "movement.complete";
    pub const SECTOR_UPDATE: &str = "sector.update";
    pub const CHARACTER_MOVED: &str = "character.moved";
    pub const TRADE_EXECUTED: &str = "trade.executed";
    pub const PORT_UPDATE: &str = "port.update";
    pub const WARP_PURCHASE: &str = "warp.purchase";
    pub const WARP_TRANSFER: &str = "warp.transfer";
    pub const CREDITS_TRANSFER: &str = "credits.transfer";
    pub const BANK_TRANSACTION: &str = "bank.transaction";
    pub const FIGHTER_PURCHASE: &str = "fighter.purchase";
    pub const GARRISON_DEPLOYED: &str = "garrison.deployed";
    pub const GARRISON_COLLECTED: &str = "garrison.collected";
    pub const GARRISON_MODE_CHANGED: &str = "garrison.mode_changed";
    pub const GARRISON_COMBAT_ALERT: &str = "garrison.combat_alert";
    pub const SALVAGE_CREATED: &str = "salvage.created";
    pub const SALVAGE_COLLECTED: &str = "salvage.collected";
    pub const COMBAT_ROUND_WAITING: &str = "combat.round_waiting";
    pub const COMBAT_ROUND_RESOLVED: &str = "combat.round_resolved";
    pub const COMBAT_ENDED: &str = "combat.ended";
    pub const COMBAT_REFRESH: &str = "combat.refresh";
    pub const CORPORATION_CREATED: &str = "corporation.created";
    pub const CORPORATION_MEMBER_JOINED: &str = "corporation.member_joined";
    pub const CORPORATION_MEMBER_LEFT: &str = "corporation.member_left";
    pub const CORPORATION_MEMBER_KICKED: &str = "corporation.member_kicked";
    pub const CORPORATION_DISBANDED: &str = "corporation.disbanded";
    pub const CORPORATION_SHIP_PURCHASED: &str = "corporation.ship_purchased";
    pub const CORPORATION_SHIPS_ABANDONED: &str = "corporation.ships_abandoned";
    pub const CORPORATION_INVITE_CODE_REGENERATED: &str = "corporation.invite_code_regenerated";
    pub const SHIP_TRADED_IN: &str = "ship.traded_in";
    pub const CHAT_MESSAGE: &str = "chat.message";
    pub const ERROR: &str = "error";
}

/// Envelope for `POST /api/command` (spec.md §6 request/response shapes).
/// `command` names one of the `Command` enum variants
/// ([`crate::dispatcher::Command`]); `payload` carries its fields as a raw
/// JSON object, decoded by the specific command's own `Deserialize` impl.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub actor_character_id: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub payload: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CommandResponse {
    Success { success: bool, data: Value },
    Failure(ErrorEnvelope),
}

impl CommandResponse {
    pub fn ok(data: Value) -> Self {
        CommandResponse::Success { success: true, data }
    }

    pub fn err(envelope: ErrorEnvelope) -> Self {
        CommandResponse::Failure(envelope)
    }
}
