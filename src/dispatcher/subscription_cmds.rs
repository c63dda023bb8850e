use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::CoreResult;
use crate::subscription_hub::SubscriberHandle;
use crate::world::World;

#[derive(Debug, Deserialize)]
pub struct PauseEventDeliveryParams {
    pub character_id: String,
}

pub fn pause_event_delivery(world: &World, params: PauseEventDeliveryParams) -> CoreResult<Value> {
    world.hub.pause(&params.character_id);
    Ok(json!({ "characterId": params.character_id, "paused": true }))
}

#[derive(Debug, Deserialize)]
pub struct ResumeEventDeliveryParams {
    pub character_id: String,
}

/// Resuming flushes everything buffered while paused (spec.md §4.4
/// dedup guarantee — the hub itself skips anything already delivered).
pub fn resume_event_delivery(world: &World, params: ResumeEventDeliveryParams) -> CoreResult<Value> {
    world.hub.resume(&params.character_id);
    Ok(json!({ "characterId": params.character_id, "paused": false }))
}

#[derive(Debug, Deserialize)]
pub struct SubscribeMyMessagesParams {
    pub character_id: String,
    #[serde(default)]
    pub admin_password: Option<String>,
}

/// Binds a transport connection (the Socket.IO side, not this function) to
/// one character's event stream. The returned `SubscriberHandle`'s `rx` is
/// forwarded to the socket by the caller in `web_api_server`; this function
/// only owns the hub registration and the admin-eligibility check.
pub fn subscribe_my_messages(world: &World, params: SubscribeMyMessagesParams) -> CoreResult<SubscriberHandle> {
    let is_admin = params.admin_password.as_deref().map(|given| world.authorize_admin(Some(given)).is_ok()).unwrap_or(false);
    Ok(world.hub.subscribe(params.character_id, is_admin))
}

#[derive(Debug, Deserialize)]
pub struct EventQueryParams {
    pub character_id: String,
    #[serde(default)]
    pub admin_password: Option<String>,
}

/// Diagnostic-only: reports the bus's current sequence counter and, for an
/// authenticated admin, the full connection census; otherwise just the
/// caller's own connection state (spec.md §4.8 `event_query`, "admin/owner
/// only").
pub async fn event_query(world: &World, params: EventQueryParams) -> CoreResult<Value> {
    let current_sequence = world.event_bus.current_sequence();
    if world.authorize_admin(params.admin_password.as_deref()).is_ok() {
        return Ok(json!({
            "currentSequence": current_sequence,
            "connectedCharacters": world.hub.connected_characters(),
        }));
    }
    Ok(json!({
        "currentSequence": current_sequence,
        "connected": world.hub.is_connected(&params.character_id),
    }))
}
