use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{CoreError, CoreResult};
use crate::lock_manager::LockManager;
use crate::models::event::{Event, EventFilter};
use crate::models::ship::{Ship, ShipOwnerKind, ShipState, ShipType};
use crate::wire::event_names;
use crate::world::World;

#[derive(Debug, Deserialize)]
pub struct ShipPurchaseParams {
    pub character_id: String,
    pub ship_type: ShipType,
    pub name: String,
}

/// Trades in the character's current ship for its `trade_in_value` and buys
/// a new one of `ship_type` at its list price (spec.md §4.8
/// `ship_purchase`). A character owns exactly one personal ship at a time,
/// so purchase and trade-in are one atomic step rather than two commands.
pub async fn ship_purchase(world: &World, params: ShipPurchaseParams) -> CoreResult<Value> {
    let credit_key = LockManager::credit_key(&params.character_id);
    let _guard = world.locks.acquire(&credit_key).await;

    let mut character = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;
    if character.in_hyperspace {
        return Err(CoreError::conflict("character is in hyperspace"));
    }
    if world.sector_index.snapshot(character.sector_id).combat_active {
        return Err(CoreError::conflict("cannot trade ships while sector combat is active"));
    }

    let old_ship = world
        .repository
        .get_ship(&character.ship_id)
        .await?
        .ok_or_else(|| CoreError::Internal("ship missing for character".to_string()))?;
    let old_stats = world.reference_data.ship_stats(old_ship.ship_type);
    let new_stats = world.reference_data.ship_stats(params.ship_type);

    let net_cost = new_stats.price - old_stats.trade_in_value;
    if net_cost > 0 && character.credits_on_hand < net_cost {
        return Err(CoreError::Validation("insufficient credits for this trade-in".to_string()));
    }
    character.credits_on_hand -= net_cost;

    let new_ship_id = uuid::Uuid::new_v4().to_string();
    let new_ship = Ship {
        ship_id: new_ship_id.clone(),
        ship_type: params.ship_type,
        name: params.name,
        owner_kind: ShipOwnerKind::Character,
        owner_id: Some(character.character_id.clone()),
        state: ShipState {
            fighters: new_stats.max_fighters,
            shields: new_stats.max_shields,
            warp_power: new_stats.warp_power_capacity,
            cargo: Default::default(),
            credits: 0,
        },
    };

    let old_ship_id = character.ship_id.clone();
    character.ship_id = new_ship_id.clone();

    world.repository.put_ship(new_ship).await?;
    world.repository.delete_ship(&old_ship_id).await?;
    world.repository.put_character(character.clone()).await?;

    let payload = json!({
        "characterId": character.character_id,
        "oldShipId": old_ship_id,
        "newShipId": new_ship_id,
        "netCost": net_cost,
        "creditsOnHand": character.credits_on_hand,
    });
    world.event_bus.emit(
        Event::new(event_names::SHIP_TRADED_IN, payload.clone(), EventFilter::character_list([character.character_id.clone()])),
        world,
    );
    Ok(payload)
}
