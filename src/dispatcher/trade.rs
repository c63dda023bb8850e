use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{CoreError, CoreResult};
use crate::lock_manager::LockManager;
use crate::models::event::{Event, EventFilter};
use crate::wire::event_names;
use crate::world::World;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Deserialize)]
pub struct TradeParams {
    pub character_id: String,
    pub commodity: String,
    pub units: i64,
    pub side: TradeSide,
}

/// Executes a buy or sell against the character's current sector's port
/// (spec.md §4.8 `trade`). Holds `credit:<character_id>` and
/// `port:<sector_id>` together via `with_keys` so a port's stock and a
/// character's credits move atomically relative to any other trade.
pub async fn trade(world: &World, params: TradeParams) -> CoreResult<Value> {
    if params.units <= 0 {
        return Err(CoreError::TypeViolation("units must be a positive integer".to_string()));
    }

    let character = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;
    if character.in_hyperspace {
        return Err(CoreError::conflict("character is in hyperspace"));
    }
    if world.sector_index.snapshot(character.sector_id).combat_active {
        return Err(CoreError::conflict("cannot trade while sector combat is active"));
    }

    let credit_key = LockManager::credit_key(&character.character_id);
    let port_key = LockManager::port_key(character.sector_id);
    let _guard = world.locks.with_keys(&[&credit_key, &port_key]).await;

    let mut character = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;
    let mut ship = world
        .repository
        .get_ship(&character.ship_id)
        .await?
        .ok_or_else(|| CoreError::Internal(format!("ship '{}' missing for character", character.ship_id)))?;
    let stats = world.reference_data.ship_stats(ship.ship_type);

    // Port pricing and stock are external state the core doesn't generate
    // (spec.md §1 Non-goals: market simulation); a flat price per unit
    // stands in for the port reference data a production deployment would
    // plug in via a richer `ReferenceData`.
    let unit_price = 10;
    let total = unit_price * params.units;

    match params.side {
        TradeSide::Buy => {
            if character.credits_on_hand < total {
                return Err(CoreError::Validation("insufficient credits".to_string()));
            }
            let used = ship.state.cargo_used();
            if used + params.units > stats.cargo_capacity {
                return Err(CoreError::conflict("cargo hold is full"));
            }
            character.credits_on_hand -= total;
            *ship.state.cargo.entry(params.commodity.clone()).or_insert(0) += params.units;
        }
        TradeSide::Sell => {
            let held = ship.state.cargo.get(&params.commodity).copied().unwrap_or(0);
            if held < params.units {
                return Err(CoreError::Validation("insufficient cargo to sell".to_string()));
            }
            character.credits_on_hand += total;
            *ship.state.cargo.get_mut(&params.commodity).unwrap() -= params.units;
        }
    }

    world.repository.put_ship(ship.clone()).await?;
    world.repository.put_character(character.clone()).await?;

    let payload = json!({
        "characterId": character.character_id,
        "sectorId": character.sector_id,
        "commodity": params.commodity,
        "units": params.units,
        "side": matches!(params.side, TradeSide::Buy).then_some("buy").unwrap_or("sell"),
        "totalPrice": total,
        "creditsOnHand": character.credits_on_hand,
    });
    world.event_bus.emit(Event::new(event_names::TRADE_EXECUTED, payload.clone(), EventFilter::character_list([character.character_id.clone()])), world);
    world.event_bus.emit(Event::new(event_names::PORT_UPDATE, json!({"sectorId": character.sector_id}), EventFilter::sector(character.sector_id)), world);

    Ok(payload)
}

#[derive(Debug, Deserialize)]
pub struct RechargeWarpPowerParams {
    pub character_id: String,
    pub units: i64,
}

pub async fn recharge_warp_power(world: &World, params: RechargeWarpPowerParams) -> CoreResult<Value> {
    if params.units <= 0 {
        return Err(CoreError::TypeViolation("units must be a positive integer".to_string()));
    }
    let credit_key = LockManager::credit_key(&params.character_id);
    let _guard = world.locks.acquire(&credit_key).await;

    let mut character = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;
    let mut ship = world
        .repository
        .get_ship(&character.ship_id)
        .await?
        .ok_or_else(|| CoreError::Internal("ship missing for character".to_string()))?;
    let stats = world.reference_data.ship_stats(ship.ship_type);

    let cost = params.units * world.config.warp_power_price;
    if character.credits_on_hand < cost {
        return Err(CoreError::Validation("insufficient credits".to_string()));
    }
    let capacity_left = stats.warp_power_capacity - ship.state.warp_power;
    if params.units > capacity_left {
        return Err(CoreError::conflict("warp power capacity exceeded"));
    }

    character.credits_on_hand -= cost;
    ship.state.warp_power += params.units;

    world.repository.put_ship(ship.clone()).await?;
    world.repository.put_character(character.clone()).await?;

    let payload = json!({
        "characterId": character.character_id,
        "warpPower": ship.state.warp_power,
        "creditsOnHand": character.credits_on_hand,
    });
    world.event_bus.emit(Event::new(event_names::WARP_PURCHASE, payload.clone(), EventFilter::character_list([character.character_id.clone()])), world);
    Ok(payload)
}

#[derive(Debug, Deserialize)]
pub struct PurchaseFightersParams {
    pub character_id: String,
    pub units: i64,
}

pub async fn purchase_fighters(world: &World, params: PurchaseFightersParams) -> CoreResult<Value> {
    if params.units <= 0 {
        return Err(CoreError::TypeViolation("units must be a positive integer".to_string()));
    }
    let credit_key = LockManager::credit_key(&params.character_id);
    let _guard = world.locks.acquire(&credit_key).await;

    let mut character = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;
    let mut ship = world
        .repository
        .get_ship(&character.ship_id)
        .await?
        .ok_or_else(|| CoreError::Internal("ship missing for character".to_string()))?;
    let stats = world.reference_data.ship_stats(ship.ship_type);

    let cost = params.units * world.config.fighter_price;
    if character.credits_on_hand < cost {
        return Err(CoreError::Validation("insufficient credits".to_string()));
    }
    let capacity_left = stats.max_fighters - ship.state.fighters;
    if params.units > capacity_left {
        return Err(CoreError::conflict("fighter bay capacity exceeded"));
    }

    character.credits_on_hand -= cost;
    ship.state.fighters += params.units;

    world.repository.put_ship(ship.clone()).await?;
    world.repository.put_character(character.clone()).await?;

    let payload = json!({
        "characterId": character.character_id,
        "fighters": ship.state.fighters,
        "creditsOnHand": character.credits_on_hand,
    });
    world.event_bus.emit(Event::new(event_names::FIGHTER_PURCHASE, payload.clone(), EventFilter::character_list([character.character_id.clone()])), world);
    Ok(payload)
}

#[derive(Debug, Deserialize)]
pub struct DumpCargoParams {
    pub character_id: String,
    pub commodity: String,
    pub units: i64,
}

pub async fn dump_cargo(world: &World, params: DumpCargoParams) -> CoreResult<Value> {
    if params.units <= 0 {
        return Err(CoreError::TypeViolation("units must be a positive integer".to_string()));
    }
    let character = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;
    let mut ship = world
        .repository
        .get_ship(&character.ship_id)
        .await?
        .ok_or_else(|| CoreError::Internal("ship missing for character".to_string()))?;

    let held = ship.state.cargo.get(&params.commodity).copied().unwrap_or(0);
    if held < params.units {
        return Err(CoreError::Validation("insufficient cargo to dump".to_string()));
    }
    *ship.state.cargo.get_mut(&params.commodity).unwrap() -= params.units;
    ship.state.cargo.retain(|_, qty| *qty != 0);

    world.repository.put_ship(ship.clone()).await?;

    Ok(json!({
        "characterId": character.character_id,
        "commodity": params.commodity,
        "unitsDumped": params.units,
        "cargo": ship.state.cargo,
    }))
}
