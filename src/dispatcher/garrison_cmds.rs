use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{CoreError, CoreResult};
use crate::lock_manager::LockManager;
use crate::models::event::{Event, EventFilter};
use crate::models::garrison::{Garrison, GarrisonMode};
use crate::wire::event_names;
use crate::world::World;

#[derive(Debug, Deserialize)]
pub struct CombatLeaveFightersParams {
    pub character_id: String,
    pub fighters: i64,
    #[serde(default = "default_mode")]
    pub mode: GarrisonMode,
    #[serde(default)]
    pub toll_amount: i64,
}

fn default_mode() -> GarrisonMode {
    GarrisonMode::Defensive
}

/// Deploys part of a character's ship fighters as a standing garrison in
/// their current sector (spec.md §3 "Sector rule": at most one garrison
/// per sector, and the teacher's sector-singleton invariant is enforced
/// here via the `port:<sector_id>` lock, reused as the general sector
/// mutation lock since garrisons share the same contention domain as port
/// stock).
pub async fn combat_leave_fighters(world: &World, params: CombatLeaveFightersParams) -> CoreResult<Value> {
    if params.fighters <= 0 {
        return Err(CoreError::TypeViolation("fighters must be a positive integer".to_string()));
    }
    let character = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;
    if world.sector_index.snapshot(character.sector_id).combat_active {
        return Err(CoreError::conflict("cannot deploy a garrison while sector combat is active"));
    }

    let port_key = LockManager::port_key(character.sector_id);
    let _guard = world.locks.acquire(&port_key).await;

    if let Some(existing) = world.repository.get_garrison(character.sector_id).await? {
        if existing.owner_id != character.character_id {
            return Err(CoreError::conflict("sector already holds a garrison belonging to another character"));
        }
    }

    let mut ship = world
        .repository
        .get_ship(&character.ship_id)
        .await?
        .ok_or_else(|| CoreError::Internal("ship missing for character".to_string()))?;
    if ship.state.fighters < params.fighters {
        return Err(CoreError::Validation("insufficient fighters aboard ship".to_string()));
    }

    ship.state.fighters -= params.fighters;
    let garrison = Garrison::new(character.sector_id, character.character_id.clone(), params.fighters, params.mode, params.toll_amount);

    world.repository.put_ship(ship).await?;
    world.repository.put_garrison(garrison.clone()).await?;
    world.sector_index.update(character.sector_id, |rec| {
        let mut next = rec.clone();
        next.garrison = Some(garrison.clone());
        next
    });

    let payload = json!({ "characterId": character.character_id, "garrison": garrison });
    world.event_bus.emit(Event::new(event_names::GARRISON_DEPLOYED, payload.clone(), EventFilter::sector(character.sector_id)), world);
    Ok(payload)
}

#[derive(Debug, Deserialize)]
pub struct CombatCollectFightersParams {
    pub character_id: String,
}

pub async fn combat_collect_fighters(world: &World, params: CombatCollectFightersParams) -> CoreResult<Value> {
    let character = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;
    if world.sector_index.snapshot(character.sector_id).combat_active {
        return Err(CoreError::conflict("cannot collect a garrison while sector combat is active"));
    }

    let port_key = LockManager::port_key(character.sector_id);
    let _guard = world.locks.acquire(&port_key).await;

    let garrison = world
        .repository
        .get_garrison(character.sector_id)
        .await?
        .ok_or_else(|| CoreError::NotFound("no garrison in this sector".to_string()))?;
    if garrison.owner_id != character.character_id {
        return Err(CoreError::Authorization("garrison belongs to another character".to_string()));
    }

    let mut ship = world
        .repository
        .get_ship(&character.ship_id)
        .await?
        .ok_or_else(|| CoreError::Internal("ship missing for character".to_string()))?;
    let stats = world.reference_data.ship_stats(ship.ship_type);
    let reclaimed = garrison.fighters.min(stats.max_fighters - ship.state.fighters);
    ship.state.fighters += reclaimed;

    world.repository.put_ship(ship).await?;
    world.repository.delete_garrison(character.sector_id).await?;
    world.sector_index.update(character.sector_id, |rec| {
        let mut next = rec.clone();
        next.garrison = None;
        next
    });

    let payload = json!({ "characterId": character.character_id, "fightersCollected": reclaimed, "tollBalance": garrison.toll_balance });
    world.event_bus.emit(Event::new(event_names::GARRISON_COLLECTED, payload.clone(), EventFilter::sector(character.sector_id)), world);
    Ok(payload)
}

#[derive(Debug, Deserialize)]
pub struct CombatSetGarrisonModeParams {
    pub character_id: String,
    pub mode: GarrisonMode,
    #[serde(default)]
    pub toll_amount: i64,
}

pub async fn combat_set_garrison_mode(world: &World, params: CombatSetGarrisonModeParams) -> CoreResult<Value> {
    let character = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;

    let port_key = LockManager::port_key(character.sector_id);
    let _guard = world.locks.acquire(&port_key).await;

    let mut garrison = world
        .repository
        .get_garrison(character.sector_id)
        .await?
        .ok_or_else(|| CoreError::NotFound("no garrison in this sector".to_string()))?;
    if garrison.owner_id != character.character_id {
        return Err(CoreError::Authorization("garrison belongs to another character".to_string()));
    }

    garrison.mode = params.mode;
    if matches!(params.mode, GarrisonMode::Toll) {
        garrison.toll_amount = params.toll_amount;
    }
    world.repository.put_garrison(garrison.clone()).await?;
    world.sector_index.update(character.sector_id, |rec| {
        let mut next = rec.clone();
        next.garrison = Some(garrison.clone());
        next
    });

    let payload = json!({ "characterId": character.character_id, "garrison": garrison });
    world.event_bus.emit(Event::new(event_names::GARRISON_MODE_CHANGED, payload.clone(), EventFilter::sector(character.sector_id)), world);
    Ok(payload)
}
