use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{CoreError, CoreResult};
use crate::lock_manager::LockManager;
use crate::models::character::SectorId;
use crate::models::event::{Event, EventFilter};
use crate::wire::event_names;
use crate::world::World;

#[derive(Debug, Deserialize)]
pub struct MoveParams {
    pub character_id: String,
    pub destination_sector: SectorId,
}

/// Moves a character to an adjacent sector, deducting warp power and
/// advancing turns spent warping per the ship's `turns_per_warp` (spec.md
/// §4.8 `move`). Rejects the move while the character is in hyperspace or
/// their sector is in active combat.
pub async fn move_character(world: &World, params: MoveParams) -> CoreResult<Value> {
    let character_key = LockManager::knowledge_key(&params.character_id);
    let _guard = world.locks.acquire(&character_key).await;

    let mut character = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;

    if character.in_hyperspace {
        return Err(CoreError::conflict("character is already in hyperspace"));
    }
    let from_sector = character.sector_id;
    if world.sector_index.snapshot(from_sector).combat_active {
        return Err(CoreError::conflict("cannot move while sector combat is active"));
    }
    if !world.reference_data.is_adjacent(from_sector, params.destination_sector) {
        return Err(CoreError::Validation(format!(
            "sector {} is not adjacent to {}",
            params.destination_sector, from_sector
        )));
    }

    let mut ship = world
        .repository
        .get_ship(&character.ship_id)
        .await?
        .ok_or_else(|| CoreError::Internal(format!("ship '{}' missing for character", character.ship_id)))?;
    let stats = world.reference_data.ship_stats(ship.ship_type);

    if ship.state.warp_power < stats.warp_power_capacity.min(1) {
        return Err(CoreError::Validation("insufficient warp power".to_string()));
    }
    let cost = (stats.warp_power_capacity / stats.turns_per_warp.max(1)).max(1);
    if ship.state.warp_power < cost {
        return Err(CoreError::Validation("insufficient warp power".to_string()));
    }
    ship.state.warp_power -= cost;

    character.sector_id = params.destination_sector;
    world.sector_index.move_character(&character.character_id, from_sector, params.destination_sector);
    world.knowledge.record_visit(&character.character_id, params.destination_sector, None);

    world.repository.put_ship(ship).await?;
    world.repository.put_character(character.clone()).await?;

    let payload = json!({
        "characterId": character.character_id,
        "fromSector": from_sector,
        "toSector": params.destination_sector,
    });
    world.event_bus.emit(
        Event::new(event_names::CHARACTER_MOVED, payload.clone(), EventFilter::sector_excluding(from_sector, character.character_id.clone())),
        world,
    );
    world.event_bus.emit(
        Event::new(event_names::SECTOR_UPDATE, json!({"sectorId": params.destination_sector}), EventFilter::sector(params.destination_sector)),
        world,
    );

    Ok(payload)
}

#[derive(Debug, Deserialize)]
pub struct PlotCourseParams {
    pub character_id: String,
    pub destination_sector: SectorId,
}

/// Read-only path query; does not mutate state. A minimal breadth-first
/// search over `ReferenceData::adjacent_sectors`, since universe topology
/// is small and external (spec.md §1 Non-goals: pathfinding algorithms for
/// large universes are out of scope).
pub async fn plot_course(world: &World, params: PlotCourseParams) -> CoreResult<Value> {
    let character = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;

    use std::collections::{BTreeMap, VecDeque};
    let mut visited: BTreeMap<SectorId, Option<SectorId>> = BTreeMap::new();
    visited.insert(character.sector_id, None);
    let mut queue = VecDeque::from([character.sector_id]);

    while let Some(current) = queue.pop_front() {
        if current == params.destination_sector {
            break;
        }
        for next in world.reference_data.adjacent_sectors(current) {
            if !visited.contains_key(&next) {
                visited.insert(next, Some(current));
                queue.push_back(next);
            }
        }
    }

    if !visited.contains_key(&params.destination_sector) {
        return Err(CoreError::Validation(format!("no known route to sector {}", params.destination_sector)));
    }

    let mut path = vec![params.destination_sector];
    let mut cursor = params.destination_sector;
    while let Some(Some(prev)) = visited.get(&cursor) {
        path.push(*prev);
        cursor = *prev;
    }
    path.reverse();

    Ok(json!({ "characterId": character.character_id, "path": path }))
}
