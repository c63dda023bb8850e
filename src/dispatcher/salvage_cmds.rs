use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{CoreError, CoreResult};
use crate::lock_manager::LockManager;
use crate::models::event::{Event, EventFilter};
use crate::wire::event_names;
use crate::world::World;

#[derive(Debug, Deserialize)]
pub struct SalvageCollectParams {
    pub character_id: String,
    pub salvage_id: String,
}

/// Pulls one salvage container into the collector's ship and credits
/// account (spec.md §4.8 `salvage_collect`). Rejects expired containers —
/// `expires_at` is enforced here rather than by a background sweep, since
/// the repository has no TTL primitive of its own (grounded on the
/// teacher's lazy-expiry pattern for `generic_lookup` rows).
pub async fn salvage_collect(world: &World, params: SalvageCollectParams) -> CoreResult<Value> {
    let character = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;
    if character.in_hyperspace {
        return Err(CoreError::conflict("character is in hyperspace"));
    }
    if world.sector_index.snapshot(character.sector_id).combat_active {
        return Err(CoreError::conflict("cannot collect salvage while sector combat is active"));
    }

    let port_key = LockManager::port_key(character.sector_id);
    let _guard = world.locks.acquire(&port_key).await;

    let candidates = world.repository.list_salvage_in_sector(character.sector_id).await?;
    let salvage = candidates
        .into_iter()
        .find(|s| s.salvage_id == params.salvage_id)
        .ok_or_else(|| CoreError::NotFound(format!("salvage '{}' not found in this sector", params.salvage_id)))?;
    if salvage.is_expired(chrono::Utc::now()) {
        world.repository.delete_salvage(&salvage.salvage_id).await?;
        return Err(CoreError::NotFound("salvage container has expired".to_string()));
    }

    let mut ship = world
        .repository
        .get_ship(&character.ship_id)
        .await?
        .ok_or_else(|| CoreError::Internal("ship missing for character".to_string()))?;
    let stats = world.reference_data.ship_stats(ship.ship_type);

    let mut free_capacity = stats.cargo_capacity - ship.state.cargo_used();
    let mut collected_cargo = std::collections::BTreeMap::new();
    for (commodity, &units) in &salvage.cargo {
        let take = units.min(free_capacity.max(0));
        if take <= 0 {
            continue;
        }
        *ship.state.cargo.entry(commodity.clone()).or_insert(0) += take;
        collected_cargo.insert(commodity.clone(), take);
        free_capacity -= take;
    }
    ship.state.fighters = (ship.state.fighters + salvage.scrap).min(stats.max_fighters);

    let mut character = character;
    character.credits_on_hand += salvage.credits;

    world.repository.put_ship(ship.clone()).await?;
    world.repository.put_character(character.clone()).await?;
    world.repository.delete_salvage(&salvage.salvage_id).await?;

    let payload = json!({
        "characterId": character.character_id,
        "salvageId": salvage.salvage_id,
        "collectedCargo": collected_cargo,
        "scrapCollected": salvage.scrap,
        "creditsCollected": salvage.credits,
        "creditsOnHand": character.credits_on_hand,
    });
    world.event_bus.emit(
        Event::new(event_names::SALVAGE_COLLECTED, payload.clone(), EventFilter::character_list([character.character_id.clone()])),
        world,
    );
    Ok(payload)
}
