use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{CoreError, CoreResult};
use crate::models::character::{Character, CharacterKind};
use crate::world::World;

#[derive(Debug, Deserialize)]
pub struct JoinParams {
    pub character_id: String,
    pub name: String,
    #[serde(default)]
    pub starting_sector: Option<i64>,
}

/// Creates a new character and its starting ship, placing them in
/// `starting_sector` (default: the configured banking sector), per
/// spec.md §4.8's `join` command.
pub async fn join(world: &World, params: JoinParams) -> CoreResult<Value> {
    if world.repository.get_character(&params.character_id).await?.is_some() {
        return Err(CoreError::conflict(format!("character '{}' already exists", params.character_id)));
    }

    let sector_id = params.starting_sector.unwrap_or(world.config.banking_sector_id);
    let ship_id = format!("ship-{}", params.character_id);
    let mut character = Character::new(params.character_id.clone(), params.name, sector_id, ship_id.clone());
    character.kind = CharacterKind::Human;

    let stats = world.reference_data.ship_stats(crate::models::ship::ShipType::Scout);
    let ship = crate::models::ship::Ship {
        ship_id,
        ship_type: crate::models::ship::ShipType::Scout,
        name: format!("{}'s Scout", character.name),
        owner_kind: crate::models::ship::ShipOwnerKind::Character,
        owner_id: Some(character.character_id.clone()),
        state: crate::models::ship::ShipState {
            fighters: stats.max_fighters,
            shields: stats.max_shields,
            warp_power: stats.warp_power_capacity,
            cargo: Default::default(),
            credits: 0,
        },
    };

    world.repository.put_ship(ship).await?;
    world.sector_index.update(sector_id, |rec| {
        let mut next = rec.clone();
        next.characters.insert(character.character_id.clone());
        next
    });
    world.knowledge.record_visit(&character.character_id, sector_id, None);
    world.repository.put_character(character.clone()).await?;

    status_snapshot(world, &character.character_id).await
}

/// Builds the `status.snapshot` payload: character, ship, sector contents —
/// supplemented from `original_source/game-server/api/utils.py`'s
/// `build_status_payload`, which the distilled spec only gestures at via
/// the `status.snapshot`/`status.update` event names.
pub async fn status_snapshot(world: &World, character_id: &str) -> CoreResult<Value> {
    let character = world
        .repository
        .get_character(character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{character_id}' not found")))?;
    let ship = world.repository.get_ship(&character.ship_id).await?;
    let sector_snapshot = world.sector_index.snapshot(character.sector_id);
    let garrison = world.repository.get_garrison(character.sector_id).await?;

    Ok(json!({
        "character": character,
        "ship": ship,
        "sector": {
            "sectorId": character.sector_id,
            "otherCharacters": sector_snapshot.characters.iter().filter(|id| id.as_str() != character_id).collect::<Vec<_>>(),
            "garrison": garrison,
            "combatActive": sector_snapshot.combat_active,
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct MyStatusParams {
    pub character_id: String,
}

pub async fn my_status(world: &World, params: MyStatusParams) -> CoreResult<Value> {
    status_snapshot(world, &params.character_id).await
}

#[derive(Debug, Deserialize)]
pub struct MyMapParams {
    pub character_id: String,
}

/// `map.knowledge`: every sector this character has personally visited and
/// what was last observed there. Unlike `my_status`, this never reflects
/// state the character hasn't witnessed (spec.md §3 knowledge semantics).
pub async fn my_map(world: &World, params: MyMapParams) -> CoreResult<Value> {
    let knowledge = world.knowledge.snapshot(&params.character_id);
    Ok(json!({
        "visitedSectors": knowledge.visited_sectors,
        "knownPortCodes": knowledge.known_port_codes,
    }))
}
