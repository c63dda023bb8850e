use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{CoreError, CoreResult};
use crate::lock_manager::LockManager;
use crate::models::combat::{Action, ActionKind, Combatant, CombatantKind};
use crate::world::World;

fn garrison_combatant_id(sector_id: i64) -> String {
    format!("garrison:{sector_id}")
}

#[derive(Debug, Deserialize)]
pub struct CombatInitiateParams {
    pub character_id: String,
    #[serde(default = "default_reason")]
    pub reason: String,
}

fn default_reason() -> String {
    "manual".to_string()
}

/// Gathers every character and the garrison (if any) present in the
/// initiator's sector into one encounter (spec.md §4.8 `combat_initiate`,
/// grounded on `original_source/game-server/api/combat_initiate.py`'s
/// `start_sector_combat`, which folds the same two sources).
pub async fn combat_initiate(world: &World, params: CombatInitiateParams) -> CoreResult<Value> {
    let initiator = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;
    if initiator.in_hyperspace {
        return Err(CoreError::conflict("character is in hyperspace"));
    }

    let sector_id = initiator.sector_id;
    let snapshot = world.sector_index.snapshot(sector_id);

    let mut combatants = Vec::new();
    for character_id in snapshot.characters.iter() {
        let Some(character) = world.repository.get_character(character_id).await? else { continue };
        let Some(ship) = world.repository.get_ship(&character.ship_id).await? else { continue };
        let stats = world.reference_data.ship_stats(ship.ship_type);
        combatants.push(Combatant {
            combatant_id: character.character_id.clone(),
            kind: CombatantKind::Character,
            name: character.name.clone(),
            fighters: ship.state.fighters,
            shields: ship.state.shields,
            max_fighters: stats.max_fighters,
            max_shields: stats.max_shields,
            owner_character_id: Some(character.character_id.clone()),
            fleeing: false,
            garrison_mode: None,
        });
    }

    let mut garrisons = Vec::new();
    if let Some(garrison) = world.repository.get_garrison(sector_id).await? {
        garrisons.push(Combatant {
            combatant_id: garrison_combatant_id(sector_id),
            kind: CombatantKind::Garrison,
            name: format!("{}'s garrison", garrison.owner_id),
            fighters: garrison.fighters,
            shields: 0,
            max_fighters: garrison.fighters,
            max_shields: 0,
            owner_character_id: Some(garrison.owner_id.clone()),
            fleeing: false,
            garrison_mode: Some(garrison.mode),
        });
    }

    let encounter = world
        .combat
        .start_encounter(sector_id, &initiator.character_id, combatants, garrisons, &params.reason, world.config, world)
        .await?;

    let guard = encounter.lock().await;
    Ok(json!({
        "combatId": guard.combat_id,
        "sectorId": guard.sector_id,
        "round": guard.round,
        "participants": guard.participants,
        "deadline": guard.deadline,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatActionKind {
    Attack,
    Brace,
    Flee,
    Pay,
}

#[derive(Debug, Deserialize)]
pub struct CombatActionParams {
    pub character_id: String,
    pub combat_id: String,
    pub round: u32,
    pub action: CombatActionKind,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub commit: i64,
    #[serde(default)]
    pub destination_sector: Option<i64>,
}

/// Submits one combatant's action for the current round, or — for `pay` —
/// resolves the toll fast-path immediately rather than waiting for the
/// round timer (spec.md §4.8 `combat_action`).
pub async fn combat_action(world: &World, params: CombatActionParams) -> CoreResult<Value> {
    if matches!(params.action, CombatActionKind::Pay) {
        return pay(world, params).await;
    }

    let action = match params.action {
        CombatActionKind::Attack => {
            let target = params.target_id.clone().ok_or_else(|| CoreError::Validation("attack requires a target_id".to_string()))?;
            Action::attack(target, params.commit)
        }
        CombatActionKind::Brace => Action::brace(),
        CombatActionKind::Flee => Action {
            kind: ActionKind::Flee,
            commit: 0,
            target_id: None,
            destination_sector: params.destination_sector,
        },
        CombatActionKind::Pay => unreachable!(),
    };

    world.combat.submit_action(&params.combat_id, &params.character_id, params.round, action).await?;
    Ok(json!({ "combatId": params.combat_id, "characterId": params.character_id, "round": params.round, "accepted": true }))
}

async fn pay(world: &World, params: CombatActionParams) -> CoreResult<Value> {
    let credit_key = LockManager::credit_key(&params.character_id);
    let _guard = world.locks.acquire(&credit_key).await;

    let mut character = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;

    let paid = world.combat.pay_tolls(&params.combat_id, &character.character_id, character.credits_on_hand, world).await?;
    character.credits_on_hand -= paid;
    world.repository.put_character(character.clone()).await?;

    Ok(json!({
        "combatId": params.combat_id,
        "characterId": character.character_id,
        "amountPaid": paid,
        "creditsOnHand": character.credits_on_hand,
    }))
}
