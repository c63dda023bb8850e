use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{CoreError, CoreResult};
use crate::lock_manager::LockManager;
use crate::models::event::{Event, EventFilter};
use crate::wire::event_names;
use crate::world::World;

#[derive(Debug, Deserialize)]
pub struct TransferCreditsParams {
    pub character_id: String,
    pub target_character_id: String,
    pub amount: i64,
}

/// Moves on-hand credits between two characters in the same sector. Holds
/// both `credit:<id>` locks together via `with_keys` (canonical order) so a
/// simultaneous transfer in the other direction can't deadlock (spec.md
/// §4.8 `transfer_credits`).
pub async fn transfer_credits(world: &World, params: TransferCreditsParams) -> CoreResult<Value> {
    if params.amount <= 0 {
        return Err(CoreError::TypeViolation("amount must be a positive integer".to_string()));
    }
    if params.character_id == params.target_character_id {
        return Err(CoreError::Validation("cannot transfer credits to yourself".to_string()));
    }

    let from_key = LockManager::credit_key(&params.character_id);
    let to_key = LockManager::credit_key(&params.target_character_id);
    let _guard = world.locks.with_keys(&[&from_key, &to_key]).await;

    let mut sender = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;
    let mut receiver = world
        .repository
        .get_character(&params.target_character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.target_character_id)))?;
    if sender.sector_id != receiver.sector_id {
        return Err(CoreError::conflict("both characters must be in the same sector to transfer credits"));
    }
    if sender.credits_on_hand < params.amount {
        return Err(CoreError::Validation("insufficient credits".to_string()));
    }

    sender.credits_on_hand -= params.amount;
    receiver.credits_on_hand += params.amount;

    world.repository.put_character(sender.clone()).await?;
    world.repository.put_character(receiver.clone()).await?;

    let payload = json!({
        "fromCharacterId": sender.character_id,
        "toCharacterId": receiver.character_id,
        "amount": params.amount,
    });
    world.event_bus.emit(
        Event::new(event_names::CREDITS_TRANSFER, payload.clone(), EventFilter::character_list([sender.character_id.clone(), receiver.character_id.clone()])),
        world,
    );
    Ok(payload)
}

#[derive(Debug, Deserialize)]
pub struct TransferWarpPowerParams {
    pub character_id: String,
    pub target_character_id: String,
    pub units: i64,
}

pub async fn transfer_warp_power(world: &World, params: TransferWarpPowerParams) -> CoreResult<Value> {
    if params.units <= 0 {
        return Err(CoreError::TypeViolation("units must be a positive integer".to_string()));
    }
    if params.character_id == params.target_character_id {
        return Err(CoreError::Validation("cannot transfer warp power to yourself".to_string()));
    }

    let from_key = LockManager::credit_key(&params.character_id);
    let to_key = LockManager::credit_key(&params.target_character_id);
    let _guard = world.locks.with_keys(&[&from_key, &to_key]).await;

    let sender = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;
    let receiver = world
        .repository
        .get_character(&params.target_character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.target_character_id)))?;
    if sender.sector_id != receiver.sector_id {
        return Err(CoreError::conflict("both characters must be in the same sector to transfer warp power"));
    }

    let mut sender_ship = world
        .repository
        .get_ship(&sender.ship_id)
        .await?
        .ok_or_else(|| CoreError::Internal("ship missing for character".to_string()))?;
    let mut receiver_ship = world
        .repository
        .get_ship(&receiver.ship_id)
        .await?
        .ok_or_else(|| CoreError::Internal("ship missing for character".to_string()))?;
    if sender_ship.state.warp_power < params.units {
        return Err(CoreError::Validation("insufficient warp power".to_string()));
    }
    let receiver_stats = world.reference_data.ship_stats(receiver_ship.ship_type);
    if receiver_ship.state.warp_power + params.units > receiver_stats.warp_power_capacity {
        return Err(CoreError::conflict("receiving ship's warp power capacity exceeded"));
    }

    sender_ship.state.warp_power -= params.units;
    receiver_ship.state.warp_power += params.units;

    world.repository.put_ship(sender_ship).await?;
    world.repository.put_ship(receiver_ship).await?;

    let payload = json!({
        "fromCharacterId": sender.character_id,
        "toCharacterId": receiver.character_id,
        "units": params.units,
    });
    world.event_bus.emit(
        Event::new(event_names::WARP_TRANSFER, payload.clone(), EventFilter::character_list([sender.character_id, receiver.character_id])),
        world,
    );
    Ok(payload)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankDirection {
    Deposit,
    Withdraw,
}

#[derive(Debug, Deserialize)]
pub struct BankTransferParams {
    pub character_id: String,
    pub direction: BankDirection,
    pub amount: i64,
}

/// Moves credits between on-hand and banked balances. Banking is
/// sector-agnostic in this design (spec.md §1 Non-goals: no simulated
/// banking-station network) — see DESIGN.md's Open Question note.
pub async fn bank_transfer(world: &World, params: BankTransferParams) -> CoreResult<Value> {
    if params.amount <= 0 {
        return Err(CoreError::TypeViolation("amount must be a positive integer".to_string()));
    }
    let credit_key = LockManager::credit_key(&params.character_id);
    let _guard = world.locks.acquire(&credit_key).await;

    let mut character = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;

    match params.direction {
        BankDirection::Deposit => {
            if character.credits_on_hand < params.amount {
                return Err(CoreError::Validation("insufficient credits on hand".to_string()));
            }
            character.credits_on_hand -= params.amount;
            character.credits_in_bank += params.amount;
        }
        BankDirection::Withdraw => {
            if character.credits_in_bank < params.amount {
                return Err(CoreError::Validation("insufficient banked credits".to_string()));
            }
            character.credits_in_bank -= params.amount;
            character.credits_on_hand += params.amount;
        }
    }

    world.repository.put_character(character.clone()).await?;

    let payload = json!({
        "characterId": character.character_id,
        "creditsOnHand": character.credits_on_hand,
        "creditsInBank": character.credits_in_bank,
    });
    world.event_bus.emit(
        Event::new(event_names::BANK_TRANSACTION, payload.clone(), EventFilter::character_list([character.character_id.clone()])),
        world,
    );
    Ok(payload)
}
