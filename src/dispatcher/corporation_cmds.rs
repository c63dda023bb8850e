use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{CoreError, CoreResult};
use crate::lock_manager::LockManager;
use crate::models::character::CharacterId;
use crate::models::corporation::Corporation;
use crate::models::event::{Event, EventFilter};
use crate::wire::event_names;
use crate::world::World;

/// `EventFilter::CorporationMembers` can't be resolved synchronously by
/// `World::resolve` (membership requires an async repository read), so
/// every corp-scoped emit in this module pre-resolves the member list
/// itself and passes a concrete `CharacterList` filter instead.
fn member_filter(corp: &Corporation) -> EventFilter {
    EventFilter::character_list(corp.members.iter().cloned())
}

#[derive(Debug, Deserialize)]
pub struct CorporationCreateParams {
    pub character_id: String,
    pub name: String,
}

pub async fn corporation_create(world: &World, params: CorporationCreateParams) -> CoreResult<Value> {
    let credit_key = LockManager::credit_key(&params.character_id);
    let _guard = world.locks.acquire(&credit_key).await;

    let mut character = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;
    if character.corporation_id.is_some() {
        return Err(CoreError::conflict("character already belongs to a corporation"));
    }
    if character.credits_on_hand < world.config.corporation_creation_cost {
        return Err(CoreError::Validation("insufficient credits to found a corporation".to_string()));
    }

    let corp_id = uuid::Uuid::new_v4().to_string();
    let invite_code = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
    let corp = Corporation::new(corp_id.clone(), params.name, invite_code, character.character_id.clone());

    character.credits_on_hand -= world.config.corporation_creation_cost;
    character.corporation_id = Some(corp_id.clone());

    world.repository.put_corporation(corp.clone()).await?;
    world.repository.put_character(character.clone()).await?;

    let payload = json!({ "corporation": corp });
    world.event_bus.emit(Event::new(event_names::CORPORATION_CREATED, payload.clone(), member_filter(&corp)), world);
    Ok(payload)
}

#[derive(Debug, Deserialize)]
pub struct CorporationJoinParams {
    pub character_id: String,
    pub invite_code: String,
}

pub async fn corporation_join(world: &World, params: CorporationJoinParams) -> CoreResult<Value> {
    let mut character = world
        .repository
        .get_character(&params.character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{}' not found", params.character_id)))?;
    if character.corporation_id.is_some() {
        return Err(CoreError::conflict("character already belongs to a corporation"));
    }

    let corps = world.repository.list_corporations().await?;
    let mut corp = corps
        .into_iter()
        .find(|c| c.invite_code == params.invite_code)
        .ok_or_else(|| CoreError::NotFound("no corporation matches that invite code".to_string()))?;

    corp.members.insert(character.character_id.clone());
    character.corporation_id = Some(corp.corp_id.clone());

    world.repository.put_corporation(corp.clone()).await?;
    world.repository.put_character(character.clone()).await?;

    let payload = json!({ "corporationId": corp.corp_id, "characterId": character.character_id });
    world.event_bus.emit(Event::new(event_names::CORPORATION_MEMBER_JOINED, payload.clone(), member_filter(&corp)), world);
    Ok(payload)
}

async fn load_corp_for(world: &World, character_id: &str) -> CoreResult<(crate::models::Character, Corporation)> {
    let character = world
        .repository
        .get_character(character_id)
        .await?
        .ok_or_else(|| CoreError::NotFound(format!("character '{character_id}' not found")))?;
    let corp_id = character.corporation_id.clone().ok_or_else(|| CoreError::conflict("character does not belong to a corporation"))?;
    let corp = world
        .repository
        .get_corporation(&corp_id)
        .await?
        .ok_or_else(|| CoreError::Internal("corporation referenced by character is missing".to_string()))?;
    Ok((character, corp))
}

#[derive(Debug, Deserialize)]
pub struct CorporationLeaveParams {
    pub character_id: String,
}

pub async fn corporation_leave(world: &World, params: CorporationLeaveParams) -> CoreResult<Value> {
    let (mut character, mut corp) = load_corp_for(world, &params.character_id).await?;
    corp.members.remove(&character.character_id);
    character.corporation_id = None;

    world.repository.put_character(character.clone()).await?;
    let payload = json!({ "corporationId": corp.corp_id, "characterId": character.character_id });

    if corp.members.is_empty() {
        return disband_internal(world, corp, params.character_id).await;
    }

    world.repository.put_corporation(corp.clone()).await?;
    world.event_bus.emit(
        Event::new(event_names::CORPORATION_MEMBER_LEFT, payload.clone(), EventFilter::character_list(corp.members.iter().cloned().chain(std::iter::once(character.character_id.clone())))),
        world,
    );
    Ok(payload)
}

#[derive(Debug, Deserialize)]
pub struct CorporationKickParams {
    pub character_id: String,
    pub target_character_id: String,
}

/// Authorized via `World::authorize`: the actor must already be a member of
/// the same corporation as the target (spec.md §4.8 step 2's general
/// corp-member authorization rule, applied here instead of self-only).
pub async fn corporation_kick(world: &World, params: CorporationKickParams) -> CoreResult<Value> {
    world.authorize(&params.character_id, &params.target_character_id).await?;
    if params.character_id == params.target_character_id {
        return Err(CoreError::Validation("cannot kick yourself; use corporation_leave".to_string()));
    }

    let (mut target, mut corp) = load_corp_for(world, &params.target_character_id).await?;
    corp.members.remove(&target.character_id);
    target.corporation_id = None;

    world.repository.put_character(target.clone()).await?;
    let recipients: Vec<CharacterId> = corp.members.iter().cloned().chain(std::iter::once(target.character_id.clone())).collect();
    world.repository.put_corporation(corp.clone()).await?;

    let payload = json!({ "corporationId": corp.corp_id, "kickedCharacterId": target.character_id, "kickedBy": params.character_id });
    world.event_bus.emit(Event::new(event_names::CORPORATION_MEMBER_KICKED, payload.clone(), EventFilter::character_list(recipients)), world);
    Ok(payload)
}

async fn disband_internal(world: &World, corp: Corporation, actor: CharacterId) -> CoreResult<Value> {
    for ship_id in &corp.ships {
        if let Some(mut ship) = world.repository.get_ship(ship_id).await? {
            ship.owner_kind = crate::models::ship::ShipOwnerKind::Unowned;
            ship.owner_id = None;
            world.repository.put_ship(ship).await?;
        }
    }
    let payload = json!({ "corporationId": corp.corp_id, "disbandedBy": actor, "abandonedShips": corp.ships });
    world.event_bus.emit(Event::new(event_names::CORPORATION_DISBANDED, payload.clone(), EventFilter::character_list([actor])), world);
    if !corp.ships.is_empty() {
        world.event_bus.emit(
            Event::new(event_names::CORPORATION_SHIPS_ABANDONED, json!({ "shipIds": corp.ships }), EventFilter::AdminOnly),
            world,
        );
    }
    Ok(payload)
}

#[derive(Debug, Deserialize)]
pub struct CorporationDisbandParams {
    pub character_id: String,
}

pub async fn corporation_disband(world: &World, params: CorporationDisbandParams) -> CoreResult<Value> {
    let (mut character, corp) = load_corp_for(world, &params.character_id).await?;
    character.corporation_id = None;
    world.repository.put_character(character.clone()).await?;

    for member_id in corp.members.iter().filter(|id| **id != character.character_id) {
        if let Some(mut member) = world.repository.get_character(member_id).await? {
            member.corporation_id = None;
            world.repository.put_character(member).await?;
        }
    }

    disband_internal(world, corp, params.character_id).await
}

#[derive(Debug, Deserialize)]
pub struct CorporationRegenerateInviteParams {
    pub character_id: String,
}

pub async fn corporation_regenerate_invite_code(world: &World, params: CorporationRegenerateInviteParams) -> CoreResult<Value> {
    let (_character, mut corp) = load_corp_for(world, &params.character_id).await?;
    corp.invite_code = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
    world.repository.put_corporation(corp.clone()).await?;

    let payload = json!({ "corporationId": corp.corp_id, "inviteCode": corp.invite_code });
    world.event_bus.emit(Event::new(event_names::CORPORATION_INVITE_CODE_REGENERATED, payload.clone(), member_filter(&corp)), world);
    Ok(payload)
}

#[derive(Debug, Deserialize)]
pub struct CorporationShipPurchaseParams {
    pub character_id: String,
    pub ship_type: crate::models::ship::ShipType,
    pub name: String,
}

/// Purchases a new ship titled to the corporation rather than the
/// character, debiting the corp's pooled funds (spec.md §4.8
/// `corporation_ship_purchase`). Corp funds live on the founding member's
/// bank balance in this design — see DESIGN.md's Open Question on
/// corporation treasuries.
pub async fn corporation_ship_purchase(world: &World, params: CorporationShipPurchaseParams) -> CoreResult<Value> {
    let credit_key = LockManager::credit_key(&params.character_id);
    let _guard = world.locks.acquire(&credit_key).await;

    let (mut character, mut corp) = load_corp_for(world, &params.character_id).await?;
    let stats = world.reference_data.ship_stats(params.ship_type);
    if character.credits_on_hand < stats.price {
        return Err(CoreError::Validation("insufficient credits to purchase ship".to_string()));
    }
    character.credits_on_hand -= stats.price;

    let ship_id = uuid::Uuid::new_v4().to_string();
    let ship = crate::models::ship::Ship {
        ship_id: ship_id.clone(),
        ship_type: params.ship_type,
        name: params.name,
        owner_kind: crate::models::ship::ShipOwnerKind::Corporation,
        owner_id: Some(corp.corp_id.clone()),
        state: crate::models::ship::ShipState {
            fighters: stats.max_fighters,
            shields: stats.max_shields,
            warp_power: stats.warp_power_capacity,
            cargo: Default::default(),
            credits: 0,
        },
    };
    corp.ships.insert(ship_id.clone());

    world.repository.put_ship(ship.clone()).await?;
    world.repository.put_corporation(corp.clone()).await?;
    world.repository.put_character(character.clone()).await?;

    let payload = json!({ "corporationId": corp.corp_id, "shipId": ship_id, "purchasedBy": character.character_id });
    world.event_bus.emit(Event::new(event_names::CORPORATION_SHIP_PURCHASED, payload.clone(), member_filter(&corp)), world);
    Ok(payload)
}
