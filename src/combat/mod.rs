pub mod resolver;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use serde_json::json;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::event_bus::{EventBus, FilterResolver};
use crate::lock_manager::LockManager;
use crate::models::character::{CharacterId, SectorId};
use crate::models::combat::{Action, ActionKind, Combatant, CombatId, CombatantId, CombatantKind, Encounter, EncounterContext, EncounterResult};
use crate::models::event::{Event, EventFilter};
use crate::reference_data::ReferenceData;
use crate::repository::WorldRepository;
use crate::sector_index::SectorIndex;

pub use resolver::RoundResolver;

/// Sector-combat singleton + dispatch table (spec.md §4.6 "CombatManager").
/// Exactly zero or one live encounter exists per sector at a time, enforced
/// by `by_sector`; `start_encounter` merges into an existing encounter
/// rather than creating a second one, mirroring
/// `combat_initiate.start_sector_combat`'s "refresh in place" behaviour.
/// Owns the `SectorIndex` flip of `combat_active` too, so the flag can
/// never drift out of sync with `by_sector`.
pub struct CombatManager {
    encounters: DashMap<CombatId, Arc<Mutex<Encounter>>>,
    by_sector: DashMap<SectorId, CombatId>,
    locks: Arc<LockManager>,
    event_bus: Arc<EventBus>,
    sector_index: Arc<SectorIndex>,
    repository: Arc<dyn WorldRepository>,
    reference_data: Arc<dyn ReferenceData>,
}

impl CombatManager {
    pub fn new(
        locks: Arc<LockManager>,
        event_bus: Arc<EventBus>,
        sector_index: Arc<SectorIndex>,
        repository: Arc<dyn WorldRepository>,
        reference_data: Arc<dyn ReferenceData>,
    ) -> Self {
        Self { encounters: DashMap::new(), by_sector: DashMap::new(), locks, event_bus, sector_index, repository, reference_data }
    }

    fn set_combat_active(&self, sector_id: SectorId, active: bool) {
        self.sector_index.update(sector_id, |rec| {
            let mut next = rec.clone();
            next.combat_active = active;
            next
        });
    }

    pub fn find_encounter_in_sector(&self, sector_id: SectorId) -> Option<Arc<Mutex<Encounter>>> {
        let combat_id = self.by_sector.get(&sector_id)?.clone();
        self.encounters.get(&combat_id).map(|r| r.clone())
    }

    pub fn get_encounter(&self, combat_id: &str) -> Option<Arc<Mutex<Encounter>>> {
        self.encounters.get(combat_id).map(|r| r.clone())
    }

    /// Finds the live encounter (if any) a given combatant currently
    /// belongs to, scanning the small set of encounters in progress. Sector
    /// combat is rare relative to movement/trade traffic so a linear scan
    /// over `encounters` is adequate (spec.md §4.6 note on expected load).
    pub async fn find_encounter_for(&self, combatant_id: &str) -> Option<Arc<Mutex<Encounter>>> {
        for entry in self.encounters.iter() {
            let encounter = entry.value().clone();
            let guard = encounter.lock().await;
            if !guard.is_ended() && guard.participants.contains_key(combatant_id) {
                drop(guard);
                return Some(encounter);
            }
        }
        None
    }

    /// Starts a new encounter in `sector_id`, or merges `initiator` and
    /// `sector_characters`/`garrisons` into the one already running there.
    /// Holds the sector's `combat:<sector_id>` lock for the whole call so
    /// two simultaneous initiations can't both "win" the create race
    /// (spec.md §4.6, grounded on `combat_initiate.start_sector_combat`).
    pub async fn start_encounter(
        &self,
        sector_id: SectorId,
        initiator_id: &CharacterId,
        sector_characters: Vec<Combatant>,
        garrisons: Vec<Combatant>,
        reason: &str,
        config: &Config,
        resolver: &dyn FilterResolver,
    ) -> CoreResult<Arc<Mutex<Encounter>>> {
        let _guard = self.locks.acquire(&LockManager::combat_key(sector_id)).await;

        if let Some(existing) = self.find_encounter_in_sector(sector_id) {
            let mut encounter = existing.lock().await;
            for combatant in sector_characters.into_iter().chain(garrisons) {
                encounter.participants.entry(combatant.combatant_id.clone()).or_insert(combatant);
            }
            let recipients: Vec<CharacterId> = encounter
                .participants
                .values()
                .filter_map(|c| c.owner_character_id.clone())
                .collect::<std::collections::BTreeSet<_>>()
                .into_iter()
                .collect();
            let payload = json!({
                "combatId": encounter.combat_id,
                "sectorId": encounter.sector_id,
                "round": encounter.round,
                "participants": encounter.participants,
                "deadline": encounter.deadline,
            });
            drop(encounter);
            self.event_bus.emit(
                Event::new(crate::wire::event_names::COMBAT_REFRESH, payload, EventFilter::character_list(recipients)),
                resolver,
            );
            return Ok(existing);
        }

        let mut participants: BTreeMap<CombatantId, Combatant> = BTreeMap::new();
        for combatant in sector_characters.into_iter().chain(garrisons) {
            participants.insert(combatant.combatant_id.clone(), combatant);
        }

        if participants.len() <= 1 {
            return Err(CoreError::conflict("No opponents available to engage"));
        }

        let combat_id = uuid::Uuid::new_v4().to_string();
        let garrison_sources: Vec<CombatantId> = participants
            .values()
            .filter(|c| matches!(c.kind, crate::models::combat::CombatantKind::Garrison))
            .map(|c| c.combatant_id.clone())
            .collect();

        let encounter = Encounter {
            combat_id: combat_id.clone(),
            sector_id,
            round: 1,
            participants,
            deadline: Utc::now() + Duration::seconds(config.round_window_seconds as i64),
            context: EncounterContext {
                initiator_id: Some(initiator_id.clone()),
                reason: reason.to_string(),
                garrison_sources,
            },
            pending_actions: BTreeMap::new(),
            result: None,
            salvage: Vec::new(),
        };

        let character_filter: Vec<CharacterId> = encounter
            .participants
            .values()
            .filter_map(|c| c.owner_character_id.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();

        let shared = Arc::new(Mutex::new(encounter));
        self.encounters.insert(combat_id.clone(), shared.clone());
        self.by_sector.insert(sector_id, combat_id.clone());
        self.set_combat_active(sector_id, true);

        let payload = {
            let guard = shared.lock().await;
            json!({
                "combatId": guard.combat_id,
                "sectorId": guard.sector_id,
                "round": guard.round,
                "participants": guard.participants,
                "deadline": guard.deadline,
            })
        };
        self.event_bus.emit(
            Event::new(crate::wire::event_names::COMBAT_ROUND_WAITING, payload, EventFilter::character_list(character_filter)),
            resolver,
        );

        Ok(shared)
    }

    /// Adds a single combatant to an already-running encounter (a character
    /// arriving mid-fight). No-op if already present.
    pub async fn add_participant(&self, combat_id: &str, combatant: Combatant) -> CoreResult<()> {
        let encounter = self.get_encounter(combat_id).ok_or_else(|| CoreError::NotFound(format!("combat '{combat_id}' not found")))?;
        let mut guard = encounter.lock().await;
        guard.participants.entry(combatant.combatant_id.clone()).or_insert(combatant);
        Ok(())
    }

    /// Records `action` for `combatant_id` in the current round. Actions
    /// submitted against a stale round number are rejected rather than
    /// silently buffered (spec.md §4.7 "stale-round submissions").
    pub async fn submit_action(
        &self,
        combat_id: &str,
        combatant_id: &str,
        round: u32,
        action: Action,
    ) -> CoreResult<()> {
        let encounter = self.get_encounter(combat_id).ok_or_else(|| CoreError::NotFound(format!("combat '{combat_id}' not found")))?;
        let mut guard = encounter.lock().await;
        if guard.is_ended() {
            return Err(CoreError::conflict("combat has already ended"));
        }
        if round != guard.round {
            return Err(CoreError::conflict_coded("action submitted for a stale round", "stale_round"));
        }
        if !guard.participants.contains_key(combatant_id) {
            return Err(CoreError::Validation(format!("'{combatant_id}' is not a participant in this encounter")));
        }

        match action.kind {
            ActionKind::Attack => {
                if action.commit <= 0 {
                    return Err(CoreError::Validation("attack requires commit > 0".to_string()));
                }
                let target_kind = action.target_id.as_deref().and_then(|id| guard.participants.get(id)).map(|c| c.kind);
                if target_kind == Some(CombatantKind::EscapePod) {
                    return Err(CoreError::conflict("escape pods cannot be targeted by an attack"));
                }
            }
            ActionKind::Flee => {
                let Some(destination) = action.destination_sector else {
                    return Err(CoreError::Validation("flee requires a destination_sector".to_string()));
                };
                if !self.reference_data.is_adjacent(guard.sector_id, destination) {
                    return Err(CoreError::conflict(format!("sector {destination} is not adjacent to {}", guard.sector_id)));
                }
            }
            ActionKind::Brace | ActionKind::Pay | ActionKind::Timeout => {}
        }

        guard.pending_actions.insert(combatant_id.to_string(), action);
        Ok(())
    }

    /// Moves a fled character to `destination_sector` and deducts warp
    /// power from their ship, mirroring the cost formula
    /// `dispatcher::movement::move_character` uses for an ordinary warp.
    async fn apply_flee(&self, character_id: &str, destination_sector: SectorId) -> CoreResult<()> {
        let Some(mut character) = self.repository.get_character(character_id).await? else { return Ok(()) };
        let from_sector = character.sector_id;

        if let Some(mut ship) = self.repository.get_ship(&character.ship_id).await? {
            let stats = self.reference_data.ship_stats(ship.ship_type);
            let cost = (stats.warp_power_capacity / stats.turns_per_warp.max(1)).max(1);
            ship.state.warp_power = (ship.state.warp_power - cost).max(0);
            self.repository.put_ship(ship).await?;
        }

        character.sector_id = destination_sector;
        self.sector_index.move_character(character_id, from_sector, destination_sector);
        self.repository.put_character(character).await
    }

    /// Swaps a destroyed character's ship to the escape pod type and dumps
    /// its cargo into the salvage container the resolver already created
    /// for them (spec.md §4.7 step 5).
    async fn apply_destruction(&self, character_id: &str, salvage_id: &str, encounter: &mut Encounter) -> CoreResult<()> {
        let Some(character) = self.repository.get_character(character_id).await? else { return Ok(()) };
        let Some(mut ship) = self.repository.get_ship(&character.ship_id).await? else { return Ok(()) };

        let cargo = std::mem::take(&mut ship.state.cargo);
        ship.ship_type = crate::models::ship::ShipType::EscapePod;
        ship.state.fighters = 0;
        ship.state.shields = 0;
        self.repository.put_ship(ship).await?;

        if let Some(salvage) = encounter.salvage.iter_mut().find(|s| s.salvage_id == salvage_id) {
            salvage.cargo = cargo;
        }
        Ok(())
    }

    /// Writes each live character combatant's post-round fighters/shields
    /// back to their actual ship, so combat outcomes outlive the encounter
    /// (spec.md §4.7 step 5 / step 7).
    async fn persist_live_combatants(&self, encounter: &Encounter) {
        for combatant in encounter.participants.values() {
            if !matches!(combatant.kind, CombatantKind::Character) {
                continue;
            }
            let Some(owner) = &combatant.owner_character_id else { continue };
            if let Err(err) = self.persist_ship_stats(owner, combatant.fighters, combatant.shields).await {
                log::error!("failed to persist ship stats for {owner}: {err}");
            }
        }
    }

    async fn persist_ship_stats(&self, character_id: &str, fighters: i64, shields: i64) -> CoreResult<()> {
        let Some(character) = self.repository.get_character(character_id).await? else { return Ok(()) };
        let Some(mut ship) = self.repository.get_ship(&character.ship_id).await? else { return Ok(()) };
        ship.state.fighters = fighters;
        ship.state.shields = shields;
        self.repository.put_ship(ship).await
    }

    /// Resolves every encounter whose deadline has passed (spec.md §4.9).
    /// Re-checks `deadline` and `is_ended` after acquiring each sector's
    /// lock, since a concurrent `submit_action` may have already resolved
    /// the round between the scan and the lock acquisition.
    pub async fn sweep_expired(&self, config: &Config, resolver: &dyn FilterResolver) {
        let now = Utc::now();
        let candidates: Vec<(SectorId, CombatId)> = self
            .by_sector
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        for (sector_id, combat_id) in candidates {
            let Some(encounter_arc) = self.get_encounter(&combat_id) else { continue };
            let _guard = self.locks.acquire(&LockManager::combat_key(sector_id)).await;

            let mut encounter = encounter_arc.lock().await;
            if encounter.is_ended() || encounter.deadline > now {
                continue;
            }

            let is_first_round = encounter.round == 1;
            let outcome = RoundResolver::resolve(&mut encounter, config, is_first_round);

            for fled in &outcome.fled {
                if let Some(owner) = &fled.owner_character_id {
                    if let Err(err) = self.apply_flee(owner, fled.destination_sector).await {
                        log::error!("failed to persist flee for {owner}: {err}");
                    }
                }
            }

            for destroyed in &outcome.destroyed {
                if let Some(owner) = &destroyed.owner_character_id {
                    if let Err(err) = self.apply_destruction(owner, &destroyed.salvage_id, &mut encounter).await {
                        log::error!("failed to persist destruction for {owner}: {err}");
                    }
                }
            }

            let new_salvage_ids: std::collections::BTreeSet<&str> = outcome.new_salvage.iter().map(|s| s.salvage_id.as_str()).collect();
            for salvage in encounter.salvage.iter().filter(|s| new_salvage_ids.contains(s.salvage_id.as_str())) {
                if let Err(err) = self.repository.put_salvage(salvage.clone()).await {
                    log::error!("failed to persist salvage {}: {err}", salvage.salvage_id);
                }
            }

            self.persist_live_combatants(&encounter).await;

            let recipients: Vec<CharacterId> = encounter
                .participants
                .values()
                .filter_map(|c| c.owner_character_id.clone())
                .collect::<std::collections::BTreeSet<_>>()
                .into_iter()
                .collect();

            self.event_bus.emit(
                Event::new(crate::wire::event_names::COMBAT_ROUND_RESOLVED, outcome.round_resolved_payload, EventFilter::character_list(recipients.clone())),
                resolver,
            );

            if outcome.ended {
                let payload = json!({
                    "combatId": encounter.combat_id,
                    "result": encounter.result,
                    "salvage": encounter.salvage,
                });
                self.event_bus.emit(Event::new(crate::wire::event_names::COMBAT_ENDED, payload, EventFilter::character_list(recipients)), resolver);
                self.event_bus.emit(
                    Event::new(crate::wire::event_names::SECTOR_UPDATE, json!({ "sectorId": sector_id }), EventFilter::sector(sector_id)),
                    resolver,
                );
                drop(encounter);
                self.by_sector.remove(&sector_id);
                self.encounters.remove(&combat_id);
                self.set_combat_active(sector_id, false);
            } else {
                let payload = json!({
                    "combatId": encounter.combat_id,
                    "round": encounter.round,
                    "deadline": encounter.deadline,
                });
                self.event_bus.emit(Event::new(crate::wire::event_names::COMBAT_ROUND_WAITING, payload, EventFilter::character_list(recipients)), resolver);
            }
        }
    }

    /// Fast-path toll payment: pays off every toll-mode garrison the payer
    /// owes in this encounter and removes them as combatants without
    /// waiting for the round to resolve, satisfying spec.md §9's "pay
    /// clears all owed tolls atomically or fails wholly" decision.
    pub async fn pay_tolls(
        &self,
        combat_id: &str,
        payer_id: &str,
        amount_available: i64,
        resolver: &dyn FilterResolver,
    ) -> CoreResult<i64> {
        let encounter = self.get_encounter(combat_id).ok_or_else(|| CoreError::NotFound(format!("combat '{combat_id}' not found")))?;
        let mut guard = encounter.lock().await;

        if guard.is_ended() {
            return Err(CoreError::conflict("combat has already ended"));
        }

        let toll_combatants: Vec<CombatantId> = guard
            .participants
            .values()
            .filter(|c| matches!(c.kind, crate::models::combat::CombatantKind::Garrison) && c.fighters > 0)
            .map(|c| c.combatant_id.clone())
            .collect();

        if toll_combatants.is_empty() {
            return Err(CoreError::conflict("no toll to pay in this encounter"));
        }

        let total_owed: i64 = toll_combatants
            .iter()
            .filter_map(|id| guard.participants.get(id))
            .map(|g| g.max_fighters)
            .sum::<i64>()
            .max(toll_combatants.len() as i64);

        if amount_available < total_owed {
            return Err(CoreError::Validation("insufficient credits to pay all owed tolls".to_string()));
        }

        for id in &toll_combatants {
            guard.participants.remove(id);
        }
        guard.result = Some(EncounterResult::TollSatisfied);

        let payload = json!({
            "combatId": guard.combat_id,
            "result": guard.result,
            "payer": payer_id,
            "amountPaid": total_owed,
            "salvage": guard.salvage,
        });
        let recipients: Vec<CharacterId> = guard
            .participants
            .values()
            .filter_map(|c| c.owner_character_id.clone())
            .chain(std::iter::once(payer_id.to_string()))
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        let sector_id = guard.sector_id;
        self.persist_live_combatants(&guard).await;
        drop(guard);

        self.event_bus.emit(Event::new(crate::wire::event_names::COMBAT_ENDED, payload, EventFilter::character_list(recipients)), resolver);
        self.event_bus.emit(
            Event::new(crate::wire::event_names::SECTOR_UPDATE, json!({ "sectorId": sector_id }), EventFilter::sector(sector_id)),
            resolver,
        );
        self.by_sector.remove(&sector_id);
        self.encounters.remove(combat_id);
        self.set_combat_active(sector_id, false);

        Ok(total_owed)
    }

    /// Admin override: ends an encounter outright regardless of round state
    /// (spec.md §4.8 admin-gated combat termination). No salvage is
    /// generated — combatants simply stop fighting.
    pub async fn admin_terminate(&self, combat_id: &str, resolver: &dyn FilterResolver) -> CoreResult<()> {
        let encounter = self.get_encounter(combat_id).ok_or_else(|| CoreError::NotFound(format!("combat '{combat_id}' not found")))?;
        let mut guard = encounter.lock().await;
        if guard.is_ended() {
            return Err(CoreError::conflict("combat has already ended"));
        }
        guard.result = Some(EncounterResult::AdminTerminated);

        let recipients: Vec<CharacterId> = guard
            .participants
            .values()
            .filter_map(|c| c.owner_character_id.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        let sector_id = guard.sector_id;
        let payload = json!({ "combatId": guard.combat_id, "result": guard.result });
        drop(guard);

        self.event_bus.emit(Event::new(crate::wire::event_names::COMBAT_ENDED, payload, EventFilter::character_list(recipients)), resolver);
        self.event_bus.emit(
            Event::new(crate::wire::event_names::SECTOR_UPDATE, json!({ "sectorId": sector_id }), EventFilter::sector(sector_id)),
            resolver,
        );
        self.by_sector.remove(&sector_id);
        self.encounters.remove(combat_id);
        self.set_combat_active(sector_id, false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::combat::CombatantKind;

    struct NullResolver;
    impl FilterResolver for NullResolver {
        fn resolve(&self, _filter: &EventFilter) -> (Vec<CharacterId>, bool) {
            (Vec::new(), false)
        }
    }

    fn combatant(id: &str, owner: &str) -> Combatant {
        Combatant {
            combatant_id: id.to_string(),
            kind: CombatantKind::Character,
            name: id.to_string(),
            fighters: 100,
            shields: 50,
            max_fighters: 100,
            max_shields: 50,
            owner_character_id: Some(owner.to_string()),
            fleeing: false,
            garrison_mode: None,
        }
    }

    #[tokio::test]
    async fn start_encounter_requires_at_least_two_combatants() {
        let locks = Arc::new(LockManager::new());
        let hub = Arc::new(crate::subscription_hub::SubscriptionHub::new());
        let bus = Arc::new(EventBus::new(hub));
        let sector_index = Arc::new(crate::sector_index::SectorIndex::new());
        let repository: Arc<dyn crate::repository::WorldRepository> = Arc::new(crate::repository::InMemoryWorldRepository::new());
        let reference_data: Arc<dyn crate::reference_data::ReferenceData> = Arc::new(crate::reference_data::StaticReferenceData::new(std::collections::BTreeMap::new()));
        let manager = CombatManager::new(locks, bus, sector_index, repository, reference_data);
        let config = Config {
            round_window_seconds: 15,
            deadline_poll_interval_seconds: 1,
            salvage_ttl_seconds: 3600,
            corporation_creation_cost: 0,
            fighter_price: 0,
            warp_power_price: 0,
            banking_sector_id: 0,
            admin_password: None,
            max_participants_per_sector_combat: 64,
            garrison_offensive_burst: 25,
            shield_recharge_percent: 20,
        };

        let err = manager
            .start_encounter(1, &"char-1".to_string(), vec![combatant("char-1", "char-1")], vec![], "manual", &config, &NullResolver)
            .await
            .unwrap_err();
        assert_eq!(err.status(), 409);
    }

    #[tokio::test]
    async fn start_encounter_merges_into_existing() {
        let locks = Arc::new(LockManager::new());
        let hub = Arc::new(crate::subscription_hub::SubscriptionHub::new());
        let bus = Arc::new(EventBus::new(hub));
        let sector_index = Arc::new(crate::sector_index::SectorIndex::new());
        let repository: Arc<dyn crate::repository::WorldRepository> = Arc::new(crate::repository::InMemoryWorldRepository::new());
        let reference_data: Arc<dyn crate::reference_data::ReferenceData> = Arc::new(crate::reference_data::StaticReferenceData::new(std::collections::BTreeMap::new()));
        let manager = CombatManager::new(locks, bus, sector_index, repository, reference_data);
        let config = Config {
            round_window_seconds: 15,
            deadline_poll_interval_seconds: 1,
            salvage_ttl_seconds: 3600,
            corporation_creation_cost: 0,
            fighter_price: 0,
            warp_power_price: 0,
            banking_sector_id: 0,
            admin_password: None,
            max_participants_per_sector_combat: 64,
            garrison_offensive_burst: 25,
            shield_recharge_percent: 20,
        };

        let encounter = manager
            .start_encounter(
                1,
                &"char-1".to_string(),
                vec![combatant("char-1", "char-1"), combatant("char-2", "char-2")],
                vec![],
                "manual",
                &config,
                &NullResolver,
            )
            .await
            .unwrap();
        let combat_id = encounter.lock().await.combat_id.clone();

        let merged = manager
            .start_encounter(1, &"char-3".to_string(), vec![combatant("char-3", "char-3")], vec![], "manual", &config, &NullResolver)
            .await
            .unwrap();

        assert_eq!(merged.lock().await.combat_id, combat_id);
        assert_eq!(merged.lock().await.participants.len(), 3);
    }

    fn test_config() -> Config {
        Config {
            round_window_seconds: 15,
            deadline_poll_interval_seconds: 1,
            salvage_ttl_seconds: 3600,
            corporation_creation_cost: 0,
            fighter_price: 0,
            warp_power_price: 0,
            banking_sector_id: 0,
            admin_password: None,
            max_participants_per_sector_combat: 64,
            garrison_offensive_burst: 25,
            shield_recharge_percent: 20,
        }
    }

    fn manager_with_adjacency() -> CombatManager {
        let locks = Arc::new(LockManager::new());
        let hub = Arc::new(crate::subscription_hub::SubscriptionHub::new());
        let bus = Arc::new(EventBus::new(hub));
        let sector_index = Arc::new(crate::sector_index::SectorIndex::new());
        let repository: Arc<dyn crate::repository::WorldRepository> = Arc::new(crate::repository::InMemoryWorldRepository::new());
        let reference_data: Arc<dyn crate::reference_data::ReferenceData> =
            Arc::new(crate::reference_data::StaticReferenceData::new(crate::reference_data::ring_adjacency(10)));
        CombatManager::new(locks, bus, sector_index, repository, reference_data)
    }

    #[tokio::test]
    async fn submit_action_rejects_non_positive_attack_commit() {
        let manager = manager_with_adjacency();
        let config = test_config();
        let encounter = manager
            .start_encounter(1, &"char-1".to_string(), vec![combatant("char-1", "char-1"), combatant("char-2", "char-2")], vec![], "manual", &config, &NullResolver)
            .await
            .unwrap();
        let combat_id = encounter.lock().await.combat_id.clone();

        let err = manager.submit_action(&combat_id, "char-1", 1, Action::attack("char-2".to_string(), 0)).await.unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn submit_action_rejects_flee_to_non_adjacent_sector() {
        let manager = manager_with_adjacency();
        let config = test_config();
        let encounter = manager
            .start_encounter(1, &"char-1".to_string(), vec![combatant("char-1", "char-1"), combatant("char-2", "char-2")], vec![], "manual", &config, &NullResolver)
            .await
            .unwrap();
        let combat_id = encounter.lock().await.combat_id.clone();

        let flee = Action { kind: ActionKind::Flee, commit: 0, target_id: None, destination_sector: Some(999) };
        let err = manager.submit_action(&combat_id, "char-1", 1, flee).await.unwrap_err();
        assert_eq!(err.status(), 409);
    }

    #[tokio::test]
    async fn submit_action_rejects_attack_on_escape_pod() {
        let manager = manager_with_adjacency();
        let config = test_config();
        let mut pod = combatant("char-2", "char-2");
        pod.kind = CombatantKind::EscapePod;
        let encounter = manager
            .start_encounter(1, &"char-1".to_string(), vec![combatant("char-1", "char-1"), pod], vec![], "manual", &config, &NullResolver)
            .await
            .unwrap();
        let combat_id = encounter.lock().await.combat_id.clone();

        let err = manager.submit_action(&combat_id, "char-1", 1, Action::attack("char-2".to_string(), 10)).await.unwrap_err();
        assert_eq!(err.status(), 409);
    }
}
