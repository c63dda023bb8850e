//! End-to-end scenarios driven through the dispatcher and the public
//! `World`/`CombatManager` API, exercising the paths the teacher's own
//! integration tests favor: build real state via the public commands, then
//! assert on the repository/sector index afterward rather than poking at
//! internals.

use std::sync::Arc;

use sector_core::combat::CombatManager;
use sector_core::config::Config;
use sector_core::dispatcher::{combat_cmds, credits, garrison_cmds, salvage_cmds, status, subscription_cmds, trade};
use sector_core::event_bus::EventBus;
use sector_core::lock_manager::LockManager;
use sector_core::models::combat::{Action, Combatant, CombatantKind, EncounterResult};
use sector_core::models::garrison::GarrisonMode;
use sector_core::reference_data::{ring_adjacency, StaticReferenceData};
use sector_core::repository::WorldRepository;
use sector_core::sector_index::SectorIndex;
use sector_core::subscription_hub::SubscriptionHub;
use sector_core::world::World;

fn test_config() -> Config {
    Config {
        round_window_seconds: 0,
        deadline_poll_interval_seconds: 1,
        salvage_ttl_seconds: 3600,
        corporation_creation_cost: 10_000,
        fighter_price: 5,
        warp_power_price: 2,
        banking_sector_id: 0,
        admin_password: Some("letmein".to_string()),
        max_participants_per_sector_combat: 64,
        garrison_offensive_burst: 25,
        shield_recharge_percent: 20,
    }
}

fn test_world() -> World {
    let reference_data = Arc::new(StaticReferenceData::new(ring_adjacency(10)));
    World::new_in_memory(reference_data, Box::leak(Box::new(test_config())))
}

async fn join(world: &World, character_id: &str, name: &str, sector: i64) {
    status::join(
        world,
        status::JoinParams {
            character_id: character_id.to_string(),
            name: name.to_string(),
            starting_sector: Some(sector),
        },
    )
    .await
    .unwrap();
}

async fn grant_credits(world: &World, character_id: &str, amount: i64) {
    let mut character = world.repository.get_character(character_id).await.unwrap().unwrap();
    character.credits_on_hand += amount;
    world.repository.put_character(character).await.unwrap();
}

/// S1 — a buy followed by a sell of the same commodity and quantity at the
/// core's flat placeholder price returns the character to their starting
/// credit balance, with cargo back at zero.
#[tokio::test]
async fn s1_trade_round_trip_conserves_credits() {
    let world = test_world();
    join(&world, "char-1", "Trader Jane", 0).await;
    grant_credits(&world, "char-1", 1_000).await;

    trade::trade(
        &world,
        trade::TradeParams { character_id: "char-1".to_string(), commodity: "ore".to_string(), units: 5, side: trade::TradeSide::Buy },
    )
    .await
    .unwrap();

    let character = world.repository.get_character("char-1").await.unwrap().unwrap();
    assert_eq!(character.credits_on_hand, 950);
    let ship = world.repository.get_ship(&character.ship_id).await.unwrap().unwrap();
    assert_eq!(ship.state.cargo.get("ore"), Some(&5));

    trade::trade(
        &world,
        trade::TradeParams { character_id: "char-1".to_string(), commodity: "ore".to_string(), units: 5, side: trade::TradeSide::Sell },
    )
    .await
    .unwrap();

    let character = world.repository.get_character("char-1").await.unwrap().unwrap();
    assert_eq!(character.credits_on_hand, 1_000);
    let ship = world.repository.get_ship(&character.ship_id).await.unwrap().unwrap();
    assert!(ship.state.cargo.get("ore").copied().unwrap_or(0) == 0);
}

/// S2 — two characters in the same sector fight; the sector's
/// `combat_active` flag goes up when the encounter starts and comes back
/// down once it ends, proving `CombatManager` is the sole, consistent owner
/// of that flag (a real bug in an earlier build left it stuck `true`).
#[tokio::test]
async fn s2_mutual_combat_resets_sector_combat_flag_on_end() {
    let world = test_world();
    join(&world, "char-1", "Alice", 3).await;
    join(&world, "char-2", "Bob", 3).await;

    let config = test_config();
    let combatants = vec![
        Combatant {
            combatant_id: "char-1".to_string(),
            kind: CombatantKind::Character,
            name: "Alice".to_string(),
            fighters: 5,
            shields: 0,
            max_fighters: 50,
            max_shields: 50,
            owner_character_id: Some("char-1".to_string()),
            fleeing: false,
            garrison_mode: None,
        },
        Combatant {
            combatant_id: "char-2".to_string(),
            kind: CombatantKind::Character,
            name: "Bob".to_string(),
            fighters: 50,
            shields: 0,
            max_fighters: 50,
            max_shields: 50,
            owner_character_id: Some("char-2".to_string()),
            fleeing: false,
            garrison_mode: None,
        },
    ];

    let encounter = world.combat.start_encounter(3, &"char-1".to_string(), combatants, vec![], "manual", &config, &world).await.unwrap();
    let combat_id = encounter.lock().await.combat_id.clone();
    assert!(world.sector_index.snapshot(3).combat_active);

    // char-2 commits overwhelming force against char-1's single fighter and
    // zero shields; the round is guaranteed lethal regardless of the dice.
    world.combat.submit_action(&combat_id, "char-1", 1, Action::brace()).await.unwrap();
    world.combat.submit_action(&combat_id, "char-2", 1, Action::attack("char-1".to_string(), 10_000)).await.unwrap();

    world.combat.sweep_expired(&config, &world).await;

    assert!(!world.sector_index.snapshot(3).combat_active, "combat_active must reset once the encounter ends");
    assert!(world.combat.get_encounter(&combat_id).is_none());

    let salvage = world.repository.list_salvage_in_sector(3).await.unwrap();
    assert_eq!(salvage.len(), 1, "the destroyed combatant's salvage must be persisted by sweep_expired");
}

/// S3 — toll payment resolves the encounter immediately rather than
/// waiting for the round deadline, and clears the garrison regardless of
/// the configured round window.
#[tokio::test]
async fn s3_toll_payment_fast_path_ends_combat_immediately() {
    let world = test_world();
    join(&world, "garrison-owner", "Toller", 5).await;
    join(&world, "payer", "Payer", 5).await;
    grant_credits(&world, "payer", 5_000).await;

    garrison_cmds::combat_leave_fighters(
        &world,
        garrison_cmds::CombatLeaveFightersParams {
            character_id: "garrison-owner".to_string(),
            fighters: 20,
            mode: GarrisonMode::Toll,
            toll_amount: 100,
        },
    )
    .await
    .unwrap();

    let initiated = combat_cmds::combat_initiate(&world, combat_cmds::CombatInitiateParams { character_id: "payer".to_string(), reason: "manual".to_string() })
        .await
        .unwrap();
    let combat_id = initiated["combatId"].as_str().unwrap().to_string();

    let result = combat_cmds::combat_action(
        &world,
        combat_cmds::CombatActionParams {
            character_id: "payer".to_string(),
            combat_id: combat_id.clone(),
            round: 1,
            action: combat_cmds::CombatActionKind::Pay,
            target_id: None,
            commit: 0,
            destination_sector: None,
        },
    )
    .await
    .unwrap();

    // pay_tolls charges the sum of each toll garrison's max_fighters, not the
    // deployer's configured toll_amount (that field only gates the garrison's
    // AI stance elsewhere); with one 20-fighter garrison that's 20 credits.
    assert_eq!(result["amountPaid"], 20);
    assert!(world.combat.get_encounter(&combat_id).is_none());
    assert!(!world.sector_index.snapshot(5).combat_active);
    assert!(world.repository.get_garrison(5).await.unwrap().is_some(), "pay_tolls only removes the paid garrison from the encounter, not from the sector");

    let payer = world.repository.get_character("payer").await.unwrap().unwrap();
    assert_eq!(payer.credits_on_hand, 4_980);
}

/// S4 — a destroyed character becomes salvage, which a third party can
/// then collect via `salvage_collect` (tests both the round-resolution
/// destruction path and the persistence fix that makes the salvage
/// actually reachable afterward).
#[tokio::test]
async fn s4_destroyed_ship_converts_to_collectible_salvage() {
    let world = test_world();
    join(&world, "victim", "Victim", 7).await;
    join(&world, "attacker", "Attacker", 7).await;
    join(&world, "scavenger", "Scavenger", 7).await;

    let victim_character = world.repository.get_character("victim").await.unwrap().unwrap();
    let mut victim_ship = world.repository.get_ship(&victim_character.ship_id).await.unwrap().unwrap();
    victim_ship.state.cargo.insert("ore".to_string(), 3);
    world.repository.put_ship(victim_ship).await.unwrap();

    let config = test_config();
    let combatants = vec![
        Combatant {
            combatant_id: "victim".to_string(),
            kind: CombatantKind::Character,
            name: "Victim".to_string(),
            fighters: 1,
            shields: 0,
            max_fighters: 50,
            max_shields: 50,
            owner_character_id: Some("victim".to_string()),
            fleeing: false,
            garrison_mode: None,
        },
        Combatant {
            combatant_id: "attacker".to_string(),
            kind: CombatantKind::Character,
            name: "Attacker".to_string(),
            fighters: 50,
            shields: 0,
            max_fighters: 50,
            max_shields: 50,
            owner_character_id: Some("attacker".to_string()),
            fleeing: false,
            garrison_mode: None,
        },
    ];
    let encounter = world.combat.start_encounter(7, &"attacker".to_string(), combatants, vec![], "manual", &config, &world).await.unwrap();
    let combat_id = encounter.lock().await.combat_id.clone();

    world.combat.submit_action(&combat_id, "victim", 1, Action::brace()).await.unwrap();
    world.combat.submit_action(&combat_id, "attacker", 1, Action::attack("victim".to_string(), 10_000)).await.unwrap();
    world.combat.sweep_expired(&config, &world).await;

    {
        let guard = encounter.lock().await;
        assert_eq!(guard.result, Some(EncounterResult::SideDefeated));
        assert_eq!(guard.participants.get("victim").unwrap().kind, CombatantKind::EscapePod);
    }

    // The victim's actual ship must reflect the outcome: swapped to an
    // escape pod, zeroed out, and emptied of its pre-combat cargo.
    let victim_ship = world.repository.get_ship(&victim_character.ship_id).await.unwrap().unwrap();
    assert_eq!(victim_ship.ship_type, sector_core::models::ship::ShipType::EscapePod);
    assert_eq!(victim_ship.state.fighters, 0);
    assert_eq!(victim_ship.state.shields, 0);
    assert!(victim_ship.state.cargo.is_empty());

    let salvage = world.repository.list_salvage_in_sector(7).await.unwrap();
    assert_eq!(salvage.len(), 1);
    let salvage_id = salvage[0].salvage_id.clone();
    assert_eq!(salvage[0].cargo.get("ore"), Some(&3), "victim's pre-combat cargo must be dumped into the salvage container");

    let collected = salvage_cmds::salvage_collect(&world, salvage_cmds::SalvageCollectParams { character_id: "scavenger".to_string(), salvage_id: salvage_id.clone() })
        .await
        .unwrap();
    assert_eq!(collected["salvageId"], salvage_id);
    assert_eq!(collected["collectedCargo"]["ore"], 3);
    assert!(world.repository.list_salvage_in_sector(7).await.unwrap().is_empty());
}

/// S5 — two credit transfers in opposite directions between the same pair
/// of characters, issued concurrently, never deadlock (thanks to
/// `with_keys`'s canonical lock ordering) and leave the combined balance
/// unchanged.
#[tokio::test]
async fn s5_concurrent_opposite_transfers_do_not_deadlock_and_conserve_total() {
    let world = Arc::new(test_world());
    join(&world, "char-1", "Alice", 0).await;
    join(&world, "char-2", "Bob", 0).await;
    grant_credits(&world, "char-1", 1_000).await;
    grant_credits(&world, "char-2", 1_000).await;

    let world_a = world.clone();
    let a = tokio::spawn(async move {
        credits::transfer_credits(&world_a, credits::TransferCreditsParams { character_id: "char-1".to_string(), target_character_id: "char-2".to_string(), amount: 300 }).await
    });
    let world_b = world.clone();
    let b = tokio::spawn(async move {
        credits::transfer_credits(&world_b, credits::TransferCreditsParams { character_id: "char-2".to_string(), target_character_id: "char-1".to_string(), amount: 150 }).await
    });

    let (ra, rb) = tokio::join!(a, b);
    ra.unwrap().unwrap();
    rb.unwrap().unwrap();

    let char1 = world.repository.get_character("char-1").await.unwrap().unwrap();
    let char2 = world.repository.get_character("char-2").await.unwrap().unwrap();
    assert_eq!(char1.total_credits() + char2.total_credits(), 2_000);
    assert_eq!(char1.credits_on_hand, 850);
    assert_eq!(char2.credits_on_hand, 1_150);
}

/// S6 — pausing a subscription buffers events instead of dropping them;
/// resuming flushes exactly what was missed, in order, with no duplicates.
#[tokio::test]
async fn s6_pause_then_resume_delivers_buffered_events_once() {
    let world = test_world();
    join(&world, "char-1", "Alice", 0).await;
    grant_credits(&world, "char-1", 1_000).await;

    let mut handle = subscription_cmds::subscribe_my_messages(
        &world,
        subscription_cmds::SubscribeMyMessagesParams { character_id: "char-1".to_string(), admin_password: None },
    )
    .unwrap();

    subscription_cmds::pause_event_delivery(&world, subscription_cmds::PauseEventDeliveryParams { character_id: "char-1".to_string() }).unwrap();

    // A scout ship starts fully warp-charged, so warp recharge has no
    // headroom right after `join`; two trades (each firing a character-scoped
    // `trade.executed` plus a sector-scoped `port.update`) exercise the same
    // buffering path without fighting that cap.
    trade::trade(&world, trade::TradeParams { character_id: "char-1".to_string(), commodity: "ore".to_string(), units: 5, side: trade::TradeSide::Buy }).await.unwrap();
    trade::trade(&world, trade::TradeParams { character_id: "char-1".to_string(), commodity: "fuel".to_string(), units: 2, side: trade::TradeSide::Buy }).await.unwrap();

    assert!(handle.rx.try_recv().is_err(), "events must be buffered while paused");

    subscription_cmds::resume_event_delivery(&world, subscription_cmds::ResumeEventDeliveryParams { character_id: "char-1".to_string() }).unwrap();

    let first = handle.rx.recv().await.unwrap();
    assert_eq!(first.event_name, sector_core::wire::event_names::TRADE_EXECUTED);
    assert_eq!(first.payload["commodity"], "ore");
    let second = handle.rx.recv().await.unwrap();
    assert_eq!(second.event_name, sector_core::wire::event_names::PORT_UPDATE);
    let third = handle.rx.recv().await.unwrap();
    assert_eq!(third.event_name, sector_core::wire::event_names::TRADE_EXECUTED);
    assert_eq!(third.payload["commodity"], "fuel");
    let fourth = handle.rx.recv().await.unwrap();
    assert_eq!(fourth.event_name, sector_core::wire::event_names::PORT_UPDATE);
    assert!(handle.rx.try_recv().is_err(), "nothing should be delivered twice");
}

/// P1 — a chain of credit transfers among three characters never changes
/// the sum of every character's total credits, regardless of ordering.
#[tokio::test]
async fn p1_credit_transfers_conserve_total_supply() {
    let world = test_world();
    for (id, name) in [("char-1", "A"), ("char-2", "B"), ("char-3", "C")] {
        join(&world, id, name, 0).await;
        grant_credits(&world, id, 500).await;
    }

    credits::transfer_credits(&world, credits::TransferCreditsParams { character_id: "char-1".to_string(), target_character_id: "char-2".to_string(), amount: 200 }).await.unwrap();
    credits::transfer_credits(&world, credits::TransferCreditsParams { character_id: "char-2".to_string(), target_character_id: "char-3".to_string(), amount: 350 }).await.unwrap();
    credits::transfer_credits(&world, credits::TransferCreditsParams { character_id: "char-3".to_string(), target_character_id: "char-1".to_string(), amount: 10 }).await.unwrap();

    let mut total = 0;
    for id in ["char-1", "char-2", "char-3"] {
        total += world.repository.get_character(id).await.unwrap().unwrap().total_credits();
    }
    assert_eq!(total, 1_500);
}

/// Admin termination resets `combat_active` the same way natural
/// resolution does, exercised here against a bare `CombatManager`
/// constructed directly (not through `World`) to confirm the flag-reset
/// responsibility lives entirely on `CombatManager` itself.
#[tokio::test]
async fn combat_manager_admin_terminate_resets_combat_flag() {
    let locks = Arc::new(LockManager::new());
    let hub = Arc::new(SubscriptionHub::new());
    let bus = Arc::new(EventBus::new(hub));
    let sector_index = Arc::new(SectorIndex::new());
    let repository: Arc<dyn WorldRepository> = Arc::new(sector_core::repository::InMemoryWorldRepository::new());
    let reference_data: Arc<dyn sector_core::reference_data::ReferenceData> = Arc::new(StaticReferenceData::new(ring_adjacency(10)));
    let manager = CombatManager::new(locks, bus, sector_index.clone(), repository, reference_data);
    let config = test_config();

    struct NullResolver;
    impl sector_core::event_bus::FilterResolver for NullResolver {
        fn resolve(&self, _filter: &sector_core::models::event::EventFilter) -> (Vec<String>, bool) {
            (Vec::new(), false)
        }
    }

    let combatants = vec![
        Combatant {
            combatant_id: "char-1".to_string(),
            kind: CombatantKind::Character,
            name: "Alice".to_string(),
            fighters: 10,
            shields: 10,
            max_fighters: 10,
            max_shields: 10,
            owner_character_id: Some("char-1".to_string()),
            fleeing: false,
            garrison_mode: None,
        },
        Combatant {
            combatant_id: "char-2".to_string(),
            kind: CombatantKind::Character,
            name: "Bob".to_string(),
            fighters: 10,
            shields: 10,
            max_fighters: 10,
            max_shields: 10,
            owner_character_id: Some("char-2".to_string()),
            fleeing: false,
            garrison_mode: None,
        },
    ];
    let encounter = manager.start_encounter(9, &"char-1".to_string(), combatants, vec![], "manual", &config, &NullResolver).await.unwrap();
    let combat_id = encounter.lock().await.combat_id.clone();
    assert!(sector_index.snapshot(9).combat_active);

    manager.admin_terminate(&combat_id, &NullResolver).await.unwrap();
    assert!(!sector_index.snapshot(9).combat_active);
}
