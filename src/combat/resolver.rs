use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use uuid::Uuid;

use crate::config::Config;
use crate::models::character::{CharacterId, SectorId};
use crate::models::combat::{Action, ActionKind, CombatantId, CombatantKind, Encounter, EncounterResult};
use crate::models::salvage::{SalvageContainer, SalvageSource};

/// A combatant whose flee action succeeded this round: removed from the
/// encounter already, but still owed a sector move and a warp power charge
/// against their actual ship (resolver has no repository access, so the
/// caller applies these).
pub struct FledCombatant {
    pub combatant_id: CombatantId,
    pub owner_character_id: Option<CharacterId>,
    pub destination_sector: SectorId,
}

/// A character combatant destroyed this round: converted to an escape pod
/// in the encounter already, paired with the salvage container that should
/// receive their ship's cargo.
pub struct DestroyedCombatant {
    pub combatant_id: CombatantId,
    pub owner_character_id: Option<CharacterId>,
    pub salvage_id: String,
}

/// Outcome of resolving one round: the event payload to emit, plus the
/// flag telling the caller whether `combat.ended` (vs `combat.round_waiting`)
/// is the right follow-up event.
pub struct RoundOutcome {
    pub round_resolved_payload: serde_json::Value,
    pub ended: bool,
    pub new_salvage: Vec<SalvageContainer>,
    pub fled: Vec<FledCombatant>,
    pub destroyed: Vec<DestroyedCombatant>,
}

/// `DefaultHasher` is stable across calls within one build of one Rust
/// version, which is all the reproducibility guarantee requires: the same
/// `(combat_id, round, attacker, target)` tuple hashed twice in the same
/// process/binary always seeds the same roll.
fn seeded_rng(combat_id: &str, round: u32, attacker: &str, target: &str) -> StdRng {
    let mut hasher = DefaultHasher::new();
    combat_id.hash(&mut hasher);
    round.hash(&mut hasher);
    attacker.hash(&mut hasher);
    target.hash(&mut hasher);
    StdRng::seed_from_u64(hasher.finish())
}

pub struct RoundResolver;

impl RoundResolver {
    /// Executes spec steps 1-7 against `encounter` in place, returning the
    /// payload to emit. Callers must already hold the encounter's
    /// `combat:<sector_id>` lock.
    pub fn resolve(encounter: &mut Encounter, config: &Config, is_first_round: bool) -> RoundOutcome {
        Self::normalize_actions(encounter, config);
        if !is_first_round {
            Self::recharge_shields(encounter, config);
        }

        let fighters_before: BTreeMap<CombatantId, i64> =
            encounter.participants.iter().map(|(id, c)| (id.clone(), c.fighters)).collect();
        let shields_before: BTreeMap<CombatantId, i64> =
            encounter.participants.iter().map(|(id, c)| (id.clone(), c.shields)).collect();

        let (flee_results, fled) = Self::resolve_flees(encounter, config);
        Self::apply_damage(encounter);

        let (new_salvage, destroyed) = Self::convert_destroyed_to_salvage(encounter);

        let ended_by_share = encounter.all_live_share_owner() || encounter.live_participants().count() <= 1;
        if ended_by_share && encounter.result.is_none() {
            encounter.result = Some(EncounterResult::SideDefeated);
        }

        let participants_payload: BTreeMap<&CombatantId, serde_json::Value> = encounter
            .participants
            .iter()
            .map(|(id, c)| {
                (
                    id,
                    json!({
                        "fightersBefore": fighters_before.get(id).copied().unwrap_or(0),
                        "fightersAfter": c.fighters,
                        "shieldsBefore": shields_before.get(id).copied().unwrap_or(0),
                        "shieldsAfter": c.shields,
                        "fighterLoss": fighters_before.get(id).copied().unwrap_or(0) - c.fighters,
                        "shieldDamage": shields_before.get(id).copied().unwrap_or(0) - c.shields,
                    }),
                )
            })
            .collect();

        let actions_payload: BTreeMap<&CombatantId, &Action> = encounter.pending_actions.iter().collect();

        let payload = json!({
            "combatId": encounter.combat_id,
            "sectorId": encounter.sector_id,
            "round": encounter.round,
            "participants": participants_payload,
            "actions": actions_payload,
            "fleeResults": flee_results,
            "newSalvage": new_salvage,
        });

        let ended = encounter.result.is_some();
        if !ended {
            encounter.round += 1;
            encounter.deadline = Utc::now() + Duration::seconds(config.round_window_seconds as i64);
        }
        encounter.pending_actions.clear();

        RoundOutcome { round_resolved_payload: payload, ended, new_salvage, fled, destroyed }
    }

    /// Step 1: fills in missing actions, including garrison AI per mode.
    fn normalize_actions(encounter: &mut Encounter, config: &Config) {
        let live_ids: Vec<CombatantId> = encounter.live_participants().map(|(id, _)| id.clone()).collect();

        for id in &live_ids {
            if encounter.pending_actions.contains_key(id) {
                continue;
            }
            let combatant = encounter.participants.get(id).unwrap();
            let action = match combatant.kind {
                CombatantKind::Garrison => Self::garrison_action(encounter, id, config),
                _ => Action::brace(),
            };
            encounter.pending_actions.insert(id.clone(), action);
        }
    }

    fn garrison_action(encounter: &Encounter, garrison_id: &str, config: &Config) -> Action {
        use crate::models::garrison::GarrisonMode;

        let garrison = encounter.participants.get(garrison_id).unwrap();
        let owner = garrison.owner_character_id.clone();
        let mode = garrison.garrison_mode.unwrap_or(GarrisonMode::Defensive);

        let opponents: Vec<&crate::models::combat::Combatant> = encounter
            .live_participants()
            .map(|(_, c)| c)
            .filter(|c| c.owner_character_id != owner)
            .collect();

        let attacked_this_round = encounter.pending_actions.values().any(|a| {
            matches!(a.kind, ActionKind::Attack) && a.target_id.as_deref() == Some(garrison_id)
        });

        if mode == GarrisonMode::Offensive {
            if let Some(target) = opponents.iter().max_by_key(|c| c.fighters) {
                let commit = garrison.fighters.min(config.garrison_offensive_burst);
                return Action::attack(target.combatant_id.clone(), commit);
            }
            return Action::brace();
        }

        if mode == GarrisonMode::Toll {
            if opponents.len() == 1 {
                let target = opponents[0];
                let commit = garrison.fighters.min(config.garrison_offensive_burst);
                return Action::attack(target.combatant_id.clone(), commit);
            }
            return Action::brace();
        }

        // Defensive (the default mode): brace unless attacked this round.
        if attacked_this_round {
            if let Some(attacker_id) = encounter.pending_actions.iter().find_map(|(id, a)| {
                (matches!(a.kind, ActionKind::Attack) && a.target_id.as_deref() == Some(garrison_id)).then(|| id.clone())
            }) {
                return Action::attack(attacker_id, garrison.fighters);
            }
        }
        Action::brace()
    }

    /// Step 2: shield recharge, skipped on the encounter's first round.
    fn recharge_shields(encounter: &mut Encounter, config: &Config) {
        for combatant in encounter.participants.values_mut() {
            if combatant.shields < combatant.max_shields {
                let missing = combatant.max_shields - combatant.shields;
                let gain = (missing * config.shield_recharge_percent) / 100;
                combatant.shields = (combatant.shields + gain.max(1)).min(combatant.max_shields);
            }
        }
    }

    /// Step 4: resolves flee actions before the damage phase: successful
    /// flees leave the encounter immediately; failed ones downgrade to
    /// brace for the damage phase that follows.
    fn resolve_flees(encounter: &mut Encounter, _config: &Config) -> (serde_json::Value, Vec<FledCombatant>) {
        let mut results = Vec::new();
        let mut fled = Vec::new();
        let flee_ids: Vec<CombatantId> = encounter
            .pending_actions
            .iter()
            .filter(|(_, a)| matches!(a.kind, ActionKind::Flee))
            .map(|(id, _)| id.clone())
            .collect();

        for id in flee_ids {
            let warp_power_factor = 0.1;
            let threat_factor = {
                let live_count = encounter.live_participants().count() as f64;
                (live_count - 1.0).max(0.0) * 0.05
            };
            let p = (0.5_f64 + warp_power_factor - threat_factor).clamp(0.0, 1.0);

            let destination = encounter.pending_actions.get(&id).and_then(|a| a.destination_sector);
            let mut rng = seeded_rng(&encounter.combat_id, encounter.round, &id, "flee");
            let roll: f64 = rng.random();
            let succeeded = roll < p && destination.is_some();

            if succeeded {
                if let Some(combatant) = encounter.participants.remove(&id) {
                    fled.push(FledCombatant {
                        combatant_id: id.clone(),
                        owner_character_id: combatant.owner_character_id,
                        destination_sector: destination.expect("succeeded implies a destination was set"),
                    });
                }
                encounter.pending_actions.remove(&id);
            } else if let Some(action) = encounter.pending_actions.get_mut(&id) {
                *action = Action::brace();
                if let Some(c) = encounter.participants.get_mut(&id) {
                    c.fleeing = false;
                }
            }

            results.push(json!({ "combatantId": id, "succeeded": succeeded, "probability": p }));
        }

        (json!(results), fled)
    }

    /// Step 3: damage computation for every normalized `attack` action.
    fn apply_damage(encounter: &mut Encounter) {
        let attacks: Vec<(CombatantId, CombatantId, i64)> = encounter
            .pending_actions
            .iter()
            .filter_map(|(attacker, action)| {
                if matches!(action.kind, ActionKind::Attack) {
                    action.target_id.clone().map(|target| (attacker.clone(), target, action.commit))
                } else {
                    None
                }
            })
            .collect();

        for (attacker_id, target_id, commit) in attacks {
            if !encounter.participants.contains_key(&attacker_id) || !encounter.participants.contains_key(&target_id) {
                continue;
            }
            let target_bracing = encounter
                .pending_actions
                .get(&target_id)
                .map(|a| matches!(a.kind, ActionKind::Brace))
                .unwrap_or(false);
            let target_fleeing = encounter.participants.get(&target_id).map(|c| c.fleeing).unwrap_or(false);

            let mut rng = seeded_rng(&encounter.combat_id, encounter.round, &attacker_id, &target_id);
            let roll: f64 = rng.random_range(0.6..1.0);

            let target_shields_before = encounter.participants.get(&target_id).map(|c| c.shields).unwrap_or(0);
            let shield_factor = 1.0 - (target_shields_before as f64 / 1000.0).min(0.5);
            let mut raw_damage = (commit as f64 * roll * shield_factor) as i64;

            if target_fleeing {
                raw_damage = (raw_damage as f64 * 0.5) as i64;
            }
            if target_bracing {
                raw_damage = (raw_damage as f64 * 0.5) as i64;
            }

            let shield_damage = raw_damage.min(target_shields_before);
            let overflow = raw_damage - shield_damage;
            let fighter_loss = if target_bracing { overflow / 2 } else { overflow };

            if let Some(target) = encounter.participants.get_mut(&target_id) {
                target.shields = (target.shields - shield_damage).max(0);
                target.fighters = (target.fighters - fighter_loss).max(0);
            }

            // Attacking costs the attacker no fighters directly (fighters
            // are the committed weapon capacity, not expended on use) —
            // only defenders take losses, matching spec.md §4.7 step 3.
            let _ = attacker_id;
        }
    }

    /// Step 5: destroyed character combatants become escape pods and dump
    /// their cargo into a new salvage container; destroyed garrisons are
    /// simply removed.
    fn convert_destroyed_to_salvage(encounter: &mut Encounter) -> (Vec<SalvageContainer>, Vec<DestroyedCombatant>) {
        let mut created = Vec::new();
        let mut destroyed_combatants = Vec::new();
        let destroyed: Vec<CombatantId> = encounter
            .participants
            .iter()
            .filter(|(_, c)| c.is_defeated())
            .map(|(id, _)| id.clone())
            .collect();

        for id in destroyed {
            let Some(combatant) = encounter.participants.get(&id).cloned() else { continue };
            match combatant.kind {
                CombatantKind::Garrison => {
                    encounter.participants.remove(&id);
                }
                CombatantKind::Character | CombatantKind::EscapePod => {
                    let salvage = SalvageContainer {
                        salvage_id: Uuid::new_v4().to_string(),
                        sector_id: encounter.sector_id,
                        // Cargo is filled in by the caller, which has the
                        // repository access needed to load the defeated
                        // ship's actual contents before it's emptied.
                        cargo: BTreeMap::new(),
                        scrap: combatant.max_fighters / 10,
                        credits: 0,
                        expires_at: Utc::now() + Duration::hours(1),
                        source: SalvageSource {
                            ship_name: combatant.name.clone(),
                            ship_type: "unknown".to_string(),
                        },
                    };
                    created.push(salvage.clone());
                    encounter.salvage.push(salvage.clone());
                    destroyed_combatants.push(DestroyedCombatant {
                        combatant_id: id.clone(),
                        owner_character_id: combatant.owner_character_id.clone(),
                        salvage_id: salvage.salvage_id.clone(),
                    });

                    if let Some(c) = encounter.participants.get_mut(&id) {
                        c.kind = CombatantKind::EscapePod;
                        c.fighters = 0;
                        c.shields = 0;
                    }
                }
            }
        }
        (created, destroyed_combatants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::combat::{Combatant, CombatantKind, EncounterContext};
    use std::collections::BTreeMap;

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

    fn encounter_with(a_fighters: i64, b_fighters: i64) -> Encounter {
        let mut participants = BTreeMap::new();
        participants.insert(
            "char-a".to_string(),
            Combatant {
                combatant_id: "char-a".to_string(),
                kind: CombatantKind::Character,
                name: "Alice".to_string(),
                fighters: a_fighters,
                shields: 50,
                max_fighters: 200,
                max_shields: 50,
                owner_character_id: Some("char-a".to_string()),
                fleeing: false,
                garrison_mode: None,
            },
        );
        participants.insert(
            "char-b".to_string(),
            Combatant {
                combatant_id: "char-b".to_string(),
                kind: CombatantKind::Character,
                name: "Bob".to_string(),
                fighters: b_fighters,
                shields: 50,
                max_fighters: 200,
                max_shields: 50,
                owner_character_id: Some("char-b".to_string()),
                fleeing: false,
                garrison_mode: None,
            },
        );
        Encounter {
            combat_id: "combat-1".to_string(),
            sector_id: 1,
            round: 1,
            participants,
            deadline: Utc::now(),
            context: EncounterContext::default(),
            pending_actions: BTreeMap::new(),
            result: None,
            salvage: Vec::new(),
        }
    }

    #[test]
    fn same_inputs_produce_same_damage_roll() {
        let mut rng1 = seeded_rng("combat-1", 1, "char-a", "char-b");
        let mut rng2 = seeded_rng("combat-1", 1, "char-a", "char-b");
        let a: f64 = rng1.random();
        let b: f64 = rng2.random();
        assert_eq!(a, b);
    }

    #[test]
    fn mutual_brace_does_not_end_combat() {
        let mut encounter = encounter_with(100, 100);
        encounter.pending_actions.insert("char-a".to_string(), Action::brace());
        encounter.pending_actions.insert("char-b".to_string(), Action::brace());
        let config = test_config();
        let outcome = RoundResolver::resolve(&mut encounter, &config, true);
        assert!(!outcome.ended);
        assert_eq!(encounter.round, 2);
    }

    #[test]
    fn destroyed_combatant_becomes_escape_pod_and_ends_combat() {
        let mut encounter = encounter_with(1, 100);
        encounter.participants.get_mut("char-a").unwrap().shields = 0;
        encounter.pending_actions.insert("char-a".to_string(), Action::brace());
        encounter.pending_actions.insert("char-b".to_string(), Action::attack("char-a".to_string(), 200));
        let config = test_config();
        let outcome = RoundResolver::resolve(&mut encounter, &config, true);

        assert!(outcome.ended);
        assert_eq!(encounter.participants.get("char-a").unwrap().kind, CombatantKind::EscapePod);
        assert_eq!(outcome.new_salvage.len(), 1);
    }
}
