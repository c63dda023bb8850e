use std::sync::Arc;

use crate::combat::CombatManager;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::event_bus::{EventBus, FilterResolver};
use crate::knowledge::KnowledgeStore;
use crate::lock_manager::LockManager;
use crate::models::character::CharacterId;
use crate::models::event::EventFilter;
use crate::reference_data::ReferenceData;
use crate::repository::{InMemoryWorldRepository, WorldRepository};
use crate::sector_index::SectorIndex;
use crate::subscription_hub::SubscriptionHub;

/// Composition root: everything the dispatcher needs to execute a command
/// lives behind one `World` (spec.md §9 REDESIGN FLAGS — "explicit `World`
/// struct instead of a global mutable object").
pub struct World {
    pub repository: Arc<dyn WorldRepository>,
    pub locks: Arc<LockManager>,
    pub event_bus: Arc<EventBus>,
    pub hub: Arc<SubscriptionHub>,
    pub sector_index: Arc<SectorIndex>,
    pub combat: Arc<CombatManager>,
    pub knowledge: Arc<KnowledgeStore>,
    pub reference_data: Arc<dyn ReferenceData>,
    pub config: &'static Config,
}

impl World {
    pub fn new(repository: Arc<dyn WorldRepository>, reference_data: Arc<dyn ReferenceData>, config: &'static Config) -> Self {
        let locks = Arc::new(LockManager::new());
        let hub = Arc::new(SubscriptionHub::new());
        let event_bus = Arc::new(EventBus::new(hub.clone()));
        let sector_index = Arc::new(SectorIndex::new());
        let combat = Arc::new(CombatManager::new(locks.clone(), event_bus.clone(), sector_index.clone(), repository.clone(), reference_data.clone()));
        Self {
            repository,
            locks,
            event_bus,
            hub,
            sector_index,
            combat,
            knowledge: Arc::new(KnowledgeStore::new()),
            reference_data,
            config,
        }
    }

    /// Convenience constructor for tests and single-process deployments
    /// with no durability requirement.
    pub fn new_in_memory(reference_data: Arc<dyn ReferenceData>, config: &'static Config) -> Self {
        Self::new(Arc::new(InMemoryWorldRepository::new()), reference_data, config)
    }

    /// `actor == character`, or `actor` is a member of the corporation that
    /// owns `character`'s ship, or admin credentials are supplied and
    /// valid — spec.md §4.8 step 2.
    pub async fn authorize(&self, actor_character_id: &str, target_character_id: &str) -> CoreResult<()> {
        if actor_character_id == target_character_id {
            return Ok(());
        }
        let target = self
            .repository
            .get_character(target_character_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("character '{target_character_id}' not found")))?;

        if let Some(corp_id) = &target.corporation_id {
            let corp = self.repository.get_corporation(corp_id).await?;
            if let Some(corp) = corp {
                if corp.members.contains(actor_character_id) {
                    return Ok(());
                }
            }
        }
        Err(CoreError::Authorization(format!("'{actor_character_id}' may not act for '{target_character_id}'")))
    }

    pub fn authorize_admin(&self, supplied_password: Option<&str>) -> CoreResult<()> {
        match (&self.config.admin_password, supplied_password) {
            (Some(expected), Some(given)) if expected == given => Ok(()),
            (None, _) => Err(CoreError::Authorization("admin actions are disabled".to_string())),
            _ => Err(CoreError::Authorization("invalid admin credentials".to_string())),
        }
    }
}

/// `World` resolves event filters against its own live `SectorIndex` and
/// repository state, synchronously and without re-checking later (spec.md
/// §4.3). Resolution here is necessarily a blocking snapshot read — the
/// `SectorIndex`/`DashMap` reads behind it are lock-free.
impl FilterResolver for World {
    fn resolve(&self, filter: &EventFilter) -> (Vec<CharacterId>, bool) {
        match filter {
            EventFilter::CharacterList { ids } => (ids.clone(), false),
            EventFilter::SectorOccupants { sector_id, exclude } => {
                let snapshot = self.sector_index.snapshot(*sector_id);
                let mut ids: Vec<CharacterId> = snapshot.characters.iter().cloned().collect();
                if let Some(excluded) = exclude {
                    ids.retain(|id| id != excluded);
                }
                (ids, false)
            }
            EventFilter::CorporationMembers { corp_id } => {
                // Best-effort: corporation membership reads go through the
                // repository, which this synchronous call can't await; the
                // dispatcher resolves corp-member filters explicitly before
                // calling `emit` for those commands instead.
                let _ = corp_id;
                (Vec::new(), false)
            }
            EventFilter::AdminOnly => (Vec::new(), true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference_data::StaticReferenceData;
    use std::collections::BTreeMap;

    fn test_world() -> World {
        let reference_data = Arc::new(StaticReferenceData::new(BTreeMap::new()));
        World::new_in_memory(reference_data, &crate::config::CONFIG)
    }

    #[tokio::test]
    async fn authorize_allows_self_action() {
        let world = test_world();
        world.authorize("char-1", "char-1").await.unwrap();
    }

    #[tokio::test]
    async fn authorize_rejects_unrelated_actor() {
        let world = test_world();
        let character = crate::models::Character::new("char-2", "Bob", 1, "ship-2");
        world.repository.put_character(character).await.unwrap();

        let err = world.authorize("char-1", "char-2").await.unwrap_err();
        assert_eq!(err.status(), 403);
    }
}
