use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::CoreResult;
use crate::models::character::{CharacterId, CorpId, ShipId};
use crate::models::{Character, Corporation, Garrison, SalvageContainer, Ship};

/// Durable storage seam (spec.md §4.1 "Repository"). `World` talks to
/// state only through this trait so the in-memory engine used by the test
/// scenarios and the Postgres-backed production engine are interchangeable,
/// mirroring how the teacher's `DbClient` sits behind the rest of the
/// codebase as the sole persistence boundary.
#[async_trait]
pub trait WorldRepository: Send + Sync {
    async fn get_character(&self, character_id: &str) -> CoreResult<Option<Character>>;
    async fn put_character(&self, character: Character) -> CoreResult<()>;
    async fn delete_character(&self, character_id: &str) -> CoreResult<()>;
    async fn list_characters(&self) -> CoreResult<Vec<Character>>;

    async fn get_ship(&self, ship_id: &str) -> CoreResult<Option<Ship>>;
    async fn put_ship(&self, ship: Ship) -> CoreResult<()>;
    async fn delete_ship(&self, ship_id: &str) -> CoreResult<()>;
    async fn list_ships(&self) -> CoreResult<Vec<Ship>>;

    async fn get_corporation(&self, corp_id: &str) -> CoreResult<Option<Corporation>>;
    async fn put_corporation(&self, corp: Corporation) -> CoreResult<()>;
    async fn list_corporations(&self) -> CoreResult<Vec<Corporation>>;

    async fn get_garrison(&self, sector_id: i64) -> CoreResult<Option<Garrison>>;
    async fn put_garrison(&self, garrison: Garrison) -> CoreResult<()>;
    async fn delete_garrison(&self, sector_id: i64) -> CoreResult<()>;

    async fn put_salvage(&self, salvage: SalvageContainer) -> CoreResult<()>;
    async fn delete_salvage(&self, salvage_id: &str) -> CoreResult<()>;
    async fn list_salvage_in_sector(&self, sector_id: i64) -> CoreResult<Vec<SalvageContainer>>;

    /// Wipes every entity. Only ever called from the `test-reset`-gated
    /// admin command; a production `PgWorldRepository` may choose to
    /// implement this as `TRUNCATE` or simply return an error.
    async fn reset_all(&self) -> CoreResult<()>;
}

/// dashmap-backed implementation, the default engine for tests and for a
/// single-process deployment with no durability requirement. Generalized
/// from the teacher's extensive use of `DashMap` as the in-process
/// concurrent map of choice throughout its own controller and database
/// layers.
#[derive(Default)]
pub struct InMemoryWorldRepository {
    characters: DashMap<CharacterId, Character>,
    ships: DashMap<ShipId, Ship>,
    corporations: DashMap<CorpId, Corporation>,
    garrisons: DashMap<i64, Garrison>,
    salvage: DashMap<String, SalvageContainer>,
}

impl InMemoryWorldRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorldRepository for InMemoryWorldRepository {
    async fn get_character(&self, character_id: &str) -> CoreResult<Option<Character>> {
        Ok(self.characters.get(character_id).map(|r| r.clone()))
    }

    async fn put_character(&self, character: Character) -> CoreResult<()> {
        self.characters.insert(character.character_id.clone(), character);
        Ok(())
    }

    async fn delete_character(&self, character_id: &str) -> CoreResult<()> {
        self.characters.remove(character_id);
        Ok(())
    }

    async fn list_characters(&self) -> CoreResult<Vec<Character>> {
        Ok(self.characters.iter().map(|r| r.clone()).collect())
    }

    async fn get_ship(&self, ship_id: &str) -> CoreResult<Option<Ship>> {
        Ok(self.ships.get(ship_id).map(|r| r.clone()))
    }

    async fn put_ship(&self, ship: Ship) -> CoreResult<()> {
        self.ships.insert(ship.ship_id.clone(), ship);
        Ok(())
    }

    async fn delete_ship(&self, ship_id: &str) -> CoreResult<()> {
        self.ships.remove(ship_id);
        Ok(())
    }

    async fn list_ships(&self) -> CoreResult<Vec<Ship>> {
        Ok(self.ships.iter().map(|r| r.clone()).collect())
    }

    async fn get_corporation(&self, corp_id: &str) -> CoreResult<Option<Corporation>> {
        Ok(self.corporations.get(corp_id).map(|r| r.clone()))
    }

    async fn put_corporation(&self, corp: Corporation) -> CoreResult<()> {
        self.corporations.insert(corp.corp_id.clone(), corp);
        Ok(())
    }

    async fn list_corporations(&self) -> CoreResult<Vec<Corporation>> {
        Ok(self.corporations.iter().map(|r| r.clone()).collect())
    }

    async fn get_garrison(&self, sector_id: i64) -> CoreResult<Option<Garrison>> {
        Ok(self.garrisons.get(&sector_id).map(|r| r.clone()))
    }

    async fn put_garrison(&self, garrison: Garrison) -> CoreResult<()> {
        self.garrisons.insert(garrison.sector_id, garrison);
        Ok(())
    }

    async fn delete_garrison(&self, sector_id: i64) -> CoreResult<()> {
        self.garrisons.remove(&sector_id);
        Ok(())
    }

    async fn put_salvage(&self, salvage: SalvageContainer) -> CoreResult<()> {
        self.salvage.insert(salvage.salvage_id.clone(), salvage);
        Ok(())
    }

    async fn delete_salvage(&self, salvage_id: &str) -> CoreResult<()> {
        self.salvage.remove(salvage_id);
        Ok(())
    }

    async fn list_salvage_in_sector(&self, sector_id: i64) -> CoreResult<Vec<SalvageContainer>> {
        Ok(self
            .salvage
            .iter()
            .filter(|r| r.sector_id == sector_id)
            .map(|r| r.clone())
            .collect())
    }

    async fn reset_all(&self) -> CoreResult<()> {
        self.characters.clear();
        self.ships.clear();
        self.corporations.clear();
        self.garrisons.clear();
        self.salvage.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let repo = InMemoryWorldRepository::new();
        let character = Character::new("char-1", "Ripley", 1, "ship-1");
        repo.put_character(character.clone()).await.unwrap();

        let loaded = repo.get_character("char-1").await.unwrap().unwrap();
        assert_eq!(loaded.name, "Ripley");

        repo.delete_character("char-1").await.unwrap();
        assert!(repo.get_character("char-1").await.unwrap().is_none());
    }
}
