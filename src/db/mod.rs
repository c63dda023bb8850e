//! Postgres-backed `WorldRepository` (spec.md §4.1 "Repository", durable
//! engine). Grounded directly on the teacher's `database::DbClient`:
//! connection pool setup, the health check on construction, and the
//! generic `get_value<T>`/`set_value<T>` JSON-blob pattern against a single
//! lookup table. The core's entities don't need a relational schema —
//! every row is addressed by a string key and stored as a `jsonb` blob, so
//! `PgWorldRepository` carries that pattern forward rather than growing a
//! bespoke table per entity.
//!
//! Keys are namespaced by entity kind (`character/<id>`, `ship/<id>`, ...).
//! List operations (`list_characters`, `list_ships`, ...) need an index
//! since `generic_lookup` has no secondary index to scan by prefix; each
//! entity kind that's listed keeps a small `idx:<kind>` key holding the set
//! of ids, updated alongside every put/delete.

use std::collections::BTreeSet;

use async_trait::async_trait;
use diesel::sql_types::Integer;
use diesel::ExpressionMethods as _;
use diesel::OptionalExtension as _;
use diesel::QueryDsl as _;
use diesel::QueryableByName;
use diesel_async::pooled_connection::deadpool::{Object, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_async::RunQueryDsl as _;
use log::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::models::{Character, Corporation, Garrison, SalvageContainer, Ship};
use crate::repository::WorldRepository;
use crate::schema::generic_lookup;

const IDX_CHARACTERS: &str = "idx:characters";
const IDX_SHIPS: &str = "idx:ships";
const IDX_CORPORATIONS: &str = "idx:corporations";

fn character_key(id: &str) -> String {
    format!("character/{id}")
}
fn ship_key(id: &str) -> String {
    format!("ship/{id}")
}
fn corporation_key(id: &str) -> String {
    format!("corporation/{id}")
}
fn garrison_key(sector_id: i64) -> String {
    format!("garrison/{sector_id}")
}
fn salvage_key(id: &str) -> String {
    format!("salvage/{id}")
}
fn salvage_index_key(sector_id: i64) -> String {
    format!("idx:salvage/{sector_id}")
}

#[derive(Clone)]
pub struct PgWorldRepository {
    db: Pool<AsyncPgConnection>,
}

impl PgWorldRepository {
    pub async fn new() -> PgWorldRepository {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let db = {
            let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
            Pool::builder(manager).max_size(5).build().unwrap()
        };
        {
            let mut conn = db.get().await.unwrap();
            #[derive(QueryableByName)]
            struct Ret {
                #[diesel(sql_type = Integer)]
                value: i32,
            }
            let result: Vec<Ret> = diesel::sql_query("SELECT 1 as value")
                .load(&mut conn)
                .await
                .unwrap();
            assert_eq!(result.len(), 1);
            assert_eq!(result[0].value, 1);
            info!("Successfully connected to database");
        }
        PgWorldRepository { db }
    }

    async fn conn(&self) -> Object<AsyncPgConnection> {
        self.db
            .get()
            .await
            .expect("Timed out waiting for a database connection")
    }

    async fn get_value<T>(&self, key: &str) -> CoreResult<Option<T>>
    where
        T: Sized + DeserializeOwned,
    {
        debug!("db get: {}", key);
        let value_opt: Option<Value> = generic_lookup::table
            .select(generic_lookup::value)
            .filter(generic_lookup::key.eq(key))
            .first(&mut self.conn().await)
            .await
            .optional()
            .map_err(|e| CoreError::Unavailable(e.to_string()))?;
        value_opt
            .map(|data| serde_json::from_value(data).map_err(|e| CoreError::Internal(e.to_string())))
            .transpose()
    }

    async fn set_value<T>(&self, key: &str, value: &T) -> CoreResult<()>
    where
        T: Serialize + ?Sized,
    {
        debug!("db set: {}", key);
        let value = serde_json::to_value(value).map_err(|e| CoreError::Internal(e.to_string()))?;
        diesel::insert_into(generic_lookup::table)
            .values((
                generic_lookup::key.eq(key),
                generic_lookup::value.eq(&value),
                generic_lookup::updated_at.eq(chrono::Utc::now()),
            ))
            .on_conflict(generic_lookup::key)
            .do_update()
            .set((
                generic_lookup::value.eq(&value),
                generic_lookup::updated_at.eq(chrono::Utc::now()),
            ))
            .execute(&mut self.conn().await)
            .await
            .map_err(|e| CoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn delete_value(&self, key: &str) -> CoreResult<()> {
        debug!("db delete: {}", key);
        diesel::delete(generic_lookup::table.filter(generic_lookup::key.eq(key)))
            .execute(&mut self.conn().await)
            .await
            .map_err(|e| CoreError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn index_get(&self, index_key: &str) -> CoreResult<BTreeSet<String>> {
        Ok(self.get_value(index_key).await?.unwrap_or_default())
    }

    async fn index_add(&self, index_key: &str, id: &str) -> CoreResult<()> {
        let mut ids = self.index_get(index_key).await?;
        if ids.insert(id.to_string()) {
            self.set_value(index_key, &ids).await?;
        }
        Ok(())
    }

    async fn index_remove(&self, index_key: &str, id: &str) -> CoreResult<()> {
        let mut ids = self.index_get(index_key).await?;
        if ids.remove(id) {
            self.set_value(index_key, &ids).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl WorldRepository for PgWorldRepository {
    async fn get_character(&self, character_id: &str) -> CoreResult<Option<Character>> {
        self.get_value(&character_key(character_id)).await
    }

    async fn put_character(&self, character: Character) -> CoreResult<()> {
        self.index_add(IDX_CHARACTERS, &character.character_id).await?;
        self.set_value(&character_key(&character.character_id), &character).await
    }

    async fn delete_character(&self, character_id: &str) -> CoreResult<()> {
        self.index_remove(IDX_CHARACTERS, character_id).await?;
        self.delete_value(&character_key(character_id)).await
    }

    async fn list_characters(&self) -> CoreResult<Vec<Character>> {
        let ids = self.index_get(IDX_CHARACTERS).await?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(character) = self.get_value(&character_key(&id)).await? {
                out.push(character);
            }
        }
        Ok(out)
    }

    async fn get_ship(&self, ship_id: &str) -> CoreResult<Option<Ship>> {
        self.get_value(&ship_key(ship_id)).await
    }

    async fn put_ship(&self, ship: Ship) -> CoreResult<()> {
        self.index_add(IDX_SHIPS, &ship.ship_id).await?;
        self.set_value(&ship_key(&ship.ship_id), &ship).await
    }

    async fn delete_ship(&self, ship_id: &str) -> CoreResult<()> {
        self.index_remove(IDX_SHIPS, ship_id).await?;
        self.delete_value(&ship_key(ship_id)).await
    }

    async fn list_ships(&self) -> CoreResult<Vec<Ship>> {
        let ids = self.index_get(IDX_SHIPS).await?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(ship) = self.get_value(&ship_key(&id)).await? {
                out.push(ship);
            }
        }
        Ok(out)
    }

    async fn get_corporation(&self, corp_id: &str) -> CoreResult<Option<Corporation>> {
        self.get_value(&corporation_key(corp_id)).await
    }

    async fn put_corporation(&self, corp: Corporation) -> CoreResult<()> {
        self.index_add(IDX_CORPORATIONS, &corp.corp_id).await?;
        self.set_value(&corporation_key(&corp.corp_id), &corp).await
    }

    async fn list_corporations(&self) -> CoreResult<Vec<Corporation>> {
        let ids = self.index_get(IDX_CORPORATIONS).await?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(corp) = self.get_value(&corporation_key(&id)).await? {
                out.push(corp);
            }
        }
        Ok(out)
    }

    async fn get_garrison(&self, sector_id: i64) -> CoreResult<Option<Garrison>> {
        self.get_value(&garrison_key(sector_id)).await
    }

    async fn put_garrison(&self, garrison: Garrison) -> CoreResult<()> {
        self.set_value(&garrison_key(garrison.sector_id), &garrison).await
    }

    async fn delete_garrison(&self, sector_id: i64) -> CoreResult<()> {
        self.delete_value(&garrison_key(sector_id)).await
    }

    async fn put_salvage(&self, salvage: SalvageContainer) -> CoreResult<()> {
        self.index_add(&salvage_index_key(salvage.sector_id), &salvage.salvage_id).await?;
        self.set_value(&salvage_key(&salvage.salvage_id), &salvage).await
    }

    async fn delete_salvage(&self, salvage_id: &str) -> CoreResult<()> {
        if let Some(salvage) = self.get_value::<SalvageContainer>(&salvage_key(salvage_id)).await? {
            self.index_remove(&salvage_index_key(salvage.sector_id), salvage_id).await?;
        }
        self.delete_value(&salvage_key(salvage_id)).await
    }

    async fn list_salvage_in_sector(&self, sector_id: i64) -> CoreResult<Vec<SalvageContainer>> {
        let ids = self.index_get(&salvage_index_key(sector_id)).await?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(salvage) = self.get_value(&salvage_key(&id)).await? {
                out.push(salvage);
            }
        }
        Ok(out)
    }

    async fn reset_all(&self) -> CoreResult<()> {
        diesel::delete(generic_lookup::table)
            .execute(&mut self.conn().await)
            .await
            .map_err(|e| CoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}
