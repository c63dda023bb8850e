use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::CoreResult;
use crate::world::World;

#[derive(Debug, Deserialize)]
pub struct AdminTerminateCombatParams {
    pub admin_password: String,
    pub combat_id: String,
}

pub async fn admin_terminate_combat(world: &World, params: AdminTerminateCombatParams) -> CoreResult<Value> {
    world.authorize_admin(Some(&params.admin_password))?;
    world.combat.admin_terminate(&params.combat_id, world).await?;
    Ok(json!({ "combatId": params.combat_id, "terminated": true }))
}

#[derive(Debug, Deserialize)]
pub struct TestResetParams {
    pub admin_password: String,
}

/// Wipes all in-memory state so a test harness can start from a clean
/// world without restarting the process. Only meaningful against
/// `InMemoryWorldRepository` and gated behind the `test-reset` feature —
/// a production deployment should not compile this command in at all
/// (spec.md §9 REDESIGN FLAGS: "test-only admin surfaces must not ship in
/// the production binary").
#[cfg(feature = "test-reset")]
pub async fn test_reset(world: &World, params: TestResetParams) -> CoreResult<Value> {
    world.authorize_admin(Some(&params.admin_password))?;
    world.repository.reset_all().await?;
    Ok(json!({ "reset": true }))
}
