use std::env;
use std::sync::Arc;

use log::*;
use sector_core::config::CONFIG;
use sector_core::db::PgWorldRepository;
use sector_core::deadline_scheduler::DeadlineScheduler;
use sector_core::reference_data::{ring_adjacency, StaticReferenceData};
use sector_core::repository::{InMemoryWorldRepository, WorldRepository};
use sector_core::web_api_server::WebApiServer;
use sector_core::world::World;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    pretty_env_logger::init_timed();

    info!("Loaded config: {:?}", *CONFIG);

    let sector_count: i64 = env::var("SECTOR_COUNT").ok().and_then(|v| v.parse().ok()).unwrap_or(100);
    let reference_data = Arc::new(StaticReferenceData::new(ring_adjacency(sector_count)));

    let repository: Arc<dyn WorldRepository> = if env::var("DATABASE_URL").is_ok() {
        Arc::new(PgWorldRepository::new().await)
    } else {
        warn!("DATABASE_URL not set, running with an in-memory repository (no persistence across restarts)");
        Arc::new(InMemoryWorldRepository::new())
    };

    let world = Arc::new(World::new(repository, reference_data, &CONFIG));

    let scheduler = DeadlineScheduler::new(world.combat.clone());
    let scheduler_world = world.clone();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(&CONFIG, scheduler_world.clone()).await;
    });

    let server = WebApiServer::new(world);
    let server_handle = tokio::spawn(async move {
        server.run().await;
    });

    let _ = tokio::join!(scheduler_handle, server_handle);
}
