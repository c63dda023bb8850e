use std::sync::Arc;
use std::time::Duration as StdDuration;

use tokio::time::interval;

use crate::combat::CombatManager;
use crate::config::Config;
use crate::event_bus::FilterResolver;

/// Background sweep that resolves combat rounds whose deadline has passed
/// without every participant submitting an action (spec.md §4.9). Runs as
/// a single `tokio::spawn`ed loop on `deadline_poll_interval_seconds`,
/// mirroring the teacher's pattern of a lone interval-driven task per
/// concern rather than a generic scheduler abstraction.
pub struct DeadlineScheduler {
    combat: Arc<CombatManager>,
}

impl DeadlineScheduler {
    pub fn new(combat: Arc<CombatManager>) -> Self {
        Self { combat }
    }

    /// Runs forever; intended to be spawned once at process start and
    /// dropped (aborted) at shutdown alongside the rest of the runtime.
    pub async fn run(&self, config: &'static Config, resolver: Arc<dyn FilterResolver>) {
        let mut ticker = interval(StdDuration::from_secs(config.deadline_poll_interval_seconds.max(1)));
        loop {
            ticker.tick().await;
            self.combat.sweep_expired(config, resolver.as_ref()).await;
        }
    }
}
