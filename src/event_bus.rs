use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::models::character::CharacterId;
use crate::models::event::{Event, EventFilter, EventFilterOrResolved};
use crate::subscription_hub::SubscriptionHub;

/// Resolves an `EventFilter` into the concrete set of recipient character
/// ids, against a caller-supplied snapshot. Kept as a trait so `EventBus`
/// doesn't need to know about `SectorIndex`/`World` internals directly
/// (spec.md §4.3: "filter resolution is synchronous against the state the
/// caller already holds").
pub trait FilterResolver {
    fn resolve(&self, filter: &EventFilter) -> (Vec<CharacterId>, bool);
}

/// Central fan-out point. Stamps every event with a monotonically
/// increasing `causal_sequence` and pushes it to each subscriber whose
/// resolved recipient set includes them (spec.md §4.3, §4.4).
pub struct EventBus {
    sequence: AtomicU64,
    hub: Arc<SubscriptionHub>,
}

impl EventBus {
    pub fn new(hub: Arc<SubscriptionHub>) -> Self {
        Self { sequence: AtomicU64::new(1), hub }
    }

    /// Resolves `event`'s filter against `resolver`, assigns the next
    /// sequence number, and fans it out to the subscription hub. Resolution
    /// happens here, once, synchronously: later changes in world state
    /// (e.g. a character leaving a sector) never retroactively change who
    /// received an already-emitted event.
    pub fn emit(&self, mut event: Event, resolver: &dyn FilterResolver) {
        let (recipients, admin_only) = match &event.filter {
            EventFilterOrResolved::Unresolved(holder) => resolver.resolve(&holder.0),
            EventFilterOrResolved::Resolved(ids, admin) => (ids.clone(), *admin),
            EventFilterOrResolved::None => (Vec::new(), false),
        };
        event.sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        event.filter = EventFilterOrResolved::Resolved(recipients.clone(), admin_only);

        self.hub.dispatch(event, &recipients, admin_only);
    }

    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedResolver {
        ids: Vec<CharacterId>,
    }
    impl FilterResolver for FixedResolver {
        fn resolve(&self, _filter: &EventFilter) -> (Vec<CharacterId>, bool) {
            (self.ids.clone(), false)
        }
    }

    #[tokio::test]
    async fn emit_assigns_increasing_sequence() {
        let hub = Arc::new(SubscriptionHub::new());
        let bus = EventBus::new(hub);
        let resolver = FixedResolver { ids: vec!["char-1".to_string()] };

        let e1 = Event::new("ship.moved", json!({"to": 2}), EventFilter::character_list(["char-1".to_string()]));
        let e2 = Event::new("ship.moved", json!({"to": 3}), EventFilter::character_list(["char-1".to_string()]));
        bus.emit(e1, &resolver);
        bus.emit(e2, &resolver);

        assert_eq!(bus.current_sequence(), 3);
    }
}
