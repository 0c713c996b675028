use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};

use leadscout_common::types::ActivityEvent;
use leadscout_store::{DocStore, UserStore};

/// Per-user in-process queue capacity. A full queue drops the oldest event;
/// subscribers observe the gap as a lag and record an `error` activity.
pub const BUS_CAPACITY: usize = 1024;

/// Per-user activity fan-out.
///
/// `publish` appends the event to the user's durable activity collection and
/// then hands it to every in-process subscriber (WebSocket hub, webhook
/// dispatcher). Durability first: an event that reached a socket but missed
/// the store would be unrecoverable on reconnect.
pub struct ActivityBus {
    store: Arc<dyn DocStore>,
    channels: Mutex<HashMap<String, broadcast::Sender<ActivityEvent>>>,
    capacity: usize,
}

impl ActivityBus {
    pub fn new(store: Arc<dyn DocStore>) -> Self {
        Self::with_capacity(store, BUS_CAPACITY)
    }

    pub fn with_capacity(store: Arc<dyn DocStore>, capacity: usize) -> Self {
        Self {
            store,
            channels: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    pub fn store(&self) -> Arc<dyn DocStore> {
        self.store.clone()
    }

    /// Durable append + in-process fan-out, in that order.
    pub async fn publish(&self, event: ActivityEvent) -> Result<()> {
        let user = UserStore::new(self.store.clone(), &event.user_id);
        user.append_activity(&event).await?;

        let channels = self.channels.lock().await;
        if let Some(tx) = channels.get(&event.user_id) {
            // A send only fails when every receiver is gone; that's fine —
            // the event is already durable.
            match tx.send(event.clone()) {
                Ok(receivers) => {
                    debug!(user_id = %event.user_id, receivers, "Activity fanned out")
                }
                Err(_) => debug!(user_id = %event.user_id, "No live subscribers"),
            }
        }
        Ok(())
    }

    /// Subscribe to a user's event stream. Events published after this call
    /// arrive in publication order.
    pub async fn subscribe(&self, user_id: &str) -> broadcast::Receiver<ActivityEvent> {
        let mut channels = self.channels.lock().await;
        channels
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Record that a subscriber lagged and lost `skipped` events. Called by
    /// consumers when they observe `RecvError::Lagged`.
    pub async fn record_overflow(&self, user_id: &str, skipped: u64) {
        warn!(user_id, skipped, "Activity bus overflow, oldest events dropped");
        let now = chrono::Utc::now();
        let event = ActivityEvent::new(
            user_id,
            leadscout_common::types::ActivityType::Error,
            "Activity stream overflow",
            &format!("{skipped} events were dropped from the realtime stream"),
            now,
        );
        let user = UserStore::new(self.store.clone(), user_id);
        if let Err(e) = user.append_activity(&event).await {
            warn!(user_id, error = %e, "Failed to record overflow activity");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use leadscout_common::types::ActivityType;
    use leadscout_store::MemoryStore;

    fn make_event(user_id: &str, title: &str) -> ActivityEvent {
        ActivityEvent::new(user_id, ActivityType::Research, title, "msg", Utc::now())
    }

    #[tokio::test]
    async fn publish_is_durable_and_fans_out() {
        let store = Arc::new(MemoryStore::new());
        let bus = ActivityBus::new(store.clone());

        let mut rx = bus.subscribe("u1").await;
        bus.publish(make_event("u1", "e1")).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.title, "e1");

        let user = UserStore::new(store, "u1");
        assert_eq!(user.list_activities(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn events_arrive_in_publication_order() {
        let store = Arc::new(MemoryStore::new());
        let bus = ActivityBus::new(store);

        let mut rx = bus.subscribe("u1").await;
        for title in ["e1", "e2", "e3"] {
            bus.publish(make_event("u1", title)).await.unwrap();
        }

        assert_eq!(rx.recv().await.unwrap().title, "e1");
        assert_eq!(rx.recv().await.unwrap().title, "e2");
        assert_eq!(rx.recv().await.unwrap().title, "e3");
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let store = Arc::new(MemoryStore::new());
        let bus = ActivityBus::new(store);

        let mut rx1 = bus.subscribe("u1").await;
        bus.publish(make_event("u2", "other-user")).await.unwrap();
        bus.publish(make_event("u1", "mine")).await.unwrap();

        assert_eq!(rx1.recv().await.unwrap().title, "mine");
    }

    #[tokio::test]
    async fn overflow_drops_oldest_and_records_error() {
        let store = Arc::new(MemoryStore::new());
        let bus = ActivityBus::with_capacity(store.clone(), 2);

        let mut rx = bus.subscribe("u1").await;
        for i in 0..5 {
            bus.publish(make_event("u1", &format!("e{i}"))).await.unwrap();
        }

        match rx.recv().await {
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                bus.record_overflow("u1", skipped).await;
            }
            other => panic!("expected lag, got {other:?}"),
        }

        // Oldest dropped: the next readable event is not e0.
        let next = rx.recv().await.unwrap();
        assert_ne!(next.title, "e0");

        let user = UserStore::new(store, "u1");
        let activities = user.list_activities(20).await.unwrap();
        assert!(activities
            .iter()
            .any(|a| a.activity_type == ActivityType::Error));
    }
}
