pub mod bus;
pub mod hub;
pub mod webhook;

pub use bus::ActivityBus;
pub use hub::{ServerMessage, WsHub};
pub use webhook::{sign_body, DeliveryOutcome, WebhookDispatcher};

use std::sync::Arc;

use anyhow::Result;

use leadscout_common::types::ActivityEvent;
use leadscout_store::DocStore;

/// The realtime fan-out core: durable activity append, WebSocket hub, and
/// webhook dispatch behind a single `publish` entry point.
pub struct Realtime {
    bus: Arc<ActivityBus>,
    hub: Arc<WsHub>,
    dispatcher: Arc<WebhookDispatcher>,
}

impl Realtime {
    pub fn new(store: Arc<dyn DocStore>) -> Self {
        let bus = Arc::new(ActivityBus::new(store.clone()));
        let hub = Arc::new(WsHub::new(bus.clone()));
        let dispatcher = Arc::new(WebhookDispatcher::new(store));
        Self {
            bus,
            hub,
            dispatcher,
        }
    }

    pub fn bus(&self) -> Arc<ActivityBus> {
        self.bus.clone()
    }

    pub fn hub(&self) -> Arc<WsHub> {
        self.hub.clone()
    }

    pub fn dispatcher(&self) -> Arc<WebhookDispatcher> {
        self.dispatcher.clone()
    }

    /// Durable append, then WebSocket fan-out, then webhook dispatch.
    pub async fn publish(&self, event: ActivityEvent) -> Result<()> {
        self.bus.publish(event.clone()).await?;
        self.dispatcher.dispatch(&event);
        Ok(())
    }

    /// Axum router fragment exposing `/api/ws?user_id=…`.
    pub fn router(&self) -> axum::Router {
        self.hub.clone().router()
    }
}
