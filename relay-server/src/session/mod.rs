mod peers;
mod pubsub;
mod rooms;
mod transports;

use crate::media::MediaEngine;
use crate::registry::Registry;
use std::sync::Arc;

/// Orchestrates every Registry mutation: room join/create, transport
/// negotiation, publish/subscribe and the disconnect cascade. One instance
/// serves all connections; per-room serialization comes from the Registry's
/// lock table.
pub struct SessionController {
    registry: Arc<Registry>,
    engine: Arc<dyn MediaEngine>,
}

impl SessionController {
    pub fn new(engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            engine,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
