use crate::error::SessionError;
use crate::media::RoutingContext;
use crate::registry::{ConsumerEntry, PeerEntry, ProducerEntry, TransportEntry};
use crate::session::SessionController;
use relay_core::{PeerId, ProducerId, RoomName, RtpCapabilities, ServerEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Entities detached from the Registry under the room guard, closed against
/// the engine after the guard is released.
#[derive(Default)]
struct Teardown {
    /// The leaving peer's own consumers. No hook fires for these.
    consumers: Vec<ConsumerEntry>,
    /// Consumers of other peers whose source producer is going away. Their
    /// `on_producer_closed` hook fires before closing.
    orphaned: Vec<ConsumerEntry>,
    transports: Vec<TransportEntry>,
    producers: Vec<ProducerEntry>,
    routers: Vec<Arc<dyn RoutingContext>>,
}

impl Teardown {
    async fn finish(self) {
        for entry in &self.orphaned {
            (entry.on_producer_closed)();
        }
        for entry in self.consumers.into_iter().chain(self.orphaned) {
            entry.handle.close().await;
        }
        for entry in self.transports {
            entry.handle.close().await;
        }
        for entry in self.producers {
            entry.handle.close().await;
        }
        for router in self.routers {
            router.close().await;
        }
    }
}

impl SessionController {
    /// Join a room, registering a fresh peer with the supplied notification
    /// handle. Returns the room's routing capability descriptor, forwarded
    /// to the client unmodified. A peer id that is already registered is
    /// torn down first, as a disconnect would have done.
    pub async fn join(
        &self,
        room_name: RoomName,
        peer_id: PeerId,
        notify: mpsc::UnboundedSender<ServerEvent>,
    ) -> Result<RtpCapabilities, SessionError> {
        if self.registry.contains_peer(&peer_id) {
            self.leave(peer_id).await;
        }

        let (router, members) = self.join_or_create_room(&room_name, peer_id).await?;

        let lock = self.registry.room_lock(&room_name);
        let _guard = lock.lock().await;
        self.registry
            .insert_peer(peer_id, PeerEntry::new(room_name.clone(), notify));
        info!(
            "Peer {} joined room {} ({} members)",
            peer_id,
            room_name,
            members.len()
        );
        Ok(router.rtp_capabilities())
    }

    /// Terminal transition for a peer: close and remove every consumer,
    /// transport and producer it owns, cascade to consumers of its
    /// producers, drop it from room membership and delete its entry.
    /// Unknown peers are a no-op; disconnect races are expected.
    pub async fn leave(&self, peer_id: PeerId) {
        let Ok(room_name) = self.registry.peer_room(&peer_id) else {
            return;
        };
        let lock = self.registry.room_lock(&room_name);
        let guard = lock.lock().await;
        let Ok(peer) = self.registry.peer(&peer_id) else {
            // Lost a leave race while waiting on the guard.
            return;
        };

        let mut teardown = Teardown::default();

        for consumer_id in &peer.consumers {
            match self.registry.remove_consumer(consumer_id) {
                Some(entry) => teardown.consumers.push(entry),
                None => self.report_stale_index(SessionError::InvariantViolation(format!(
                    "consumer {} indexed by peer {} not in registry",
                    consumer_id, peer_id
                ))),
            }
        }
        for transport_id in &peer.transports {
            match self.registry.remove_transport(transport_id) {
                Some(entry) => teardown.transports.push(entry),
                None => self.report_stale_index(SessionError::InvariantViolation(format!(
                    "transport {} indexed by peer {} not in registry",
                    transport_id, peer_id
                ))),
            }
        }
        for producer_id in &peer.producers {
            match self.registry.remove_producer(producer_id) {
                Some(entry) => {
                    self.detach_consumers_of(producer_id, &mut teardown);
                    teardown.producers.push(entry);
                }
                None => self.report_stale_index(SessionError::InvariantViolation(format!(
                    "producer {} indexed by peer {} not in registry",
                    producer_id, peer_id
                ))),
            }
        }

        if let Some(room) = self.leave_room(&room_name, &peer_id) {
            teardown.routers.push(room.router);
        }
        self.registry.remove_peer(&peer_id);
        drop(guard);

        teardown.finish().await;
        info!("Peer {} left room {}", peer_id, room_name);
    }

    /// Removing a producer removes every consumer referencing it, plus each
    /// such consumer's transport. A transport carrying several of those
    /// consumers is detached on the first and skipped after. Caller holds
    /// the room guard.
    fn detach_consumers_of(&self, producer_id: &ProducerId, teardown: &mut Teardown) {
        for consumer_id in self.registry.consumers_of(producer_id) {
            let Some(entry) = self.registry.remove_consumer(&consumer_id) else {
                continue;
            };
            let already_detached = teardown
                .transports
                .iter()
                .any(|transport| transport.id == entry.transport_id);
            match self.registry.remove_transport(&entry.transport_id) {
                Some(transport) => teardown.transports.push(transport),
                None if already_detached => {}
                None => self.report_stale_index(SessionError::InvariantViolation(format!(
                    "consumer {} references missing transport {}",
                    consumer_id, entry.transport_id
                ))),
            }
            teardown.orphaned.push(entry);
        }
    }

    /// Bookkeeping inconsistency hit during a cascade. The offending index
    /// entry is already dropped by the caller; nothing is left dangling.
    fn report_stale_index(&self, fault: SessionError) {
        error!("cascade teardown: {}, force-removed", fault);
    }
}
