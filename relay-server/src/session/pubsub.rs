use crate::error::SessionError;
use crate::registry::{ConsumerEntry, ProducerClosedHook, ProducerEntry};
use crate::session::SessionController;
use relay_core::{
    ConsumerId, MediaKind, PeerId, ProducerId, RoomName, RtpCapabilities, RtpParameters,
    ServerEvent, TransportDirection, TransportId,
};
use tracing::{info, warn};

impl SessionController {
    /// Publish a media stream over the peer's send transport. On success the
    /// new producer is announced to every other peer in the room that
    /// already owns a producer. Returns the producer id and whether other
    /// producers exist in the room.
    pub async fn publish(
        &self,
        peer_id: PeerId,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<(ProducerId, bool), SessionError> {
        let room_name = self.registry.peer_room(&peer_id)?;
        let lock = self.registry.room_lock(&room_name);
        let guard = lock.lock().await;
        let transport = self.registry.send_transport(&peer_id)?;
        drop(guard);

        let producer = transport
            .handle
            .produce(kind, rtp_parameters)
            .await
            .map_err(|e| SessionError::MediaEngineRejected(e.to_string()))?;
        let producer_id = producer.id();
        let entry = ProducerEntry {
            id: producer_id,
            peer_id,
            room_name: room_name.clone(),
            handle: producer.clone(),
        };

        let guard = lock.lock().await;
        if let Err(e) = self.registry.insert_producer(entry) {
            // Peer disconnected while the engine created the producer.
            drop(guard);
            producer.close().await;
            return Err(e);
        }

        let others_publishing = !self
            .registry
            .producers_in_room(&room_name, &peer_id)?
            .is_empty();

        // Announce to peers that already publish in this room. Newly joined
        // peers without a producer discover streams via list_producers.
        for owner in self.registry.producer_owners(&room_name, &peer_id) {
            match self.registry.notify_sender(&owner) {
                Ok(notify) => {
                    let _ = notify.send(ServerEvent::NewProducer { producer_id });
                }
                Err(_) => warn!(
                    "Producer owner {} has no peer entry, skipping announce",
                    owner
                ),
            }
        }
        drop(guard);

        info!(
            "Peer {} published {:?} producer {} in room {}",
            peer_id, kind, producer_id, room_name
        );
        Ok((producer_id, others_publishing))
    }

    /// Whether `rtp_capabilities` can consume the producer. Incompatibility
    /// and unknown rooms are a plain `false`.
    pub async fn can_subscribe(
        &self,
        room_name: &RoomName,
        rtp_capabilities: &RtpCapabilities,
        producer_id: &ProducerId,
    ) -> bool {
        match self.registry.routing_context(room_name) {
            Ok(router) => router.can_consume(producer_id, rtp_capabilities).await,
            Err(_) => false,
        }
    }

    /// Subscribe the peer to a producer over its receive transport. The
    /// consumer starts paused; the subscriber resumes it once ready.
    /// `on_producer_closed` fires before the consumer and its transport are
    /// torn down when the source producer is removed.
    pub async fn subscribe(
        &self,
        peer_id: PeerId,
        transport_id: TransportId,
        producer_id: ProducerId,
        rtp_capabilities: RtpCapabilities,
        on_producer_closed: ProducerClosedHook,
    ) -> Result<ConsumerEntry, SessionError> {
        let room_name = self.registry.peer_room(&peer_id)?;
        let lock = self.registry.room_lock(&room_name);
        let guard = lock.lock().await;
        let producer = self
            .registry
            .producer(&producer_id)
            .map_err(|_| SessionError::ProducerNotFound)?;
        if producer.room_name != room_name || producer.peer_id == peer_id {
            return Err(SessionError::ProducerNotFound);
        }
        let transport = self
            .registry
            .transport(&transport_id)
            .map_err(|_| SessionError::TransportMissing)?;
        if transport.peer_id != peer_id || transport.direction != TransportDirection::Receive {
            return Err(SessionError::TransportMissing);
        }
        drop(guard);

        if !self
            .can_subscribe(&room_name, &rtp_capabilities, &producer_id)
            .await
        {
            return Err(SessionError::Incompatible);
        }

        let consumer = transport
            .handle
            .consume(producer_id, rtp_capabilities, true)
            .await
            .map_err(|e| SessionError::MediaEngineRejected(e.to_string()))?;
        let entry = ConsumerEntry {
            id: consumer.id(),
            peer_id,
            room_name,
            producer_id,
            transport_id,
            handle: consumer.clone(),
            on_producer_closed,
        };

        let guard = lock.lock().await;
        // The producer or the peer may have gone away while the engine
        // created the consumer; a consumer must never outlive either.
        if self.registry.producer(&producer_id).is_err() {
            drop(guard);
            consumer.close().await;
            return Err(SessionError::ProducerNotFound);
        }
        if let Err(e) = self.registry.insert_consumer(entry.clone()) {
            drop(guard);
            consumer.close().await;
            return Err(e);
        }
        drop(guard);

        info!(
            "Peer {} subscribed to producer {} as consumer {}",
            peer_id, producer_id, entry.id
        );
        Ok(entry)
    }

    /// Start delivering media on a paused consumer.
    pub async fn resume(&self, consumer_id: &ConsumerId) -> Result<(), SessionError> {
        let entry = self.registry.consumer(consumer_id)?;
        entry
            .handle
            .resume()
            .await
            .map_err(|e| SessionError::MediaEngineRejected(e.to_string()))
    }

    /// Producer ids in the caller's room excluding the caller's own, in
    /// member join order. Lets a newly joined peer discover pre-existing
    /// streams without waiting for announcements.
    pub fn list_producers(&self, peer_id: &PeerId) -> Result<Vec<ProducerId>, SessionError> {
        let room_name = self.registry.peer_room(peer_id)?;
        self.registry.producers_in_room(&room_name, peer_id)
    }
}
