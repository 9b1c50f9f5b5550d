use crate::error::SessionError;
use crate::registry::TransportEntry;
use crate::session::SessionController;
use relay_core::{DtlsParameters, PeerId, TransportDirection, TransportId};
use tracing::info;

impl SessionController {
    /// Negotiate a new transport for the peer, tagged with its direction,
    /// and register it. If the engine later signals the secure channel
    /// closing on its own, the transport is removed from the Registry with
    /// no resurrection.
    pub async fn create_transport(
        &self,
        peer_id: PeerId,
        direction: TransportDirection,
    ) -> Result<TransportEntry, SessionError> {
        let room_name = self.registry.peer_room(&peer_id)?;
        let lock = self.registry.room_lock(&room_name);
        let guard = lock.lock().await;
        let router = self.registry.routing_context(&room_name)?;
        drop(guard);

        let handle = router
            .create_transport(direction)
            .await
            .map_err(|e| SessionError::MediaEngineRejected(e.to_string()))?;
        let entry = TransportEntry {
            id: handle.id(),
            peer_id,
            room_name: room_name.clone(),
            direction,
            handle: handle.clone(),
        };

        let guard = lock.lock().await;
        if let Err(e) = self.registry.insert_transport(entry.clone()) {
            // Peer disconnected while the engine negotiated; the fresh
            // transport must not outlive it.
            drop(guard);
            handle.close().await;
            return Err(e);
        }
        drop(guard);

        let registry = self.registry.clone();
        let transport_id = entry.id;
        handle.on_closed(Box::new(move || {
            let registry = registry.clone();
            let room_name = room_name.clone();
            tokio::spawn(async move {
                let Some(lock) = registry.room_lock_if_present(&room_name) else {
                    return;
                };
                let _guard = lock.lock().await;
                if registry.remove_transport(&transport_id).is_some() {
                    info!("Transport {} closed by engine, removed", transport_id);
                }
            });
        }));

        Ok(entry)
    }

    /// The peer's send transport, if transport setup has completed. Absence
    /// means "setup not finished yet", not a fatal condition.
    pub fn lookup_send_transport(&self, peer_id: &PeerId) -> Result<TransportEntry, SessionError> {
        self.registry.send_transport(peer_id)
    }

    /// A receive transport by id.
    pub fn lookup_receive_transport(
        &self,
        transport_id: &TransportId,
    ) -> Result<TransportEntry, SessionError> {
        let entry = self.registry.transport(transport_id)?;
        if entry.direction != TransportDirection::Receive {
            return Err(SessionError::NotFound("receive transport"));
        }
        Ok(entry)
    }

    /// Forward negotiation parameters for the peer's send transport.
    pub async fn connect_send_transport(
        &self,
        peer_id: PeerId,
        dtls_parameters: DtlsParameters,
    ) -> Result<(), SessionError> {
        let entry = self.lookup_send_transport(&peer_id)?;
        self.connect_transport(&entry, dtls_parameters).await
    }

    /// Forward negotiation parameters for a receive transport by id.
    pub async fn connect_receive_transport(
        &self,
        transport_id: &TransportId,
        dtls_parameters: DtlsParameters,
    ) -> Result<(), SessionError> {
        let entry = self.lookup_receive_transport(transport_id)?;
        self.connect_transport(&entry, dtls_parameters).await
    }

    async fn connect_transport(
        &self,
        entry: &TransportEntry,
        dtls_parameters: DtlsParameters,
    ) -> Result<(), SessionError> {
        entry
            .handle
            .connect(dtls_parameters)
            .await
            .map_err(|e| SessionError::TransportConnectFailed(e.to_string()))
    }
}
