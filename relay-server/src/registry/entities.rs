use crate::media::{ConsumerHandle, ProducerHandle, RoutingContext, TransportHandle};
use relay_core::{
    ConsumerId, PeerId, ProducerId, RoomName, ServerEvent, TransportDirection, TransportId,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Hook supplied at subscribe time, invoked before a consumer is torn down
/// because its source producer went away.
pub type ProducerClosedHook = Arc<dyn Fn() + Send + Sync>;

pub struct RoomEntry {
    pub router: Arc<dyn RoutingContext>,
    /// Ordered membership, insertion order, no duplicates.
    pub members: Vec<PeerId>,
}

#[derive(Clone)]
pub struct PeerEntry {
    pub room_name: RoomName,
    pub notify: mpsc::UnboundedSender<ServerEvent>,
    pub transports: Vec<TransportId>,
    pub producers: Vec<ProducerId>,
    pub consumers: Vec<ConsumerId>,
}

impl PeerEntry {
    pub fn new(room_name: RoomName, notify: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            room_name,
            notify,
            transports: Vec::new(),
            producers: Vec::new(),
            consumers: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct TransportEntry {
    pub id: TransportId,
    pub peer_id: PeerId,
    pub room_name: RoomName,
    pub direction: TransportDirection,
    pub handle: Arc<dyn TransportHandle>,
}

#[derive(Clone)]
pub struct ProducerEntry {
    pub id: ProducerId,
    pub peer_id: PeerId,
    pub room_name: RoomName,
    pub handle: Arc<dyn ProducerHandle>,
}

#[derive(Clone)]
pub struct ConsumerEntry {
    pub id: ConsumerId,
    pub peer_id: PeerId,
    pub room_name: RoomName,
    /// The producer this consumer subscribes to. Always in the same room,
    /// never owned by the same peer.
    pub producer_id: ProducerId,
    /// The receive transport carrying this consumer. Torn down with it when
    /// the source producer goes away.
    pub transport_id: TransportId,
    pub handle: Arc<dyn ConsumerHandle>,
    pub on_producer_closed: ProducerClosedHook,
}
