use crate::error::SessionError;
use crate::media::RoutingContext;
use crate::registry::entities::{
    ConsumerEntry, PeerEntry, ProducerEntry, RoomEntry, TransportEntry,
};
use dashmap::DashMap;
use relay_core::{
    ConsumerId, PeerId, ProducerId, RoomName, ServerEvent, TransportDirection, TransportId,
};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// In-memory maps of rooms, peers, transports, producers and consumers.
/// All other components read and mutate through this type.
///
/// Mutations touching the same room must be serialized: callers take the
/// room's guard from [`Registry::room_lock`] around every read-modify-write
/// sequence and drop it across Media Engine calls. Each mutator is total:
/// it either updates the primary collection AND the owner's index together,
/// or fails leaving nothing changed.
pub struct Registry {
    rooms: DashMap<RoomName, RoomEntry>,
    peers: DashMap<PeerId, PeerEntry>,
    transports: DashMap<TransportId, TransportEntry>,
    producers: DashMap<ProducerId, ProducerEntry>,
    consumers: DashMap<ConsumerId, ConsumerEntry>,
    room_locks: DashMap<RoomName, Arc<Mutex<()>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            peers: DashMap::new(),
            transports: DashMap::new(),
            producers: DashMap::new(),
            consumers: DashMap::new(),
            room_locks: DashMap::new(),
        }
    }

    /// Mutual-exclusion domain for one room. Created on first use and
    /// retained for the name's lifetime, so tasks that fetched it before a
    /// discard and joiners re-creating the same name serialize on the same
    /// mutex.
    pub fn room_lock(&self, room_name: &RoomName) -> Arc<Mutex<()>> {
        self.room_locks
            .entry(room_name.clone())
            .or_default()
            .clone()
    }

    /// Non-creating variant for asynchronous cleanup hooks. A missing lock
    /// means no room of that name ever existed.
    pub fn room_lock_if_present(&self, room_name: &RoomName) -> Option<Arc<Mutex<()>>> {
        self.room_locks.get(room_name).map(|lock| lock.clone())
    }

    // --- rooms ---

    pub fn contains_room(&self, room_name: &RoomName) -> bool {
        self.rooms.contains_key(room_name)
    }

    pub fn insert_room(&self, room_name: RoomName, router: Arc<dyn RoutingContext>) {
        self.rooms.insert(
            room_name,
            RoomEntry {
                router,
                members: Vec::new(),
            },
        );
    }

    pub fn routing_context(
        &self,
        room_name: &RoomName,
    ) -> Result<Arc<dyn RoutingContext>, SessionError> {
        self.rooms
            .get(room_name)
            .map(|room| room.router.clone())
            .ok_or(SessionError::NotFound("room"))
    }

    pub fn members(&self, room_name: &RoomName) -> Result<Vec<PeerId>, SessionError> {
        self.rooms
            .get(room_name)
            .map(|room| room.members.clone())
            .ok_or(SessionError::NotFound("room"))
    }

    /// Extend membership with `peer_id`. Re-adding an existing member is a
    /// no-op. Returns the membership after the call.
    pub fn add_member(
        &self,
        room_name: &RoomName,
        peer_id: PeerId,
    ) -> Result<Vec<PeerId>, SessionError> {
        let mut room = self
            .rooms
            .get_mut(room_name)
            .ok_or(SessionError::NotFound("room"))?;
        if !room.members.contains(&peer_id) {
            room.members.push(peer_id);
        }
        Ok(room.members.clone())
    }

    /// Remove `peer_id` from membership. Returns true when the room is now
    /// empty (and should be discarded by the caller).
    pub fn remove_member(&self, room_name: &RoomName, peer_id: &PeerId) -> bool {
        match self.rooms.get_mut(room_name) {
            Some(mut room) => {
                room.members.retain(|member| member != peer_id);
                room.members.is_empty()
            }
            None => false,
        }
    }

    /// Discard a room. Its lock-table entry is kept: a waiter that fetched
    /// the mutex before the discard and a joiner re-creating the name must
    /// stay in one mutual-exclusion domain. The routing context is returned
    /// so the caller can close it outside the room guard.
    pub fn remove_room(&self, room_name: &RoomName) -> Option<RoomEntry> {
        self.rooms.remove(room_name).map(|(_, entry)| entry)
    }

    // --- peers ---

    pub fn contains_peer(&self, peer_id: &PeerId) -> bool {
        self.peers.contains_key(peer_id)
    }

    pub fn insert_peer(&self, peer_id: PeerId, entry: PeerEntry) {
        self.peers.insert(peer_id, entry);
    }

    pub fn peer(&self, peer_id: &PeerId) -> Result<PeerEntry, SessionError> {
        self.peers
            .get(peer_id)
            .map(|peer| peer.clone())
            .ok_or(SessionError::NotFound("peer"))
    }

    pub fn peer_room(&self, peer_id: &PeerId) -> Result<RoomName, SessionError> {
        self.peers
            .get(peer_id)
            .map(|peer| peer.room_name.clone())
            .ok_or(SessionError::NotFound("peer"))
    }

    pub fn notify_sender(
        &self,
        peer_id: &PeerId,
    ) -> Result<mpsc::UnboundedSender<ServerEvent>, SessionError> {
        self.peers
            .get(peer_id)
            .map(|peer| peer.notify.clone())
            .ok_or(SessionError::NotFound("peer"))
    }

    pub fn remove_peer(&self, peer_id: &PeerId) -> Option<PeerEntry> {
        self.peers.remove(peer_id).map(|(_, entry)| entry)
    }

    // --- transports ---

    pub fn insert_transport(&self, entry: TransportEntry) -> Result<(), SessionError> {
        let mut peer = self
            .peers
            .get_mut(&entry.peer_id)
            .ok_or(SessionError::NotFound("peer"))?;
        peer.transports.push(entry.id);
        drop(peer);
        self.transports.insert(entry.id, entry);
        Ok(())
    }

    pub fn transport(&self, transport_id: &TransportId) -> Result<TransportEntry, SessionError> {
        self.transports
            .get(transport_id)
            .map(|transport| transport.clone())
            .ok_or(SessionError::NotFound("transport"))
    }

    /// The peer's transport tagged `send`, if transport setup has completed.
    pub fn send_transport(&self, peer_id: &PeerId) -> Result<TransportEntry, SessionError> {
        let transport_ids = self
            .peers
            .get(peer_id)
            .map(|peer| peer.transports.clone())
            .ok_or(SessionError::NotFound("peer"))?;
        transport_ids
            .iter()
            .filter_map(|id| self.transports.get(id))
            .find(|transport| transport.direction == TransportDirection::Send)
            .map(|transport| transport.clone())
            .ok_or(SessionError::NotFound("send transport"))
    }

    pub fn remove_transport(&self, transport_id: &TransportId) -> Option<TransportEntry> {
        let (_, entry) = self.transports.remove(transport_id)?;
        if let Some(mut peer) = self.peers.get_mut(&entry.peer_id) {
            peer.transports.retain(|id| id != transport_id);
        }
        Some(entry)
    }

    // --- producers ---

    pub fn insert_producer(&self, entry: ProducerEntry) -> Result<(), SessionError> {
        let mut peer = self
            .peers
            .get_mut(&entry.peer_id)
            .ok_or(SessionError::NotFound("peer"))?;
        peer.producers.push(entry.id);
        drop(peer);
        self.producers.insert(entry.id, entry);
        Ok(())
    }

    pub fn producer(&self, producer_id: &ProducerId) -> Result<ProducerEntry, SessionError> {
        self.producers
            .get(producer_id)
            .map(|producer| producer.clone())
            .ok_or(SessionError::NotFound("producer"))
    }

    pub fn remove_producer(&self, producer_id: &ProducerId) -> Option<ProducerEntry> {
        let (_, entry) = self.producers.remove(producer_id)?;
        if let Some(mut peer) = self.peers.get_mut(&entry.peer_id) {
            peer.producers.retain(|id| id != producer_id);
        }
        Some(entry)
    }

    /// Producer ids in the room not owned by `excluding`, ordered by member
    /// join order and per-peer publish order.
    pub fn producers_in_room(
        &self,
        room_name: &RoomName,
        excluding: &PeerId,
    ) -> Result<Vec<ProducerId>, SessionError> {
        let members = self.members(room_name)?;
        let mut producer_ids = Vec::new();
        for member in members {
            if member == *excluding {
                continue;
            }
            if let Some(peer) = self.peers.get(&member) {
                producer_ids.extend(peer.producers.iter().copied());
            }
        }
        Ok(producer_ids)
    }

    /// Members of the room that own at least one producer, excluding
    /// `excluding`. This is the fan-out set for publish notifications.
    pub fn producer_owners(&self, room_name: &RoomName, excluding: &PeerId) -> Vec<PeerId> {
        let Ok(members) = self.members(room_name) else {
            return Vec::new();
        };
        members
            .into_iter()
            .filter(|member| member != excluding)
            .filter(|member| {
                self.peers
                    .get(member)
                    .is_some_and(|peer| !peer.producers.is_empty())
            })
            .collect()
    }

    // --- consumers ---

    pub fn insert_consumer(&self, entry: ConsumerEntry) -> Result<(), SessionError> {
        let mut peer = self
            .peers
            .get_mut(&entry.peer_id)
            .ok_or(SessionError::NotFound("peer"))?;
        peer.consumers.push(entry.id);
        drop(peer);
        self.consumers.insert(entry.id, entry);
        Ok(())
    }

    pub fn consumer(&self, consumer_id: &ConsumerId) -> Result<ConsumerEntry, SessionError> {
        self.consumers
            .get(consumer_id)
            .map(|consumer| consumer.clone())
            .ok_or(SessionError::NotFound("consumer"))
    }

    pub fn remove_consumer(&self, consumer_id: &ConsumerId) -> Option<ConsumerEntry> {
        let (_, entry) = self.consumers.remove(consumer_id)?;
        if let Some(mut peer) = self.peers.get_mut(&entry.peer_id) {
            peer.consumers.retain(|id| id != consumer_id);
        }
        Some(entry)
    }

    /// Consumers referencing `producer_id`, across all peers.
    pub fn consumers_of(&self, producer_id: &ProducerId) -> Vec<ConsumerId> {
        self.consumers
            .iter()
            .filter(|consumer| consumer.producer_id == *producer_id)
            .map(|consumer| consumer.id)
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
