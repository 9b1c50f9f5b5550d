use crate::error::SessionError;
use crate::media::RoutingContext;
use crate::registry::RoomEntry;
use crate::session::SessionController;
use relay_core::{PeerId, RoomName};
use std::sync::Arc;
use tracing::info;

impl SessionController {
    /// Join an existing room or create it on first use. One routing context
    /// per room, reused by all later joiners; re-adding an existing member
    /// does not duplicate the membership entry. Returns the routing context
    /// and the membership after the join.
    pub(crate) async fn join_or_create_room(
        &self,
        room_name: &RoomName,
        peer_id: PeerId,
    ) -> Result<(Arc<dyn RoutingContext>, Vec<PeerId>), SessionError> {
        let lock = self.registry.room_lock(room_name);
        let guard = lock.lock().await;
        if self.registry.contains_room(room_name) {
            let router = self.registry.routing_context(room_name)?;
            let members = self.registry.add_member(room_name, peer_id)?;
            return Ok((router, members));
        }
        drop(guard);

        // Routing context creation suspends on the engine; the room guard is
        // not held across it.
        let router = self
            .engine
            .create_routing_context()
            .await
            .map_err(|e| SessionError::MediaEngineRejected(e.to_string()))?;

        let guard = lock.lock().await;
        if self.registry.contains_room(room_name) {
            // Another joiner created the room during the gap. Keep theirs,
            // discard ours.
            let existing = self.registry.routing_context(room_name)?;
            let members = self.registry.add_member(room_name, peer_id)?;
            drop(guard);
            router.close().await;
            return Ok((existing, members));
        }

        info!("Creating new room: {}", room_name);
        self.registry.insert_room(room_name.clone(), router.clone());
        let members = self.registry.add_member(room_name, peer_id)?;
        Ok((router, members))
    }

    /// Remove `peer_id` from the room's membership; an emptied room is
    /// discarded. Returns the discarded entry so the caller can close its
    /// routing context outside the room guard. Caller holds the room guard.
    pub(crate) fn leave_room(&self, room_name: &RoomName, peer_id: &PeerId) -> Option<RoomEntry> {
        if self.registry.remove_member(room_name, peer_id) {
            let room = self.registry.remove_room(room_name);
            if room.is_some() {
                info!("Room {} is empty, discarding", room_name);
            }
            return room;
        }
        None
    }
}
