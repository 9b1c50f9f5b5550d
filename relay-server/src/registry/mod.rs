mod entities;
mod store;

pub use entities::{
    ConsumerEntry, PeerEntry, ProducerClosedHook, ProducerEntry, RoomEntry, TransportEntry,
};
pub use store::Registry;
