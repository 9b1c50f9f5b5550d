mod media;
mod peer;
mod room;
mod signaling;

pub use media::{
    ConsumerId, DtlsParameters, IceCandidates, IceParameters, MediaKind, ProducerId,
    RtpCapabilities, RtpParameters, TransportDirection, TransportId,
};
pub use peer::PeerId;
pub use room::RoomName;
pub use signaling::{ClientEvent, ServerEvent};
