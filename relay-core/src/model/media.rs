use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! engine_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

engine_id! {
    /// Media-Engine-issued transport identifier.
    TransportId
}

engine_id! {
    /// Media-Engine-issued producer identifier.
    ProducerId
}

engine_id! {
    /// Media-Engine-issued consumer identifier.
    ConsumerId
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TransportDirection {
    Send,
    Receive,
}

macro_rules! engine_blob {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
        #[serde(transparent)]
        pub struct $name(pub serde_json::Value);
    };
}

engine_blob! {
    /// Per-room routing capability descriptor, forwarded to clients unmodified.
    RtpCapabilities
}

engine_blob! {
    /// Media parameters supplied by a publisher, opaque to the coordinator.
    RtpParameters
}

engine_blob! {
    /// Secure-channel negotiation parameters, opaque to the coordinator.
    DtlsParameters
}

engine_blob! {
    IceParameters
}

engine_blob! {
    IceCandidates
}
