pub mod config;
pub mod error;
pub mod media;
pub mod registry;
pub mod session;
pub mod signaling;

pub use config::ServerConfig;
pub use error::SessionError;
pub use media::{
    CloseHook, ConsumerHandle, EngineError, MediaEngine, ProducerHandle, RoutingContext,
    TransportHandle,
};
pub use registry::{ProducerClosedHook, Registry};
pub use session::SessionController;
pub use signaling::{SignalingService, ws_handler};
