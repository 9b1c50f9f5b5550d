mod engine;

pub use engine::{
    CloseHook, ConsumerHandle, EngineError, MediaEngine, ProducerHandle, RoutingContext,
    TransportHandle,
};
