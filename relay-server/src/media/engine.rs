use async_trait::async_trait;
use relay_core::{
    ConsumerId, DtlsParameters, IceCandidates, IceParameters, MediaKind, ProducerId,
    RtpCapabilities, RtpParameters, TransportDirection, TransportId,
};
use std::sync::Arc;
use thiserror::Error;

/// Error reported by the Media Engine for a rejected request.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Hook invoked from engine context when an object's lifecycle ends.
pub type CloseHook = Box<dyn Fn() + Send + Sync>;

/// The external media-plane engine. Performs RTP relay, DTLS/ICE negotiation
/// and codec capability matching; this crate only coordinates the objects it
/// hands out.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Create a per-room routing context grouping that room's media objects.
    async fn create_routing_context(&self) -> Result<Arc<dyn RoutingContext>, EngineError>;

    /// Register a hook fired if the engine's worker process dies. Engine
    /// state is unrecoverable at that point.
    fn on_died(&self, hook: CloseHook);
}

#[async_trait]
pub trait RoutingContext: Send + Sync {
    /// Routing capability descriptor, forwarded to clients unmodified.
    fn rtp_capabilities(&self) -> RtpCapabilities;

    async fn create_transport(
        &self,
        direction: TransportDirection,
    ) -> Result<Arc<dyn TransportHandle>, EngineError>;

    /// Whether `rtp_capabilities` can consume the given producer.
    /// Incompatibility is a plain `false`, never an error.
    async fn can_consume(
        &self,
        producer_id: &ProducerId,
        rtp_capabilities: &RtpCapabilities,
    ) -> bool;

    async fn close(&self);
}

#[async_trait]
pub trait TransportHandle: Send + Sync {
    fn id(&self) -> TransportId;

    fn ice_parameters(&self) -> IceParameters;

    fn ice_candidates(&self) -> IceCandidates;

    fn dtls_parameters(&self) -> DtlsParameters;

    async fn connect(&self, dtls_parameters: DtlsParameters) -> Result<(), EngineError>;

    async fn produce(
        &self,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    ) -> Result<Arc<dyn ProducerHandle>, EngineError>;

    async fn consume(
        &self,
        producer_id: ProducerId,
        rtp_capabilities: RtpCapabilities,
        paused: bool,
    ) -> Result<Arc<dyn ConsumerHandle>, EngineError>;

    /// Fired when the engine observes the secure channel transitioning to
    /// closed on its own (e.g. the remote side went away).
    fn on_closed(&self, hook: CloseHook);

    async fn close(&self);
}

#[async_trait]
pub trait ProducerHandle: Send + Sync {
    fn id(&self) -> ProducerId;

    fn kind(&self) -> MediaKind;

    async fn close(&self);
}

#[async_trait]
pub trait ConsumerHandle: Send + Sync {
    fn id(&self) -> ConsumerId;

    fn kind(&self) -> MediaKind;

    fn rtp_parameters(&self) -> RtpParameters;

    /// Start delivery. Consumers are created paused so the earliest frames
    /// are not lost before the client acknowledged the subscription.
    async fn resume(&self) -> Result<(), EngineError>;

    async fn close(&self);
}
