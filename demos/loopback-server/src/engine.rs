//! An inert in-process engine that accepts every request and hands out
//! placeholder negotiation payloads. It moves no media; it exists so the
//! coordinator can be run and poked end to end without a media stack.

use async_trait::async_trait;
use dashmap::DashMap;
use relay_core::{
    ConsumerId, DtlsParameters, IceCandidates, IceParameters, MediaKind, ProducerId,
    RtpCapabilities, RtpParameters, TransportDirection, TransportId,
};
use relay_server::{
    CloseHook, ConsumerHandle, EngineError, MediaEngine, ProducerHandle, RoutingContext,
    TransportHandle,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub struct LoopbackEngine;

#[async_trait]
impl MediaEngine for LoopbackEngine {
    async fn create_routing_context(&self) -> Result<Arc<dyn RoutingContext>, EngineError> {
        Ok(Arc::new(LoopbackRouter {
            producer_kinds: Arc::new(DashMap::new()),
        }))
    }

    fn on_died(&self, _hook: CloseHook) {
        // Nothing here ever dies.
    }
}

struct LoopbackRouter {
    producer_kinds: Arc<DashMap<ProducerId, MediaKind>>,
}

#[async_trait]
impl RoutingContext for LoopbackRouter {
    fn rtp_capabilities(&self) -> RtpCapabilities {
        RtpCapabilities(json!({ "codecs": [], "headerExtensions": [] }))
    }

    async fn create_transport(
        &self,
        direction: TransportDirection,
    ) -> Result<Arc<dyn TransportHandle>, EngineError> {
        let id = TransportId::new();
        debug!("loopback: created {:?} transport {}", direction, id);
        Ok(Arc::new(LoopbackTransport {
            id,
            producer_kinds: self.producer_kinds.clone(),
        }))
    }

    async fn can_consume(
        &self,
        producer_id: &ProducerId,
        _rtp_capabilities: &RtpCapabilities,
    ) -> bool {
        self.producer_kinds.contains_key(producer_id)
    }

    async fn close(&self) {
        debug!("loopback: router closed");
    }
}

struct LoopbackTransport {
    id: TransportId,
    producer_kinds: Arc<DashMap<ProducerId, MediaKind>>,
}

#[async_trait]
impl TransportHandle for LoopbackTransport {
    fn id(&self) -> TransportId {
        self.id
    }

    fn ice_parameters(&self) -> IceParameters {
        IceParameters(json!({ "usernameFragment": "loopback", "password": "loopback" }))
    }

    fn ice_candidates(&self) -> IceCandidates {
        IceCandidates(json!([]))
    }

    fn dtls_parameters(&self) -> DtlsParameters {
        DtlsParameters(json!({ "role": "auto", "fingerprints": [] }))
    }

    async fn connect(&self, _dtls_parameters: DtlsParameters) -> Result<(), EngineError> {
        Ok(())
    }

    async fn produce(
        &self,
        kind: MediaKind,
        _rtp_parameters: RtpParameters,
    ) -> Result<Arc<dyn ProducerHandle>, EngineError> {
        let id = ProducerId::new();
        self.producer_kinds.insert(id, kind);
        Ok(Arc::new(LoopbackProducer { id, kind }))
    }

    async fn consume(
        &self,
        producer_id: ProducerId,
        _rtp_capabilities: RtpCapabilities,
        _paused: bool,
    ) -> Result<Arc<dyn ConsumerHandle>, EngineError> {
        let kind = self
            .producer_kinds
            .get(&producer_id)
            .map(|kind| *kind)
            .ok_or_else(|| EngineError::new("unknown producer"))?;
        Ok(Arc::new(LoopbackConsumer {
            id: ConsumerId::new(),
            kind,
        }))
    }

    fn on_closed(&self, _hook: CloseHook) {
        // Loopback transports never close on their own.
    }

    async fn close(&self) {
        debug!("loopback: transport {} closed", self.id);
    }
}

struct LoopbackProducer {
    id: ProducerId,
    kind: MediaKind,
}

#[async_trait]
impl ProducerHandle for LoopbackProducer {
    fn id(&self) -> ProducerId {
        self.id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    async fn close(&self) {
        debug!("loopback: producer {} closed", self.id);
    }
}

struct LoopbackConsumer {
    id: ConsumerId,
    kind: MediaKind,
}

#[async_trait]
impl ConsumerHandle for LoopbackConsumer {
    fn id(&self) -> ConsumerId {
        self.id
    }

    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn rtp_parameters(&self) -> RtpParameters {
        RtpParameters(json!({ "codecs": [] }))
    }

    async fn resume(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn close(&self) {
        debug!("loopback: consumer {} closed", self.id);
    }
}
