use thiserror::Error;

/// Failures surfaced to signaling callers. None of these terminate the
/// process; the connection stays open and the client gets an error payload.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A referenced room/peer/transport/producer/consumer is absent.
    #[error("not found: {0}")]
    NotFound(&'static str),

    /// Capability mismatch. A normal negative outcome, not a fault.
    #[error("capabilities incompatible with producer")]
    Incompatible,

    /// The peer has no receive transport to consume over.
    #[error("peer has no receive transport")]
    TransportMissing,

    /// The producer id does not resolve to a subscribable producer in the
    /// peer's room.
    #[error("producer not found in room")]
    ProducerNotFound,

    /// The Media Engine rejected the negotiation parameters.
    #[error("transport connect failed: {0}")]
    TransportConnectFailed(String),

    /// The Media Engine rejected an object creation request.
    #[error("media engine rejected request: {0}")]
    MediaEngineRejected(String),

    /// Internal bookkeeping inconsistency. Logged, and the offending entity
    /// force-removed rather than left dangling.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}
