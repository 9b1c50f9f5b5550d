use crate::utils::mock_engine::{EngineState, MockMediaEngine};
use relay_core::{
    ConsumerId, DtlsParameters, MediaKind, PeerId, ProducerId, RtpCapabilities, RtpParameters,
    ServerEvent, TransportDirection, TransportId,
};
use relay_server::registry::ProducerClosedHook;
use relay_server::{ServerConfig, SessionController, SignalingService};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Level;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn new_controller() -> (Arc<SessionController>, Arc<EngineState>) {
    let (engine, state) = MockMediaEngine::new();
    (Arc::new(SessionController::new(engine)), state)
}

pub fn new_service() -> (SignalingService, Arc<EngineState>) {
    let (engine, state) = MockMediaEngine::new();
    (
        SignalingService::new(engine, ServerConfig::default()),
        state,
    )
}

/// A joined peer plus both ends of its notification channel.
pub struct TestPeer {
    pub id: PeerId,
    pub tx: mpsc::UnboundedSender<ServerEvent>,
    pub rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl TestPeer {
    /// Notifications received so far.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

pub async fn join_peer(controller: &SessionController, room: &str) -> TestPeer {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = PeerId::new();
    controller
        .join(room.into(), id, tx.clone())
        .await
        .expect("join failed");
    TestPeer { id, tx, rx }
}

/// Create and connect a send transport, then publish a stream of `kind`.
pub async fn setup_publisher(
    controller: &SessionController,
    peer_id: PeerId,
    kind: MediaKind,
) -> ProducerId {
    controller
        .create_transport(peer_id, TransportDirection::Send)
        .await
        .expect("create send transport failed");
    controller
        .connect_send_transport(peer_id, DtlsParameters::default())
        .await
        .expect("connect send transport failed");
    let (producer_id, _) = controller
        .publish(peer_id, kind, RtpParameters::default())
        .await
        .expect("publish failed");
    producer_id
}

/// Create and connect a receive transport for the peer.
pub async fn setup_receive_transport(
    controller: &SessionController,
    peer_id: PeerId,
) -> TransportId {
    let entry = controller
        .create_transport(peer_id, TransportDirection::Receive)
        .await
        .expect("create receive transport failed");
    controller
        .connect_receive_transport(&entry.id, DtlsParameters::default())
        .await
        .expect("connect receive transport failed");
    entry.id
}

/// Subscribe with the same hook shape the signaling layer installs: a
/// `ProducerClosed` notification through the peer's channel.
pub async fn subscribe_with_notify(
    controller: &SessionController,
    peer: &TestPeer,
    transport_id: TransportId,
    producer_id: ProducerId,
) -> ConsumerId {
    let tx = peer.tx.clone();
    let hook: ProducerClosedHook = Arc::new(move || {
        let _ = tx.send(ServerEvent::ProducerClosed { producer_id });
    });
    controller
        .subscribe(
            peer.id,
            transport_id,
            producer_id,
            RtpCapabilities::default(),
            hook,
        )
        .await
        .expect("subscribe failed")
        .id
}
