use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::media::MediaEngine;
use crate::registry::ProducerClosedHook;
use crate::session::SessionController;
use relay_core::{ClientEvent, PeerId, ServerEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Translates inbound signaling events into session operations and shapes
/// the acknowledgement for each. Cheap to clone; one instance is shared as
/// axum state across all connections.
#[derive(Clone)]
pub struct SignalingService {
    controller: Arc<SessionController>,
    config: ServerConfig,
}

impl SignalingService {
    pub fn new(engine: Arc<dyn MediaEngine>, config: ServerConfig) -> Self {
        let grace = config.engine_death_grace;
        engine.on_died(Box::new(move || {
            error!(
                "Media engine worker died; state is unrecoverable, exiting in {:?}",
                grace
            );
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                std::process::exit(1);
            });
        }));

        Self {
            controller: Arc::new(SessionController::new(engine)),
            config,
        }
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Handle one client event and produce its reply. Failures become an
    /// explicit `Error` event; the connection stays open.
    pub async fn dispatch(
        &self,
        peer_id: PeerId,
        notify: &mpsc::UnboundedSender<ServerEvent>,
        event: ClientEvent,
    ) -> ServerEvent {
        match self.handle_event(peer_id, notify, event).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Request from peer {} failed: {}", peer_id, e);
                ServerEvent::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    async fn handle_event(
        &self,
        peer_id: PeerId,
        notify: &mpsc::UnboundedSender<ServerEvent>,
        event: ClientEvent,
    ) -> Result<ServerEvent, SessionError> {
        match event {
            ClientEvent::Join { room_name } => {
                let rtp_capabilities = self
                    .controller
                    .join(room_name, peer_id, notify.clone())
                    .await?;
                Ok(ServerEvent::Joined { rtp_capabilities })
            }
            ClientEvent::CreateTransport { direction } => {
                let entry = self.controller.create_transport(peer_id, direction).await?;
                Ok(ServerEvent::TransportCreated {
                    transport_id: entry.id,
                    ice_parameters: entry.handle.ice_parameters(),
                    ice_candidates: entry.handle.ice_candidates(),
                    dtls_parameters: entry.handle.dtls_parameters(),
                })
            }
            ClientEvent::ConnectTransport { dtls_parameters } => {
                self.controller
                    .connect_send_transport(peer_id, dtls_parameters)
                    .await?;
                Ok(ServerEvent::TransportConnected)
            }
            ClientEvent::ConnectReceiveTransport {
                dtls_parameters,
                transport_id,
            } => {
                self.controller
                    .connect_receive_transport(&transport_id, dtls_parameters)
                    .await?;
                Ok(ServerEvent::TransportConnected)
            }
            ClientEvent::Publish {
                kind,
                rtp_parameters,
            } => {
                let (producer_id, others_publishing) =
                    self.controller.publish(peer_id, kind, rtp_parameters).await?;
                Ok(ServerEvent::Published {
                    producer_id,
                    others_publishing,
                })
            }
            ClientEvent::ListProducers => Ok(ServerEvent::ProducerList {
                producer_ids: self.controller.list_producers(&peer_id)?,
            }),
            ClientEvent::Subscribe {
                rtp_capabilities,
                producer_id,
                transport_id,
            } => {
                let tx = notify.clone();
                let on_producer_closed: ProducerClosedHook = Arc::new(move || {
                    let _ = tx.send(ServerEvent::ProducerClosed { producer_id });
                });
                let entry = self
                    .controller
                    .subscribe(
                        peer_id,
                        transport_id,
                        producer_id,
                        rtp_capabilities,
                        on_producer_closed,
                    )
                    .await?;
                Ok(ServerEvent::Subscribed {
                    consumer_id: entry.id,
                    producer_id,
                    kind: entry.handle.kind(),
                    rtp_parameters: entry.handle.rtp_parameters(),
                })
            }
            ClientEvent::Resume { consumer_id } => {
                self.controller.resume(&consumer_id).await?;
                Ok(ServerEvent::Resumed { consumer_id })
            }
        }
    }

    /// The signaling channel for the peer went away; its session state is
    /// cascaded down.
    pub async fn disconnected(&self, peer_id: PeerId) {
        self.controller.leave(peer_id).await;
    }
}
