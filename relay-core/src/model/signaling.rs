use crate::model::media::{
    ConsumerId, DtlsParameters, IceCandidates, IceParameters, MediaKind, ProducerId,
    RtpCapabilities, RtpParameters, TransportDirection, TransportId,
};
use crate::model::peer::PeerId;
use crate::model::room::RoomName;
use serde::{Deserialize, Serialize};

/// Signaling events sent by a client. Disconnect is the socket closing,
/// not an event of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "camelCase")]
pub enum ClientEvent {
    Join {
        room_name: RoomName,
    },
    CreateTransport {
        direction: TransportDirection,
    },
    ConnectTransport {
        dtls_parameters: DtlsParameters,
    },
    Publish {
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    },
    ListProducers,
    ConnectReceiveTransport {
        dtls_parameters: DtlsParameters,
        transport_id: TransportId,
    },
    Subscribe {
        rtp_capabilities: RtpCapabilities,
        producer_id: ProducerId,
        transport_id: TransportId,
    },
    Resume {
        consumer_id: ConsumerId,
    },
}

/// Acknowledgements and server-initiated notifications. Every client event
/// gets an explicit reply; failures are an `Error` event, never silence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "camelCase")]
pub enum ServerEvent {
    Welcome {
        peer_id: PeerId,
    },
    Joined {
        rtp_capabilities: RtpCapabilities,
    },
    TransportCreated {
        transport_id: TransportId,
        ice_parameters: IceParameters,
        ice_candidates: IceCandidates,
        dtls_parameters: DtlsParameters,
    },
    TransportConnected,
    Published {
        producer_id: ProducerId,
        others_publishing: bool,
    },
    ProducerList {
        producer_ids: Vec<ProducerId>,
    },
    Subscribed {
        consumer_id: ConsumerId,
        producer_id: ProducerId,
        kind: MediaKind,
        rtp_parameters: RtpParameters,
    },
    Resumed {
        consumer_id: ConsumerId,
    },
    NewProducer {
        producer_id: ProducerId,
    },
    ProducerClosed {
        producer_id: ProducerId,
    },
    Error {
        message: String,
    },
}
