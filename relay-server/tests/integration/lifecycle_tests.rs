use crate::utils::{
    init_tracing, join_peer, new_controller, new_service, setup_publisher,
    setup_receive_transport, subscribe_with_notify,
};
use relay_core::{
    ClientEvent, DtlsParameters, MediaKind, PeerId, RoomName, RtpCapabilities, RtpParameters,
    ServerEvent, TransportDirection,
};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::mpsc;

#[tokio::test]
async fn leave_cascades_every_owned_entity() {
    init_tracing();
    let (controller, state) = new_controller();
    let peer_a = join_peer(&controller, "r1").await;
    let mut peer_b = join_peer(&controller, "r1").await;

    let producer_a = setup_publisher(&controller, peer_a.id, MediaKind::Video).await;
    let producer_b = setup_publisher(&controller, peer_b.id, MediaKind::Audio).await;
    let transport_b = setup_receive_transport(&controller, peer_b.id).await;
    let consumer_b = subscribe_with_notify(&controller, &peer_b, transport_b, producer_a).await;
    peer_b.drain();

    controller.leave(peer_a.id).await;

    // Nothing owned by A survives.
    assert!(!controller.registry().contains_peer(&peer_a.id));
    assert!(controller.registry().producer(&producer_a).is_err());
    // B's consumer referenced A's producer; it is gone too, with its
    // transport, and B heard about it.
    assert!(controller.registry().consumer(&consumer_b).is_err());
    assert!(controller.registry().transport(&transport_b).is_err());
    assert!(controller.registry().consumers_of(&producer_a).is_empty());
    let events = peer_b.drain();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ServerEvent::ProducerClosed { producer_id } if *producer_id == producer_a)),
        "B must be told its source producer closed"
    );
    // B itself is untouched apart from the cascade.
    let entry = controller.registry().peer(&peer_b.id).unwrap();
    assert_eq!(entry.producers, vec![producer_b]);
    assert!(entry.consumers.is_empty());
    assert_eq!(
        controller.registry().members(&RoomName::from("r1")).unwrap(),
        vec![peer_b.id]
    );
    assert_eq!(state.close_count(consumer_b.0), 1);
    assert_eq!(state.close_count(producer_a.0), 1);
}

#[tokio::test]
async fn shared_receive_transport_detaches_once() {
    init_tracing();
    let (controller, state) = new_controller();
    let peer_a = join_peer(&controller, "r1").await;
    let mut peer_b = join_peer(&controller, "r1").await;

    let producer_audio = setup_publisher(&controller, peer_a.id, MediaKind::Audio).await;
    let (producer_video, _) = controller
        .publish(peer_a.id, MediaKind::Video, RtpParameters::default())
        .await
        .unwrap();

    // Both subscriptions ride one receive transport.
    let transport_b = setup_receive_transport(&controller, peer_b.id).await;
    let consumer_audio =
        subscribe_with_notify(&controller, &peer_b, transport_b, producer_audio).await;
    let consumer_video =
        subscribe_with_notify(&controller, &peer_b, transport_b, producer_video).await;
    peer_b.drain();

    controller.leave(peer_a.id).await;

    assert!(controller.registry().consumer(&consumer_audio).is_err());
    assert!(controller.registry().consumer(&consumer_video).is_err());
    assert!(controller.registry().transport(&transport_b).is_err());
    assert_eq!(state.close_count(transport_b.0), 1, "no double-close");
    let entry = controller.registry().peer(&peer_b.id).unwrap();
    assert!(entry.transports.is_empty());
    assert!(entry.consumers.is_empty());

    let events = peer_b.drain();
    for producer_id in [producer_audio, producer_video] {
        assert!(
            events.iter().any(
                |e| matches!(e, ServerEvent::ProducerClosed { producer_id: id } if *id == producer_id)
            ),
            "B must hear both producers close"
        );
    }
}

#[tokio::test]
async fn cascade_tolerates_stale_index_entries() {
    init_tracing();
    let (controller, _state) = new_controller();
    let peer = join_peer(&controller, "r1").await;
    let entry = controller
        .create_transport(peer.id, TransportDirection::Send)
        .await
        .unwrap();

    // Forge an index pointing at a transport no longer registered. The
    // cascade must log it and still finish the teardown.
    let snapshot = controller.registry().peer(&peer.id).unwrap();
    controller.registry().remove_transport(&entry.id);
    controller.registry().insert_peer(peer.id, snapshot);

    controller.leave(peer.id).await;

    assert!(!controller.registry().contains_peer(&peer.id));
    assert!(controller.registry().members(&RoomName::from("r1")).is_err());
}

#[tokio::test]
async fn leave_twice_is_noop_second_time() {
    init_tracing();
    let (controller, state) = new_controller();
    let peer = join_peer(&controller, "r1").await;
    let producer = setup_publisher(&controller, peer.id, MediaKind::Video).await;

    controller.leave(peer.id).await;
    controller.leave(peer.id).await;

    assert_eq!(state.close_count(producer.0), 1, "no double-close");
    assert!(!controller.registry().contains_peer(&peer.id));
}

#[tokio::test]
async fn leave_unknown_peer_is_noop() {
    init_tracing();
    let (controller, _state) = new_controller();
    controller.leave(PeerId::new()).await;
}

#[tokio::test]
async fn engine_closed_transport_is_removed_without_resurrection() {
    init_tracing();
    let (controller, state) = new_controller();
    let peer = join_peer(&controller, "r1").await;
    let entry = controller
        .create_transport(peer.id, TransportDirection::Send)
        .await
        .unwrap();

    state.last_transport().fire_closed();

    // The hook commits on a spawned task holding the room guard.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(controller.registry().transport(&entry.id).is_err());
    assert!(
        controller
            .registry()
            .peer(&peer.id)
            .unwrap()
            .transports
            .is_empty()
    );
}

async fn dispatch_ok(
    service: &relay_server::SignalingService,
    peer_id: PeerId,
    tx: &mpsc::UnboundedSender<ServerEvent>,
    event: ClientEvent,
) -> ServerEvent {
    let reply = service.dispatch(peer_id, tx, event).await;
    assert!(
        !matches!(reply, ServerEvent::Error { .. }),
        "unexpected error reply: {:?}",
        reply
    );
    reply
}

/// The end-to-end session walk: two peers share a room, one publishes, the
/// other subscribes, the publisher disconnects.
#[tokio::test]
async fn two_peer_session_walkthrough() {
    init_tracing();
    let (service, state) = new_service();
    let controller = service.controller().clone();

    let peer_a = PeerId::new();
    let peer_b = PeerId::new();
    let (tx_a, _rx_a) = mpsc::unbounded_channel();
    let (tx_b, mut rx_b) = mpsc::unbounded_channel();

    let reply = dispatch_ok(
        &service,
        peer_a,
        &tx_a,
        ClientEvent::Join {
            room_name: "r1".into(),
        },
    )
    .await;
    assert!(matches!(reply, ServerEvent::Joined { .. }));
    dispatch_ok(
        &service,
        peer_b,
        &tx_b,
        ClientEvent::Join {
            room_name: "r1".into(),
        },
    )
    .await;

    // Both share one routing context.
    assert_eq!(state.routers_created.load(Ordering::SeqCst), 1);
    assert_eq!(
        controller.registry().members(&RoomName::from("r1")).unwrap(),
        vec![peer_a, peer_b]
    );

    // B publishes audio first so it is an announce target later.
    let ServerEvent::TransportCreated { .. } = dispatch_ok(
        &service,
        peer_b,
        &tx_b,
        ClientEvent::CreateTransport {
            direction: TransportDirection::Send,
        },
    )
    .await
    else {
        panic!("expected TransportCreated");
    };
    dispatch_ok(
        &service,
        peer_b,
        &tx_b,
        ClientEvent::ConnectTransport {
            dtls_parameters: DtlsParameters::default(),
        },
    )
    .await;
    dispatch_ok(
        &service,
        peer_b,
        &tx_b,
        ClientEvent::Publish {
            kind: MediaKind::Audio,
            rtp_parameters: RtpParameters::default(),
        },
    )
    .await;

    // A publishes video; B gets exactly one announcement for it.
    dispatch_ok(
        &service,
        peer_a,
        &tx_a,
        ClientEvent::CreateTransport {
            direction: TransportDirection::Send,
        },
    )
    .await;
    dispatch_ok(
        &service,
        peer_a,
        &tx_a,
        ClientEvent::ConnectTransport {
            dtls_parameters: DtlsParameters::default(),
        },
    )
    .await;
    let ServerEvent::Published {
        producer_id: producer_a,
        others_publishing,
    } = dispatch_ok(
        &service,
        peer_a,
        &tx_a,
        ClientEvent::Publish {
            kind: MediaKind::Video,
            rtp_parameters: RtpParameters::default(),
        },
    )
    .await
    else {
        panic!("expected Published");
    };
    assert!(others_publishing);

    let announce = rx_b.try_recv().expect("B should hear about A's producer");
    assert!(
        matches!(announce, ServerEvent::NewProducer { producer_id } if producer_id == producer_a)
    );
    assert!(rx_b.try_recv().is_err(), "exactly one announcement");

    // B discovers and subscribes over a receive transport.
    let ServerEvent::ProducerList { producer_ids } =
        dispatch_ok(&service, peer_b, &tx_b, ClientEvent::ListProducers).await
    else {
        panic!("expected ProducerList");
    };
    assert_eq!(producer_ids, vec![producer_a]);

    let ServerEvent::TransportCreated {
        transport_id: recv_transport_b,
        ..
    } = dispatch_ok(
        &service,
        peer_b,
        &tx_b,
        ClientEvent::CreateTransport {
            direction: TransportDirection::Receive,
        },
    )
    .await
    else {
        panic!("expected TransportCreated");
    };
    dispatch_ok(
        &service,
        peer_b,
        &tx_b,
        ClientEvent::ConnectReceiveTransport {
            dtls_parameters: DtlsParameters::default(),
            transport_id: recv_transport_b,
        },
    )
    .await;

    let ServerEvent::Subscribed {
        consumer_id,
        producer_id,
        kind,
        ..
    } = dispatch_ok(
        &service,
        peer_b,
        &tx_b,
        ClientEvent::Subscribe {
            rtp_capabilities: RtpCapabilities::default(),
            producer_id: producer_a,
            transport_id: recv_transport_b,
        },
    )
    .await
    else {
        panic!("expected Subscribed");
    };
    assert_eq!(producer_id, producer_a);
    assert_eq!(kind, MediaKind::Video);
    assert_eq!(
        controller
            .registry()
            .consumer(&consumer_id)
            .unwrap()
            .producer_id,
        producer_a
    );

    dispatch_ok(
        &service,
        peer_b,
        &tx_b,
        ClientEvent::Resume { consumer_id },
    )
    .await;
    assert!(state.resumed.lock().unwrap().contains(&consumer_id));

    // A disconnects; B is told and its consumer is gone.
    service.disconnected(peer_a).await;

    let closed = rx_b.try_recv().expect("B should hear the producer closed");
    assert!(
        matches!(closed, ServerEvent::ProducerClosed { producer_id } if producer_id == producer_a)
    );
    assert!(controller.registry().consumer(&consumer_id).is_err());
    assert!(!controller.registry().contains_peer(&peer_a));
    assert_eq!(
        controller.registry().members(&RoomName::from("r1")).unwrap(),
        vec![peer_b]
    );
}

#[tokio::test]
async fn dispatch_maps_failures_to_error_events() {
    init_tracing();
    let (service, _state) = new_service();
    let (tx, _rx) = mpsc::unbounded_channel();

    // Publishing without ever joining is a NotFound, reported in-band.
    let reply = service
        .dispatch(
            PeerId::new(),
            &tx,
            ClientEvent::Publish {
                kind: MediaKind::Video,
                rtp_parameters: RtpParameters::default(),
            },
        )
        .await;

    let ServerEvent::Error { message } = reply else {
        panic!("expected Error reply");
    };
    assert!(message.contains("not found"));
}
