use beacon_core::{ParticipantId, ServerSignal};
use beacon_server::SignalingError;

use crate::integration::{create_coordinator, init_tracing, join_all};
use crate::utils::{TestConnection, call_user};

#[tokio::test]
async fn test_incoming_call_names_registered_sender() {
    init_tracing();

    let coordinator = create_coordinator();
    let mut conns = join_all(&coordinator, &["mallory", "bob"]).await;

    // The wire form carries no sender; a claimed one is ignored.
    let frame = r#"{"type":"call-user","payload":{"offer":{"type":"offer","sdp":"x"},"userId":"bob","from":"alice"}}"#;
    let signal = serde_json::from_str(frame).expect("frame should parse");
    conns[0].send(signal).expect("offer not routed");

    match conns[1].recv().await.expect("no incoming call") {
        ServerSignal::IncomingCall { from, .. } => assert_eq!(from, ParticipantId::from("mallory")),
        other => panic!("Expected incoming-call, got {:?}", other),
    }
}

#[tokio::test]
async fn test_offer_before_join_is_rejected() {
    init_tracing();

    let coordinator = create_coordinator();
    let mut conns = join_all(&coordinator, &["bob"]).await;
    let stranger = TestConnection::open(&coordinator, "stranger");

    let result = stranger.send(call_user("bob", "x"));

    assert!(matches!(result, Err(SignalingError::ProtocolViolation(_))));
    assert!(conns[0].drain().await.is_empty());
}
