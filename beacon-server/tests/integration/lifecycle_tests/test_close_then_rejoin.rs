use beacon_core::{ParticipantId, ServerSignal};
use beacon_server::SignalingError;

use crate::integration::{create_coordinator, init_tracing, join_all};
use crate::utils::{TestConnection, call_user};

#[tokio::test]
async fn test_close_then_rejoin_restores_routing() {
    init_tracing();

    let coordinator = create_coordinator();
    let conns = join_all(&coordinator, &["a", "b"]).await;
    let mut b = conns.into_iter().nth(1).expect("b missing");

    // a's channel closes; a call to a now has nowhere to go.
    let a_id = ParticipantId::from("a");
    let old_a = coordinator.registry().lookup_handle(&a_id).expect("a registered");
    assert_eq!(coordinator.close(&old_a), Some(a_id.clone()));

    assert_eq!(
        b.send(call_user("a", "offer-1")),
        Err(SignalingError::UnknownTarget(a_id.clone()))
    );

    // Same identity, fresh channel.
    let mut a = TestConnection::joined(&coordinator, "a")
        .await
        .expect("a failed to rejoin");
    b.drain().await;

    b.send(call_user("a", "offer-2")).expect("offer not routed");
    match a.recv().await.expect("no incoming call") {
        ServerSignal::IncomingCall { offer, from } => {
            assert_eq!(offer.sdp, "offer-2");
            assert_eq!(from, ParticipantId::from("b"));
        }
        other => panic!("Expected incoming-call, got {:?}", other),
    }
}
