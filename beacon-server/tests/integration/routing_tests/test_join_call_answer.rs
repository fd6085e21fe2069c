use beacon_core::{ParticipantId, RoomId, ServerSignal, SessionDescription};
use beacon_server::{Delivery, LedgerPhase};

use crate::integration::{create_coordinator, init_tracing};
use crate::utils::{TestConnection, call_accepted, call_user, join_room};

#[tokio::test]
async fn test_join_call_answer() {
    init_tracing();

    let coordinator = create_coordinator();

    let mut a = TestConnection::joined(&coordinator, "a")
        .await
        .expect("a failed to join");
    let mut b = TestConnection::open(&coordinator, "b");
    b.send(join_room("b")).expect("join failed");

    assert_eq!(
        b.recv().await.expect("no ack"),
        ServerSignal::JoinedRoom {
            room_id: RoomId::from("r1")
        }
    );
    assert_eq!(
        a.recv().await.expect("no announcement"),
        ServerSignal::UserJoined {
            user_id: ParticipantId::from("b")
        }
    );

    let delivery = a.send(call_user("b", "offer-sdp")).expect("offer not routed");
    assert_eq!(delivery, Delivery::single());
    assert_eq!(
        b.recv().await.expect("no incoming call"),
        ServerSignal::IncomingCall {
            offer: SessionDescription::offer("offer-sdp"),
            from: ParticipantId::from("a"),
        }
    );

    b.send(call_accepted("a", "answer-sdp"))
        .expect("answer not routed");
    assert_eq!(
        a.recv().await.expect("no answer"),
        ServerSignal::CallAccepted {
            answer: SessionDescription::answer("answer-sdp"),
        }
    );

    let entry = coordinator
        .ledger()
        .get(&a.user_id, &b.user_id)
        .expect("no ledger entry");
    assert_eq!(entry.phase, LedgerPhase::AnswerRouted);
    assert_eq!(entry.initiator, a.user_id);
}
