use beacon_core::{IceCandidate, ParticipantId, RoomId, ServerSignal, SessionDescription};
use beacon_server::ServerConfig;

use crate::integration::init_tracing;
use crate::utils::{TestServer, WsTestClient, call_accepted, call_user, ice_candidate, join_room};

#[tokio::test]
async fn test_call_flow_over_websocket() {
    init_tracing();

    let server = TestServer::start(ServerConfig::default())
        .await
        .expect("Failed to start server");

    let mut a = WsTestClient::connect(&server).await.expect("a connect");
    let mut b = WsTestClient::connect(&server).await.expect("b connect");

    a.send(&join_room("a")).await.expect("send failed");
    assert_eq!(
        a.recv().await.expect("no ack"),
        ServerSignal::JoinedRoom {
            room_id: RoomId::from("r1")
        }
    );

    b.send(&join_room("b")).await.expect("send failed");
    b.recv().await.expect("no ack");
    assert_eq!(
        a.recv().await.expect("no announcement"),
        ServerSignal::UserJoined {
            user_id: ParticipantId::from("b")
        }
    );

    a.send(&call_user("b", "offer-sdp")).await.expect("send failed");
    assert_eq!(
        b.recv().await.expect("no incoming call"),
        ServerSignal::IncomingCall {
            offer: SessionDescription::offer("offer-sdp"),
            from: ParticipantId::from("a"),
        }
    );

    b.send(&call_accepted("a", "answer-sdp")).await.expect("send failed");
    assert_eq!(
        a.recv().await.expect("no answer"),
        ServerSignal::CallAccepted {
            answer: SessionDescription::answer("answer-sdp"),
        }
    );

    a.send(&ice_candidate("candidate:1")).await.expect("send failed");
    assert_eq!(
        b.recv().await.expect("no candidate"),
        ServerSignal::IceCandidate {
            candidate: IceCandidate::new("candidate:1"),
        }
    );

    a.close().await.expect("close failed");

    // The server notices the close and releases the identity.
    let registry_cleared = async {
        while server
            .coordinator
            .registry()
            .lookup_handle(&ParticipantId::from("a"))
            .is_some()
        {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(std::time::Duration::from_secs(2), registry_cleared)
        .await
        .expect("a was never unregistered");
}
