use beacon_core::ServerSignal;
use beacon_server::ServerConfig;

use crate::integration::init_tracing;
use crate::utils::{TestServer, WsTestClient, join_room};

#[tokio::test]
async fn test_malformed_frames_keep_channel_open() {
    init_tracing();

    let server = TestServer::start(ServerConfig::default())
        .await
        .expect("Failed to start server");
    let mut client = WsTestClient::connect(&server).await.expect("connect");

    client.send_raw("not json").await.expect("send failed");
    client
        .send_raw(r#"{"type":"leave-room","payload":{}}"#)
        .await
        .expect("send failed");

    client.send(&join_room("a")).await.expect("send failed");
    assert!(matches!(
        client.recv().await.expect("channel closed"),
        ServerSignal::JoinedRoom { .. }
    ));
}
