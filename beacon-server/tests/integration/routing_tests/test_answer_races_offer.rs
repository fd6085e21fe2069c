use beacon_core::ServerSignal;

use crate::integration::{create_coordinator, init_tracing, join_all};
use crate::utils::{call_accepted, call_user};

const ROUNDS: usize = 1000;

/// The callee answers from its own task the moment the offer lands. Every
/// answer must be accepted, however the two tasks interleave.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_answer_races_offer() {
    init_tracing();

    let coordinator = create_coordinator();
    let mut conns = join_all(&coordinator, &["a", "b"]).await;
    let mut b = conns.pop().expect("b missing");
    let mut a = conns.pop().expect("a missing");

    let answerer = tokio::spawn(async move {
        let mut rejected = 0;
        for _ in 0..ROUNDS {
            match b.recv().await? {
                ServerSignal::IncomingCall { .. } => {}
                other => anyhow::bail!("Expected incoming-call, got {}", other.kind()),
            }
            if b.send(call_accepted("a", "answer-sdp")).is_err() {
                rejected += 1;
            }
        }
        Ok::<usize, anyhow::Error>(rejected)
    });

    for round in 0..ROUNDS {
        a.send(call_user("b", "offer-sdp"))
            .unwrap_or_else(|e| panic!("offer {} not routed: {}", round, e));
        match a.recv().await {
            Ok(ServerSignal::CallAccepted { .. }) => {}
            Ok(other) => panic!("round {}: unexpected {}", round, other.kind()),
            Err(e) => panic!("round {}: no answer: {}", round, e),
        }
    }

    let rejected = answerer
        .await
        .expect("answerer panicked")
        .expect("answerer failed");
    assert_eq!(rejected, 0);
}
