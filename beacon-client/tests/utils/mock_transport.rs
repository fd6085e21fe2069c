use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use beacon_core::{IceCandidate, MediaTransport, SessionDescription};

/// Timeout for an expected transport call (ms).
pub const OP_TIMEOUT_MS: u64 = 3000;

/// Records every call; refuses candidates before a remote description.
#[derive(Default)]
pub struct MockTransport {
    ops: Mutex<Vec<String>>,
    remote_set: AtomicBool,
}

impl MockTransport {
    pub fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    pub fn has_op(&self, op: &str) -> bool {
        self.ops().iter().any(|o| o == op)
    }

    pub async fn wait_for_op(&self, op: &str) -> Result<()> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(OP_TIMEOUT_MS);
        while !self.has_op(op) {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("Timeout waiting for {}; saw {:?}", op, self.ops());
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Ok(())
    }

    fn record(&self, op: String) {
        tracing::debug!("[MockTransport] {}", op);
        self.ops.lock().unwrap().push(op);
    }
}

#[async_trait]
impl MediaTransport for MockTransport {
    type Stream = ();

    async fn create_offer(&self) -> Result<SessionDescription> {
        self.record("create_offer".to_owned());
        Ok(SessionDescription::offer("offer-sdp"))
    }

    async fn create_answer(&self, remote_offer: SessionDescription) -> Result<SessionDescription> {
        self.record(format!("create_answer:{}", remote_offer.sdp));
        self.remote_set.store(true, Ordering::SeqCst);
        Ok(SessionDescription::answer("answer-sdp"))
    }

    async fn set_remote_answer(&self, answer: SessionDescription) -> Result<()> {
        self.record(format!("set_remote_answer:{}", answer.sdp));
        self.remote_set.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        if !self.remote_set.load(Ordering::SeqCst) {
            anyhow::bail!("no remote description");
        }
        self.record(format!("candidate:{}", candidate.candidate));
        Ok(())
    }

    async fn add_local_tracks(&self, _stream: &()) -> Result<()> {
        Ok(())
    }
}
