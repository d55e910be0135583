//! Heartbeat loop
//!
//! One loop per shard for the shard's lifetime. It beats, sleeps for the
//! interval Hello supplied, then checks that the beat was acknowledged. The
//! sleep wakes as soon as the shard is closed.

use std::sync::Arc;

use super::shard::Shard;
use super::stopped;

impl Shard {
    /// Start the heartbeat loop unless it is already running or the shard is closed
    pub fn ensure_heartbeat(self: &Arc<Self>) -> bool {
        if self.is_stopped() || !self.mark_heartbeat_started() {
            return false;
        }
        let shard = Arc::clone(self);
        self.track(tokio::spawn(async move { shard.heartbeat_loop().await }));
        tracing::debug!(shard = %self.info(), "Heartbeat loop started");
        true
    }

    /// Reconnect if the last beat went unacknowledged.
    ///
    /// Returns whether this call triggered the reconnect.
    pub fn check_heartbeat_ack(&self) -> bool {
        if self.is_heartbeat_acked() || self.is_reconnecting() || self.is_stopped() {
            return false;
        }
        tracing::warn!(shard = %self.info(), "Heartbeat not acknowledged");
        self.request_reconnect("heartbeat not acknowledged")
    }

    async fn heartbeat_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown_receiver();

        while !self.is_stopped() {
            // No beats between connections
            if !self.is_reconnecting() && self.connected() {
                if let Err(e) = self.send_heartbeat().await {
                    tracing::debug!(shard = %self.info(), error = %e, "Failed to send heartbeat");
                }
            }

            tokio::select! {
                () = tokio::time::sleep(self.heartbeat_interval()) => {}
                () = stopped(&mut shutdown) => break,
            }
            self.check_heartbeat_ack();
        }

        tracing::debug!(shard = %self.info(), "Heartbeat loop stopped");
    }
}
