//! Gateway shards

mod heartbeat;
mod lane;
mod shard;
mod state;

pub use lane::{lane, DispatchFrame, LaneItem, LaneReceiver, LaneSender, LANE_CAPACITY};
pub use shard::Shard;
pub use state::{ShardInfo, ShardState};

use tokio::sync::watch;

/// Resolve once the shutdown flag is raised or its sender is gone
pub(crate) async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
