//! Per-shard dispatch lane
//!
//! The read loop pushes every dispatch frame and lifecycle event into a bounded
//! channel consumed by one task, so a shard's frames reach the dispatcher in
//! wire order without the read loop ever running handler code.

use shardline_core::Document;
use tokio::sync::mpsc;

use super::state::ShardInfo;
use crate::events::Event;

/// Frames buffered per shard before the read loop waits
pub const LANE_CAPACITY: usize = 1024;

/// One op 0 frame as received
#[derive(Debug, Clone)]
pub struct DispatchFrame {
    pub shard: ShardInfo,
    pub name: String,
    pub sequence: Option<u64>,
    pub data: Document,
}

/// Item carried by the lane
#[derive(Debug, Clone)]
pub enum LaneItem {
    Dispatch(DispatchFrame),
    /// Raised by the shard itself
    Lifecycle(Event),
}

pub type LaneSender = mpsc::Sender<LaneItem>;
pub type LaneReceiver = mpsc::Receiver<LaneItem>;

/// Create a lane
pub fn lane() -> (LaneSender, LaneReceiver) {
    mpsc::channel(LANE_CAPACITY)
}
