//! Scheduled work

mod queue;

pub use queue::TaskQueue;
