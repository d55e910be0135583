//! Gateway transport
//!
//! A shard sees its connection as a pair of channels: frames to write and
//! transport events to read. [`GatewayTransport`] opens one such pair; the
//! WebSocket implementation lives in [`tungstenite`].

mod tungstenite;

use async_trait::async_trait;
use shardline_common::ClientResult;
use tokio::sync::mpsc;

pub use self::tungstenite::TungsteniteTransport;

/// Frame queued for the writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    /// Close the connection with this code; nothing is written afterwards
    Close(u16),
}

/// What the reader observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Always the first event of a connection
    Open,
    Message(String),
    Close { code: u16, reason: String },
    Error(String),
}

/// One open connection
#[derive(Debug)]
pub struct Connection {
    pub sender: mpsc::Sender<OutboundFrame>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Opens duplex connections to the gateway
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn open(&self, url: &str) -> ClientResult<Connection>;
}
