//! WebSocket transport over tokio-tungstenite

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use shardline_common::{ClientError, ClientResult};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use super::{Connection, GatewayTransport, OutboundFrame, TransportEvent};

/// Channel buffer size for outgoing frames
const OUTBOUND_BUFFER_SIZE: usize = 64;

/// Channel buffer size for incoming events
const INBOUND_BUFFER_SIZE: usize = 256;

/// Close code reported when the stream ends without a close frame
const ABNORMAL_CLOSURE: u16 = 1006;

/// [`GatewayTransport`] that opens a WebSocket per connection
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteTransport;

impl TungsteniteTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GatewayTransport for TungsteniteTransport {
    async fn open(&self, url: &str) -> ClientResult<Connection> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let (mut ws_sink, mut ws_stream) = stream.split();

        let (out_tx, mut out_rx) = mpsc::channel::<OutboundFrame>(OUTBOUND_BUFFER_SIZE);
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(INBOUND_BUFFER_SIZE);

        // Open goes first so the shard sees it before any frame
        event_tx
            .send(TransportEvent::Open)
            .await
            .map_err(|_| ClientError::Transport("connection dropped during open".to_string()))?;

        // Spawn task to write outgoing frames
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                match frame {
                    OutboundFrame::Text(text) => {
                        if let Err(e) = ws_sink.send(Message::Text(text.into())).await {
                            tracing::debug!(error = %e, "Failed to write gateway frame");
                            break;
                        }
                    }
                    OutboundFrame::Close(code) => {
                        let frame = CloseFrame {
                            code: WsCloseCode::from(code),
                            reason: "".into(),
                        };
                        if let Err(e) = ws_sink.send(Message::Close(Some(frame))).await {
                            tracing::debug!(error = %e, "Failed to write close frame");
                        }
                        break;
                    }
                }
            }
            let _ = ws_sink.close().await;
        });

        // Spawn task to read incoming frames
        tokio::spawn(async move {
            let mut closed = false;
            while let Some(msg) = ws_stream.next().await {
                let event = match msg {
                    Ok(Message::Text(text)) => TransportEvent::Message(text.to_string()),
                    Ok(Message::Binary(_)) => {
                        tracing::debug!("Binary gateway frames are not supported");
                        continue;
                    }
                    Ok(Message::Close(frame)) => {
                        closed = true;
                        let (code, reason) = frame.map_or((ABNORMAL_CLOSURE, String::new()), |f| {
                            (u16::from(f.code), f.reason.to_string())
                        });
                        TransportEvent::Close { code, reason }
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        closed = true;
                        TransportEvent::Error(e.to_string())
                    }
                };
                if event_tx.send(event).await.is_err() || closed {
                    return;
                }
            }
            let _ = event_tx
                .send(TransportEvent::Close {
                    code: ABNORMAL_CLOSURE,
                    reason: "stream ended".to_string(),
                })
                .await;
        });

        Ok(Connection {
            sender: out_tx,
            events: event_rx,
        })
    }
}
