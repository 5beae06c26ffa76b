//! WebSocket transport implementation using `tokio-tungstenite`.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{CloseInfo, Connection, Connector, Incoming, TransportError};

/// Close code browsers report when a close frame carried no status.
const NO_STATUS_RECEIVED: u16 = 1005;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A [`Connector`] that dials WebSocket endpoints.
///
/// `ws://` works out of the box; `wss://` needs the `tls` feature.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    type Connection = WebSocketConnection;

    async fn connect(
        &self,
        url: &str,
    ) -> Result<Self::Connection, TransportError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectFailed {
                url: url.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ),
            })?;
        tracing::debug!(url, "WebSocket connection open");
        Ok(WebSocketConnection { ws })
    }
}

/// A single client-side WebSocket connection.
pub struct WebSocketConnection {
    ws: WsStream,
}

impl Connection for WebSocketConnection {
    async fn send(&mut self, data: Bytes) -> Result<(), TransportError> {
        self.ws.send(Message::Binary(data)).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    async fn recv(&mut self) -> Result<Incoming, TransportError> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Incoming::Binary(data));
                }
                Some(Ok(Message::Close(frame))) => {
                    let info = match frame {
                        Some(frame) => CloseInfo {
                            code: u16::from(frame.code),
                            reason: frame.reason.to_string(),
                            was_clean: true,
                        },
                        None => CloseInfo {
                            code: NO_STATUS_RECEIVED,
                            reason: String::new(),
                            was_clean: true,
                        },
                    };
                    return Ok(Incoming::Closed(info));
                }
                Some(Ok(Message::Text(_))) => {
                    // The service only speaks binary envelopes.
                    tracing::debug!("dropping text frame");
                }
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
                None => {
                    return Ok(Incoming::Closed(CloseInfo::abnormal(
                        "stream ended without close frame",
                    )));
                }
            }
        }
    }

    async fn close(
        &mut self,
        code: u16,
        reason: &str,
    ) -> Result<(), TransportError> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        self.ws.close(Some(frame)).await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }
}
