//! # Transport Seam
//!
//! The client only needs two things from a connection: the next inbound
//! frame, and a way to close it. [`Connector`] and [`Transport`] capture
//! exactly that, so the lifecycle logic can run against the real WebSocket
//! ([`WsConnector`]) or an in-memory script.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

use super::error::Result;

/// A frame as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text; every payload this client understands is text.
    Text(String),
    /// Binary payload, not used by the parking backend.
    Binary(Vec<u8>),
    /// The remote side closed the channel.
    Close,
}

/// Opens connections to the live-update endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Completes the handshake with `url` and returns the open transport.
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>>;
}

/// One open connection.
#[async_trait]
pub trait Transport: Send {
    /// Waits for the next frame. `None` means the connection is gone.
    async fn next_frame(&mut self) -> Option<Result<Frame>>;

    /// Closes the connection. Failures are not reported: the connection is
    /// being abandoned either way.
    async fn close(&mut self);
}

/// [`Connector`] backed by tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn Transport>> {
        let (stream, response) = connect_async(url.as_str()).await?;
        log::debug!("WebSocket handshake with {} completed ({})", url, response.status());
        Ok(Box::new(WsTransport { stream }))
    }
}

/// An open tokio-tungstenite stream.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(Frame::Text(text.as_str().to_owned()))),
                Ok(Message::Binary(bin)) => return Some(Ok(Frame::Binary(bin.to_vec()))),
                Ok(Message::Close(frame)) => {
                    log::debug!("Close frame received: {:?}", frame);
                    return Some(Ok(Frame::Close));
                }
                // tungstenite answers pings itself; nothing for the client here.
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            log::debug!("WebSocket close did not complete cleanly: {}", e);
        }
    }
}
