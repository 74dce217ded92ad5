//! Push boundary to renderer clients.
//!
//! Renderers (an OBS browser source, typically) connect to a local
//! WebSocket and receive JSON frames: a hello with render settings, one
//! frame per tokenized chat message, and connection status transitions.
//! Nothing is replayed; a client sees only what happens while it is
//! connected.

use eyre::{Context, Report};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::{accept_async, tungstenite::Message as WsMessage};

use crate::core::chat::ConnectionStatus;
use crate::models::message::ChatMessage;

/// One JSON frame pushed to every connected renderer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OverlayFrame {
    /// First frame after a client connects: render-relevant settings.
    Hello { message_text_color: String },
    Message(ChatMessage),
    Status {
        status: ConnectionStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

/// Accepts renderer connections and fans broadcast frames out to them.
pub async fn serve(
    listen_addr: String,
    hello: OverlayFrame,
    frames: broadcast::Sender<String>,
) -> Result<(), Report> {
    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Could not bind overlay server to {listen_addr}"))?;
    tracing::info!("Overlay server listening on {}", listen_addr);

    let hello = serde_json::to_string(&hello).context("Failed to serialize hello frame")?;

    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!("Renderer client connected from {}", peer);

        let rx = frames.subscribe();
        let hello = hello.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, hello, rx).await {
                tracing::debug!("Renderer client from {} dropped: {}", peer, e);
            }
        });
    }
}

async fn handle_client(
    stream: TcpStream,
    hello: String,
    mut frames: broadcast::Receiver<String>,
) -> Result<(), Report> {
    let ws = accept_async(stream).await?;
    let (mut write, mut read) = ws.split();

    write.send(WsMessage::text(hello)).await?;

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Ok(json) => write.send(WsMessage::text(json)).await?,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Renderer client lagged, skipped {} frames", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = read.next() => match incoming {
                Some(Ok(WsMessage::Close(_))) | None => break,
                // Renderers have nothing to say; ignore anything else.
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
        }
    }

    Ok(())
}
