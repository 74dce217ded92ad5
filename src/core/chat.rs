//! Anonymous Twitch chat connection.
//!
//! Reads a single channel's chat over the IRC WebSocket gateway with a
//! `justinfan` nick, so no authentication is involved. Parsed messages and
//! connection status transitions are reported to the application loop over
//! an mpsc channel; tokenization happens there, not here.

use std::time::Duration;

use eyre::{Report, eyre};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use crate::core::irc::{self, IrcMessage, Privmsg};
use crate::events::app_event::{AppEvent, ChatEvent};

const TWITCH_IRC_URL: &str = "wss://irc-ws.chat.twitch.tv:443";
const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection lifecycle as reported to renderers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

/// Read-only chat client for a single channel.
pub struct ChatClient {
    channel: String,
    event_tx: mpsc::Sender<AppEvent>,
}

impl ChatClient {
    pub fn new(channel: String, event_tx: mpsc::Sender<AppEvent>) -> Self {
        Self { channel, event_tx }
    }

    /// Connects and keeps reading until the reconnect attempts run out.
    ///
    /// Backoff doubles from one second per failed attempt; the counter
    /// resets as soon as a session shows activity again.
    pub async fn run(self) {
        let mut attempts: u32 = 0;

        loop {
            self.send_status(ConnectionStatus::Connecting, None).await;

            match self.run_session(&mut attempts).await {
                Ok(()) => {
                    tracing::info!("Chat session ended, reconnecting");
                }
                Err(e) => {
                    tracing::warn!("Chat session failed: {e}");
                }
            }
            self.send_status(ConnectionStatus::Disconnected, None).await;

            if attempts >= MAX_RECONNECT_ATTEMPTS {
                let detail = format!("Failed to connect after {MAX_RECONNECT_ATTEMPTS} attempts");
                tracing::error!("{detail}");
                self.send_status(ConnectionStatus::Error, Some(detail)).await;
                return;
            }

            let delay = reconnect_delay(attempts);
            attempts += 1;
            tracing::info!(
                "Reconnecting in {:?} (attempt {}/{})",
                delay,
                attempts,
                MAX_RECONNECT_ATTEMPTS
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// One connection: handshake, join, then read until the stream ends.
    async fn run_session(&self, attempts: &mut u32) -> Result<(), Report> {
        let (ws_stream, _) = connect_async(TWITCH_IRC_URL).await?;
        let (mut write, mut read) = ws_stream.split();

        write
            .send(WsMessage::text("CAP REQ :twitch.tv/tags twitch.tv/commands"))
            .await?;
        write
            .send(WsMessage::text(format!("NICK {}", anonymous_nick())))
            .await?;
        write
            .send(WsMessage::text(format!("JOIN #{}", self.channel)))
            .await?;

        let mut joined = false;
        let mut join_deadline = Instant::now() + JOIN_TIMEOUT;

        loop {
            let frame = if joined {
                read.next().await
            } else {
                // Connected but not yet in the channel; if the JOIN never
                // confirms, the channel name is probably wrong.
                match tokio::time::timeout_at(join_deadline, read.next()).await {
                    Ok(frame) => frame,
                    Err(_) => {
                        self.send_status(
                            ConnectionStatus::Error,
                            Some(format!(
                                "Channel #{} not found or unavailable",
                                self.channel
                            )),
                        )
                        .await;
                        return Err(eyre!("Timed out joining #{}", self.channel));
                    }
                }
            };

            let Some(frame) = frame else {
                return Ok(());
            };

            match frame? {
                WsMessage::Text(payload) => {
                    for line in payload.lines().filter(|line| !line.is_empty()) {
                        let msg = match irc::parse_line(line) {
                            Ok(msg) => msg,
                            Err(e) => {
                                tracing::warn!("Dropping unparseable IRC line: {e}");
                                continue;
                            }
                        };

                        if *attempts > 0 {
                            *attempts = 0;
                        }

                        match msg.command.as_str() {
                            "PING" => {
                                let payload = msg.params.first().map(String::as_str).unwrap_or("");
                                write.send(WsMessage::text(format!("PONG :{payload}"))).await?;
                            }
                            "001" => {
                                tracing::info!(
                                    "Connected to Twitch IRC, joining channel: {}",
                                    self.channel
                                );
                                self.send_status(
                                    ConnectionStatus::Connecting,
                                    Some("Joining channel...".to_string()),
                                )
                                .await;
                                join_deadline = Instant::now() + JOIN_TIMEOUT;
                            }
                            "JOIN" => {
                                tracing::info!("Successfully joined channel: {}", self.channel);
                                joined = true;
                                self.send_status(ConnectionStatus::Connected, None).await;
                            }
                            "PRIVMSG" => {
                                if let Some(privmsg) = Privmsg::from_irc(&msg) {
                                    self.send_event(ChatEvent::Message(privmsg)).await;
                                }
                            }
                            "NOTICE" => self.handle_notice(&msg).await,
                            "RECONNECT" => {
                                tracing::info!("Server requested reconnect");
                                return Ok(());
                            }
                            _ => {}
                        }
                    }
                }
                WsMessage::Close(frame) => {
                    tracing::info!("WebSocket closed: {:?}", frame);
                    return Ok(());
                }
                _ => {}
            }
        }
    }

    async fn handle_notice(&self, msg: &IrcMessage) {
        let text = msg.params.get(1).cloned().unwrap_or_default();
        let msg_id = msg.tags.get("msg-id").map(String::as_str).unwrap_or("");
        tracing::info!("Notice [{}]: {}", msg_id, text);

        let detail = match msg_id {
            "msg_channel_suspended" | "msg_banned" => {
                Some(format!("Channel #{} is unavailable: {}", self.channel, text))
            }
            "no_permission" => Some(format!("No permission to access channel #{}", self.channel)),
            _ if msg_id == "msg_channel_not_found"
                || text.to_lowercase().contains("does not exist") =>
            {
                Some(format!("Channel #{} not found", self.channel))
            }
            _ => None,
        };

        if let Some(detail) = detail {
            self.send_status(ConnectionStatus::Error, Some(detail)).await;
        }
    }

    async fn send_status(&self, status: ConnectionStatus, detail: Option<String>) {
        self.send_event(ChatEvent::Status { status, detail }).await;
    }

    async fn send_event(&self, event: ChatEvent) {
        if self.event_tx.send(AppEvent::Chat(event)).await.is_err() {
            tracing::error!("Failed to send event to app loop: channel is closed.");
        }
    }
}

/// Twitch accepts any `justinfan<digits>` nick for read-only sessions.
fn anonymous_nick() -> String {
    format!("justinfan{}", std::process::id() % 100_000)
}

fn reconnect_delay(attempts: u32) -> Duration {
    INITIAL_RECONNECT_DELAY * 2u32.pow(attempts)
}
