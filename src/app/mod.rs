pub mod config;

use chrono::Local;
use tokio::sync::broadcast;

use crate::core::catalog::EmoteCatalog;
use crate::core::irc::Privmsg;
use crate::core::tokenizer;
use crate::events::app_event::{AppEvent, ChatEvent};
use crate::models::emote::Emote;
use crate::models::message::ChatMessage;
use crate::overlay::OverlayFrame;
use config::Config;

/// Owns the emote catalog and fans tokenized messages out to renderers.
pub struct App {
    config: Config,
    catalog: EmoteCatalog,
    frames: broadcast::Sender<String>,
}

impl App {
    pub fn new(config: Config, frames: broadcast::Sender<String>) -> Self {
        Self {
            config,
            catalog: EmoteCatalog::new(),
            frames,
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::CatalogLoaded(result) => self.handle_catalog_loaded(result),
            AppEvent::Chat(ChatEvent::Message(msg)) => self.handle_chat_message(msg),
            AppEvent::Chat(ChatEvent::Status { status, detail }) => {
                self.push(OverlayFrame::Status { status, detail });
            }
        }
    }

    fn handle_catalog_loaded(&mut self, result: Result<Vec<Emote>, String>) {
        match result {
            Ok(emotes) => {
                self.catalog.extend(emotes);
                tracing::info!(
                    "Successfully loaded {} third-party emotes.",
                    self.catalog.len()
                );
            }
            Err(e) => {
                // Non-fatal: unknown codes simply render as plain text.
                tracing::error!("Failed to load third-party emotes: {}", e);
            }
        }
    }

    fn handle_chat_message(&mut self, msg: Privmsg) {
        if self.config.is_excluded(&msg.sender_name) {
            tracing::debug!("Dropping message from excluded sender {}", msg.sender_name);
            return;
        }

        let ranges = (!msg.emotes.is_empty()).then_some(&msg.emotes);
        let tokens = match tokenizer::tokenize(&msg.text, ranges, &self.catalog) {
            Ok(tokens) => tokens,
            Err(e) => {
                // Upstream protocol violation; drop the message, keep going.
                tracing::warn!("Dropping message with malformed emote ranges: {}", e);
                return;
            }
        };

        self.push(OverlayFrame::Message(ChatMessage {
            sender_name: msg.sender_name,
            sender_color: msg.color,
            tokens,
            timestamp: Local::now(),
        }));
    }

    fn push(&self, frame: OverlayFrame) {
        let json = match serde_json::to_string(&frame) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize overlay frame: {}", e);
                return;
            }
        };

        // A send error only means no renderer is connected right now.
        let _ = self.frames.send(json);
    }
}
