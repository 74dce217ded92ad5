use chrono::{DateTime, Local};
use serde::Serialize;

use super::emote::Emote;

/// One classified unit of a tokenized message.
///
/// Serializes with an explicit `type` discriminator so renderers can match
/// on it without guessing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageToken {
    Text { text: String },
    Emote { emote: Emote },
}

/// A fully tokenized chat message, ready for rendering.
#[derive(Clone, Debug, Serialize)]
pub struct ChatMessage {
    pub sender_name: String,
    pub sender_color: Option<String>,
    pub tokens: Vec<MessageToken>,
    pub timestamp: DateTime<Local>,
}
