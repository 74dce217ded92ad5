use crate::core::chat::ConnectionStatus;
use crate::core::irc::Privmsg;
use crate::models::emote::Emote;

#[derive(Debug)]
pub enum AppEvent {
    /// Result of the one-shot third-party emote fetch. A failure is
    /// non-fatal; the catalog just stays as it was.
    CatalogLoaded(Result<Vec<Emote>, String>),
    Chat(ChatEvent),
}

#[derive(Debug)]
pub enum ChatEvent {
    Message(Privmsg),
    Status {
        status: ConnectionStatus,
        detail: Option<String>,
    },
}
