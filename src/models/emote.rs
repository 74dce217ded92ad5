use serde::{Deserialize, Serialize};

const TWITCH_EMOTE_CDN: &str = "https://static-cdn.jtvnw.net/emoticons/v2";

/// A single emote usable in chat messages.
///
/// `code` is the literal text trigger; `id` is the provider's identifier
/// and is never interpreted beyond string formatting.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Emote {
    pub code: String,
    pub id: String,
    pub url: EmoteUrls,
}

/// Image URLs at ascending quality tiers.
///
/// Third-party providers do not always serve every tier; only `low` is
/// guaranteed to be present.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmoteUrls {
    pub low: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<String>,
}

impl EmoteUrls {
    /// The highest-quality URL available.
    pub fn best(&self) -> &str {
        self.high
            .as_deref()
            .or(self.mid.as_deref())
            .unwrap_or(&self.low)
    }
}

impl Emote {
    /// Builds an emote for a Twitch-native occurrence from its emote id.
    ///
    /// All three tiers exist on the Twitch CDN, so the URLs are derived
    /// without a network round trip. The result is per-message and never
    /// enters a catalog.
    pub fn from_native(code: impl Into<String>, id: impl Into<String>) -> Self {
        let id = id.into();
        let base = format!("{TWITCH_EMOTE_CDN}/{id}/default/dark");
        Self {
            code: code.into(),
            url: EmoteUrls {
                low: format!("{base}/1.0"),
                mid: Some(format!("{base}/2.0")),
                high: Some(format!("{base}/3.0")),
            },
            id,
        }
    }
}
