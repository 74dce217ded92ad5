//! Third-party emote catalog.
//!
//! Holds every emote known for a channel session, fetched once from the
//! aggregation service, and resolves message words to emotes by exact
//! code match. A failed load is non-fatal: the catalog keeps whatever
//! state it had and unknown codes render as plain text.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use eyre::{Context, Report};
use serde::Deserialize;
use url::Url;

use crate::models::emote::Emote;

const AGGREGATOR_BASE: &str = "https://open.staroverlay.com/twitch/emotes";
const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Aggregator response wrapper.
#[derive(Debug, Deserialize)]
struct EmoteResponse {
    emotes: Vec<Emote>,
}

/// Session-scoped collection of known third-party emotes.
#[derive(Default)]
pub struct EmoteCatalog {
    emotes: HashSet<Emote>,
    by_code: HashMap<String, Emote>,
}

impl EmoteCatalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches the channel's emotes from the aggregation service and folds
    /// them into the catalog. On failure the catalog keeps its prior state
    /// and the error propagates to the caller; no retry is attempted.
    pub async fn load(&mut self, channel: &str, providers: &[String]) -> Result<(), Report> {
        let emotes = fetch_emotes(channel, providers).await?;
        self.extend(emotes);
        Ok(())
    }

    /// Inserts every emote; on code collision the last write wins.
    pub fn extend(&mut self, emotes: impl IntoIterator<Item = Emote>) {
        for emote in emotes {
            self.by_code.insert(emote.code.clone(), emote.clone());
            self.emotes.insert(emote);
        }
    }

    /// Looks up an emote by its exact code. No fuzzy or case-insensitive
    /// matching.
    pub fn lookup(&self, code: &str) -> Option<&Emote> {
        self.by_code.get(code)
    }

    /// Every emote currently loaded.
    pub fn all_emotes(&self) -> &HashSet<Emote> {
        &self.emotes
    }

    /// Number of distinct codes in the catalog.
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    /// Whether the catalog has loaded anything yet.
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Scans a space-separated message for known emote codes, in order of
    /// appearance.
    pub fn extract_emotes(&self, message: &str) -> Vec<&Emote> {
        message
            .split(' ')
            .filter_map(|part| self.lookup(part))
            .collect()
    }
}

/// One request to the aggregation service, covering every configured
/// provider for the given channel.
pub async fn fetch_emotes(channel: &str, providers: &[String]) -> Result<Vec<Emote>, Report> {
    let url = Url::parse_with_params(
        AGGREGATOR_BASE,
        &[
            ("providers", providers.join(",")),
            ("username", channel.to_string()),
        ],
    )
    .context("Invalid emote aggregator URL")?;

    let client = reqwest::Client::builder()
        .user_agent(APP_USER_AGENT)
        .timeout(Duration::from_secs(15))
        .build()?;

    let response: EmoteResponse = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
        .context("Malformed emote aggregator response")?;

    tracing::debug!(
        "Fetched {} third-party emotes for channel {}",
        response.emotes.len(),
        channel
    );
    Ok(response.emotes)
}
