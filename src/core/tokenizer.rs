//! Message tokenizer.
//!
//! Turns a raw chat message plus the server-reported native emote ranges
//! into an ordered list of render tokens. Concatenating the substrings
//! the tokens stand for reproduces the message exactly: text tokens carry
//! their literal text, emote tokens stand for the code they replaced.

use std::collections::HashMap;

use eyre::{Report, eyre};

use crate::core::catalog::EmoteCatalog;
use crate::models::{emote::Emote, message::MessageToken};
use crate::utils::text_processing::{TextPiece, split_whitespace_runs};

/// Native emote annotations as delivered by the chat transport:
/// emote id mapped to inclusive `"start-end"` ranges, one per occurrence.
pub type EmoteRangeMap = HashMap<String, Vec<String>>;

struct EmoteRange {
    start: usize,
    end: usize,
    emote_id: String,
}

/// Tokenizes `message` into text runs and emote references.
///
/// Native ranges take precedence over catalog word matching: each range
/// becomes one emote token synthesized from the covered substring, and
/// only the text between ranges is handed to the catalog-aware word
/// splitter. Range offsets are UTF-16 code units, the chat protocol's
/// indexing.
///
/// Malformed ranges (non-numeric bounds, inverted or out-of-bounds
/// offsets, surrogate splits) are protocol violations and fail loudly;
/// the caller is expected to drop the message rather than render garbage.
pub fn tokenize(
    message: &str,
    native_ranges: Option<&EmoteRangeMap>,
    catalog: &EmoteCatalog,
) -> Result<Vec<MessageToken>, Report> {
    let ranges = match native_ranges {
        Some(map) => flatten_ranges(map)?,
        None => Vec::new(),
    };

    if ranges.is_empty() {
        return Ok(tokenize_text_chunk(message, catalog));
    }

    let units: Vec<u16> = message.encode_utf16().collect();
    let mut tokens = Vec::new();
    let mut cursor = 0usize;

    for range in &ranges {
        if range.end >= units.len() {
            return Err(eyre!(
                "Emote range {}-{} is out of bounds for a message of {} units",
                range.start,
                range.end,
                units.len()
            ));
        }

        if range.start > cursor {
            let chunk = utf16_slice(&units, cursor, range.start)?;
            tokens.extend(tokenize_text_chunk(&chunk, catalog));
        }

        // Overlapping or backward ranges are processed as-is; the cursor
        // advances unconditionally.
        let code = utf16_slice(&units, range.start, range.end + 1)?;
        tokens.push(MessageToken::Emote {
            emote: Emote::from_native(code, range.emote_id.clone()),
        });
        cursor = range.end + 1;
    }

    if cursor < units.len() {
        let chunk = utf16_slice(&units, cursor, units.len())?;
        tokens.extend(tokenize_text_chunk(&chunk, catalog));
    }

    Ok(tokens)
}

/// Flattens the range map into one entry per occurrence, sorted ascending
/// by start offset.
///
/// Map iteration order is arbitrary, so ids are visited in sorted order
/// and the start sort is stable; equal starts therefore resolve the same
/// way on every run.
fn flatten_ranges(map: &EmoteRangeMap) -> Result<Vec<EmoteRange>, Report> {
    let mut ids: Vec<&String> = map.keys().collect();
    ids.sort();

    let mut ranges = Vec::new();
    for id in ids {
        for raw in &map[id] {
            ranges.push(parse_range(raw, id)?);
        }
    }

    ranges.sort_by_key(|range| range.start);
    Ok(ranges)
}

fn parse_range(raw: &str, emote_id: &str) -> Result<EmoteRange, Report> {
    let (start, end) = raw
        .split_once('-')
        .ok_or_else(|| eyre!("Malformed emote range `{raw}`"))?;
    let start: usize = start
        .parse()
        .map_err(|_| eyre!("Non-numeric bound in emote range `{raw}`"))?;
    let end: usize = end
        .parse()
        .map_err(|_| eyre!("Non-numeric bound in emote range `{raw}`"))?;
    if start > end {
        return Err(eyre!("Inverted emote range `{raw}`"));
    }

    Ok(EmoteRange {
        start,
        end,
        emote_id: emote_id.to_string(),
    })
}

fn utf16_slice(units: &[u16], start: usize, end: usize) -> Result<String, Report> {
    String::from_utf16(&units[start..end])
        .map_err(|_| eyre!("Emote range splits a surrogate pair at {start}-{end}"))
}

/// Tokenizes a contiguous raw-text span: whitespace runs stay verbatim as
/// text tokens, words resolve against the catalog by exact match only.
fn tokenize_text_chunk(chunk: &str, catalog: &EmoteCatalog) -> Vec<MessageToken> {
    split_whitespace_runs(chunk)
        .into_iter()
        .map(|piece| match piece {
            TextPiece::Whitespace(ws) => MessageToken::Text {
                text: ws.to_string(),
            },
            TextPiece::Word(word) => match catalog.lookup(word) {
                Some(emote) => MessageToken::Emote {
                    emote: emote.clone(),
                },
                None => MessageToken::Text {
                    text: word.to_string(),
                },
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::emote::EmoteUrls;

    fn catalog_with(entries: &[(&str, &str)]) -> EmoteCatalog {
        let mut catalog = EmoteCatalog::new();
        catalog.extend(entries.iter().map(|(code, id)| Emote {
            code: (*code).into(),
            id: (*id).into(),
            url: EmoteUrls {
                low: "L".into(),
                mid: None,
                high: None,
            },
        }));
        catalog
    }

    fn ranges(entries: &[(&str, &[&str])]) -> EmoteRangeMap {
        entries
            .iter()
            .map(|(id, list)| {
                (
                    (*id).to_string(),
                    list.iter().map(|r| (*r).to_string()).collect(),
                )
            })
            .collect()
    }

    /// Rebuilds the original message from a token list.
    fn reassemble(tokens: &[MessageToken]) -> String {
        tokens
            .iter()
            .map(|token| match token {
                MessageToken::Text { text } => text.as_str(),
                MessageToken::Emote { emote } => emote.code.as_str(),
            })
            .collect()
    }

    #[test]
    fn empty_message_yields_no_tokens() {
        let catalog = EmoteCatalog::new();
        assert!(tokenize("", None, &catalog).unwrap().is_empty());
    }

    #[test]
    fn whitespace_runs_are_preserved_exactly() {
        let catalog = EmoteCatalog::new();
        let tokens = tokenize("a  b", None, &catalog).unwrap();
        assert_eq!(
            tokens,
            vec![
                MessageToken::Text { text: "a".into() },
                MessageToken::Text { text: "  ".into() },
                MessageToken::Text { text: "b".into() },
            ]
        );
    }

    #[test]
    fn catalog_matching_is_whole_word_only() {
        let catalog = catalog_with(&[("Kappa", "k1")]);

        let tokens = tokenize("Kappa2", None, &catalog).unwrap();
        assert_eq!(
            tokens,
            vec![MessageToken::Text {
                text: "Kappa2".into()
            }]
        );

        let tokens = tokenize("Kappa", None, &catalog).unwrap();
        assert!(matches!(&tokens[0], MessageToken::Emote { emote } if emote.id == "k1"));
    }

    #[test]
    fn catalog_scenario_resolves_known_word() {
        let mut catalog = EmoteCatalog::new();
        catalog.extend([Emote {
            code: "PogChamp".into(),
            id: "poggers-1".into(),
            url: EmoteUrls {
                low: "L".into(),
                mid: None,
                high: None,
            },
        }]);

        let tokens = tokenize("PogChamp hi", None, &catalog).unwrap();
        assert_eq!(tokens.len(), 3);
        assert!(matches!(&tokens[0], MessageToken::Emote { emote } if emote.code == "PogChamp"));
        assert_eq!(tokens[1], MessageToken::Text { text: " ".into() });
        assert_eq!(tokens[2], MessageToken::Text { text: "hi".into() });
    }

    #[test]
    fn native_ranges_take_precedence_over_word_matching() {
        // "World" is also in the catalog; the native range must win.
        let catalog = catalog_with(&[("World", "third-party")]);
        let map = ranges(&[("123", &["6-10"])]);

        let tokens = tokenize("hello World bye", Some(&map), &catalog).unwrap();
        assert_eq!(
            tokens,
            vec![
                MessageToken::Text {
                    text: "hello".into()
                },
                MessageToken::Text { text: " ".into() },
                MessageToken::Emote {
                    emote: Emote::from_native("World", "123"),
                },
                MessageToken::Text { text: " ".into() },
                MessageToken::Text { text: "bye".into() },
            ]
        );
        assert_eq!(reassemble(&tokens), "hello World bye");
    }

    #[test]
    fn ranges_are_processed_in_ascending_start_order() {
        let catalog = EmoteCatalog::new();
        // Supplied out of order across two ids.
        let map = ranges(&[("900", &["6-12"]), ("25", &["0-4"])]);

        let tokens = tokenize("Kappa HeyGuys", Some(&map), &catalog).unwrap();
        assert!(
            matches!(&tokens[0], MessageToken::Emote { emote } if emote.id == "25" && emote.code == "Kappa")
        );
        assert!(
            matches!(&tokens[2], MessageToken::Emote { emote } if emote.id == "900" && emote.code == "HeyGuys")
        );
    }

    #[test]
    fn repeated_emote_uses_one_token_per_occurrence() {
        let catalog = EmoteCatalog::new();
        // Occurrences listed out of order within the id.
        let map = ranges(&[("25", &["9-13", "0-4"])]);

        let tokens = tokenize("Kappa hi Kappa", Some(&map), &catalog).unwrap();
        let emote_count = tokens
            .iter()
            .filter(|t| matches!(t, MessageToken::Emote { .. }))
            .count();
        assert_eq!(emote_count, 2);
        assert_eq!(reassemble(&tokens), "Kappa hi Kappa");
    }

    #[test]
    fn offsets_are_utf16_code_units() {
        let catalog = EmoteCatalog::new();
        // The flame emoji is two UTF-16 units, so "Kappa" spans 3-7.
        let map = ranges(&[("25", &["3-7"])]);

        let tokens = tokenize("\u{1F525} Kappa", Some(&map), &catalog).unwrap();
        assert_eq!(
            tokens,
            vec![
                MessageToken::Text {
                    text: "\u{1F525}".into()
                },
                MessageToken::Text { text: " ".into() },
                MessageToken::Emote {
                    emote: Emote::from_native("Kappa", "25"),
                },
            ]
        );
    }

    #[test]
    fn overlapping_ranges_are_processed_deterministically() {
        let catalog = EmoteCatalog::new();
        // Two ids claim the same span; flattening visits ids in sorted
        // order and the cursor advances unconditionally.
        let map = ranges(&[("b", &["0-1"]), ("a", &["0-1"])]);

        let tokens = tokenize("ab", Some(&map), &catalog).unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(matches!(&tokens[0], MessageToken::Emote { emote } if emote.id == "a"));
        assert!(matches!(&tokens[1], MessageToken::Emote { emote } if emote.id == "b"));
    }

    #[test]
    fn malformed_ranges_are_rejected() {
        let catalog = EmoteCatalog::new();

        for raw in ["x-4", "4", "4-y", "5-2"] {
            let map = ranges(&[("25", &[raw])]);
            assert!(
                tokenize("hello world", Some(&map), &catalog).is_err(),
                "range `{raw}` should be rejected"
            );
        }
    }

    #[test]
    fn out_of_bounds_range_is_rejected() {
        let catalog = EmoteCatalog::new();
        let map = ranges(&[("25", &["0-99"])]);
        assert!(tokenize("short", Some(&map), &catalog).is_err());
    }

    #[test]
    fn tokenization_is_lossless() {
        let catalog = catalog_with(&[("catJAM", "cj")]);
        let map = ranges(&[("25", &["0-4"]), ("33", &["13-19"])]);
        let message = "Kappa catJAM DansGame  done";

        let tokens = tokenize(message, Some(&map), &catalog).unwrap();
        assert_eq!(reassemble(&tokens), message);
    }
}
