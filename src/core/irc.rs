//! Minimal IRCv3 parsing for the Twitch chat protocol.
//!
//! Twitch delivers chat over IRC with message tags carrying the sender's
//! display name, color and native emote annotations. This module parses
//! raw lines into structured values; it never validates range numerics,
//! which is the tokenizer's fail-loud concern.

use std::collections::HashMap;

use eyre::{Report, eyre};

use crate::core::tokenizer::EmoteRangeMap;

/// A parsed IRC line: tags, prefix, command and parameters (the trailing
/// parameter, if any, is last).
#[derive(Debug, Default, PartialEq)]
pub struct IrcMessage {
    pub tags: HashMap<String, String>,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

/// Parses one raw IRC line.
pub fn parse_line(line: &str) -> Result<IrcMessage, Report> {
    let mut rest = line.trim_end_matches(['\r', '\n']);
    let mut msg = IrcMessage::default();

    if let Some(after) = rest.strip_prefix('@') {
        let (raw_tags, remainder) = after
            .split_once(' ')
            .ok_or_else(|| eyre!("IRC line ends after tags: {line}"))?;
        msg.tags = parse_tags(raw_tags);
        rest = remainder;
    }

    if let Some(after) = rest.strip_prefix(':') {
        let (prefix, remainder) = after
            .split_once(' ')
            .ok_or_else(|| eyre!("IRC line ends after prefix: {line}"))?;
        msg.prefix = Some(prefix.to_string());
        rest = remainder;
    }

    let (head, trailing) = match rest.split_once(" :") {
        Some((head, trailing)) => (head, Some(trailing)),
        None => (rest, None),
    };

    let mut parts = head.split_ascii_whitespace();
    msg.command = parts
        .next()
        .ok_or_else(|| eyre!("IRC line has no command: {line}"))?
        .to_string();
    msg.params = parts.map(str::to_string).collect();
    if let Some(trailing) = trailing {
        msg.params.push(trailing.to_string());
    }

    Ok(msg)
}

fn parse_tags(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (!key.is_empty()).then(|| (key.to_string(), unescape_tag_value(value)))
        })
        .collect()
}

/// IRCv3 tag value unescaping (`\:` `\s` `\\` `\r` `\n`).
fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Parses the `emotes` tag (`id:0-4,6-10/id2:12-14`) into the range map
/// the tokenizer consumes. Ranges stay as raw `"start-end"` strings.
pub fn parse_emote_tag(value: &str) -> EmoteRangeMap {
    let mut map = EmoteRangeMap::new();
    for group in value.split('/').filter(|group| !group.is_empty()) {
        let Some((id, ranges)) = group.split_once(':') else {
            continue;
        };
        map.entry(id.to_string())
            .or_default()
            .extend(ranges.split(',').map(str::to_string));
    }
    map
}

/// The parts of a PRIVMSG the overlay cares about.
#[derive(Debug, Clone)]
pub struct Privmsg {
    pub sender_name: String,
    pub color: Option<String>,
    pub emotes: EmoteRangeMap,
    pub text: String,
}

impl Privmsg {
    /// Extracts a chat message from a parsed line, or `None` for any other
    /// command.
    pub fn from_irc(msg: &IrcMessage) -> Option<Self> {
        if msg.command != "PRIVMSG" {
            return None;
        }
        // params[0] is the channel, the trailing param is the text.
        let text = msg.params.get(1)?.clone();

        let sender_name = msg
            .tags
            .get("display-name")
            .filter(|name| !name.is_empty())
            .cloned()
            .or_else(|| {
                msg.prefix
                    .as_deref()
                    .and_then(nick_of)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "<unknown>".to_string());

        let color = msg
            .tags
            .get("color")
            .filter(|color| color.len() == 7 && color.starts_with('#'))
            .cloned();

        let emotes = msg
            .tags
            .get("emotes")
            .map(|value| parse_emote_tag(value))
            .unwrap_or_default();

        Some(Self {
            sender_name,
            color,
            emotes,
            text,
        })
    }
}

fn nick_of(prefix: &str) -> Option<&str> {
    prefix.split('!').next().filter(|nick| !nick.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_tagged_privmsg() {
        let line = "@badge-info=;color=#8A2BE2;display-name=Streamer;emotes=25:0-4 \
                    :streamer!streamer@streamer.tmi.twitch.tv PRIVMSG #somechannel :Kappa hi";
        let msg = parse_line(line).unwrap();

        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#somechannel", "Kappa hi"]);
        assert_eq!(
            msg.prefix.as_deref(),
            Some("streamer!streamer@streamer.tmi.twitch.tv")
        );
        assert_eq!(msg.tags.get("display-name").unwrap(), "Streamer");

        let privmsg = Privmsg::from_irc(&msg).unwrap();
        assert_eq!(privmsg.sender_name, "Streamer");
        assert_eq!(privmsg.color.as_deref(), Some("#8A2BE2"));
        assert_eq!(privmsg.text, "Kappa hi");
        assert_eq!(privmsg.emotes.get("25").unwrap(), &vec!["0-4".to_string()]);
    }

    #[test]
    fn parses_server_ping() {
        let msg = parse_line("PING :tmi.twitch.tv").unwrap();
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.params, vec!["tmi.twitch.tv"]);
    }

    #[test]
    fn unescapes_tag_values() {
        let msg = parse_line("@system-msg=5\\sraiders\\sfrom\\sX\\shave\\sjoined!;msg-id=raid \
                              :tmi.twitch.tv USERNOTICE #chan")
            .unwrap();
        assert_eq!(
            msg.tags.get("system-msg").unwrap(),
            "5 raiders from X have joined!"
        );
    }

    #[test]
    fn emote_tag_with_multiple_ids_and_occurrences() {
        let map = parse_emote_tag("25:0-4,12-16/1902:6-10");
        assert_eq!(
            map.get("25").unwrap(),
            &vec!["0-4".to_string(), "12-16".to_string()]
        );
        assert_eq!(map.get("1902").unwrap(), &vec!["6-10".to_string()]);

        assert!(parse_emote_tag("").is_empty());
    }

    #[test]
    fn sender_name_falls_back_to_the_prefix_nick() {
        let msg = parse_line(":viewer!viewer@viewer.tmi.twitch.tv PRIVMSG #chan :hello").unwrap();
        let privmsg = Privmsg::from_irc(&msg).unwrap();
        assert_eq!(privmsg.sender_name, "viewer");
        assert!(privmsg.color.is_none());
        assert!(privmsg.emotes.is_empty());
    }

    #[test]
    fn malformed_colors_are_dropped() {
        let msg =
            parse_line("@color=red;display-name=V :v!v@v.tmi.twitch.tv PRIVMSG #chan :hi").unwrap();
        let privmsg = Privmsg::from_irc(&msg).unwrap();
        assert!(privmsg.color.is_none());
    }

    #[test]
    fn non_privmsg_commands_yield_no_message() {
        let msg = parse_line(":tmi.twitch.tv 001 justinfan123 :Welcome, GLHF!").unwrap();
        assert_eq!(msg.command, "001");
        assert!(Privmsg::from_irc(&msg).is_none());
    }
}
