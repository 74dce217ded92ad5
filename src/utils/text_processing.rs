use once_cell::sync::Lazy;
use regex::Regex;

/// A piece of a raw text span: a word candidate or the whitespace run
/// separating words.
#[derive(Debug, PartialEq)]
pub enum TextPiece<'a> {
    Word(&'a str),
    Whitespace(&'a str),
}

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Splits `text` on runs of whitespace, keeping the runs themselves so
/// that concatenating every piece reproduces `text` exactly.
pub fn split_whitespace_runs(text: &str) -> Vec<TextPiece<'_>> {
    let mut pieces = Vec::new();
    let mut last_end = 0;

    for mat in WHITESPACE_RUN.find_iter(text) {
        if mat.start() > last_end {
            pieces.push(TextPiece::Word(&text[last_end..mat.start()]));
        }
        pieces.push(TextPiece::Whitespace(mat.as_str()));
        last_end = mat.end();
    }

    if last_end < text.len() {
        pieces.push(TextPiece::Word(&text[last_end..]));
    }

    pieces
}
