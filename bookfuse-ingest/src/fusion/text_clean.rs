//! Free-text canonicalization
//!
//! Descriptions arrive from three sources with three kinds of damage:
//! UTF-8 read back as Latin-1 (mojibake), leftover HTML markup and
//! entities, and filler placeholders standing in for real text. Every
//! free-text field passes through `clean_text` before fusion so the
//! precedence rules only ever compare usable prose.

use once_cell::sync::Lazy;
use regex::Regex;

/// Mojibake sequences repaired before any other step
///
/// Ordered longest-first so multi-byte sequences are repaired before a
/// shorter prefix of the same bytes can consume them.
const MOJIBAKE_REPAIRS: &[(&str, &str)] = &[
    ("\u{00e2}\u{20ac}\u{2122}", "'"),
    ("\u{00e2}\u{20ac}\u{0153}", "\""),
    ("\u{00e2}\u{20ac}\u{201d}", "-"),
    ("\u{00e2}\u{20ac}\u{201c}", "-"),
    ("\u{00e2}\u{20ac}", "\""),
];

/// Placeholder strings that are not real descriptions
const PLACEHOLDER_TEXT: &[&str] = &[
    "nan",
    "none",
    "null",
    "n/a",
    "na",
    "description not available",
    "not available",
    "no description",
    "no description available",
];

static BR_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
/// Markers after which a description degenerates into a chapter list
static CONTENTS_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)table of contents|contents:").unwrap());

/// Canonicalize one free-text field, or reject it entirely
///
/// Returns `None` when nothing usable remains. Idempotent: cleaning
/// already-clean text returns it unchanged.
pub fn clean_text(raw: &str) -> Option<String> {
    let mut text = raw.to_string();

    for (broken, repaired) in MOJIBAKE_REPAIRS {
        text = text.replace(broken, repaired);
    }

    text = decode_entities(&text);
    text = BR_TAG.replace_all(&text, " ").into_owned();
    text = HTML_TAG.replace_all(&text, " ").into_owned();
    text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    text = truncate_at_contents(&text);
    let text = text.trim().to_string();

    if text.is_empty() {
        return None;
    }
    if PLACEHOLDER_TEXT.contains(&text.to_lowercase().as_str()) {
        return None;
    }

    Some(text)
}

/// Decode the HTML entities that actually occur in catalog text
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];

        // Entities are short; scan a bounded byte window for the ';'
        let Some(end) = rest.bytes().take(12).position(|b| b == b';') else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };

        let entity = &rest[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => decode_numeric_entity(entity),
        };

        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok()?
    } else {
        return None;
    };
    char::from_u32(code)
}

/// Cut the text at the first chapter-list marker, keeping the prose
fn truncate_at_contents(text: &str) -> String {
    match CONTENTS_MARKER.find(text) {
        Some(m) => text[..m.start()].to_string(),
        None => text.to_string(),
    }
}
