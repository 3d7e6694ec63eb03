//! Identity normalization for cross-source record linkage
//!
//! Every key used to join records across sources is derived here and
//! nowhere else. Both normalizers are pure and idempotent: feeding a
//! normalized key back in returns it unchanged, so defensive
//! re-normalization at load boundaries is always safe.

/// Punctuation replaced with spaces when deriving a title key
const TITLE_PUNCTUATION: &[char] = &[
    ':', ';', ',', '.', '(', ')', '[', ']', '{', '}', '\'', '"', '/', '\\', '|',
];

/// Placeholder strings that mean "no ISBN" in upstream exports
fn is_missing_marker(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "" | "nan" | "none" | "null" | "n/a" | "na"
    )
}

/// Normalize a raw ISBN into its canonical join key
///
/// Strips hyphens and spaces, rejects empty or placeholder values,
/// uppercases (ISBN-10 check digits may be `X`), and left-pads purely
/// numeric strings shorter than 10 digits with zeros. Returns `None`
/// when no usable key can be derived.
pub fn normalize_isbn(raw: &str) -> Option<String> {
    let s: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect();

    if is_missing_marker(&s) {
        return None;
    }

    let mut s = s.to_ascii_uppercase();
    if s.len() < 10 && s.bytes().all(|b| b.is_ascii_digit()) {
        let mut padded = "0".repeat(10 - s.len());
        padded.push_str(&s);
        s = padded;
    }

    Some(s)
}

/// Normalize a raw title into its canonical join key
///
/// Lowercases, replaces the fixed punctuation set with spaces, collapses
/// runs of whitespace, and trims. Returns `None` when nothing survives.
pub fn normalize_title(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }

    let replaced: String = lowered
        .chars()
        .map(|c| if TITLE_PUNCTUATION.contains(&c) { ' ' } else { c })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Similarity between two normalized title keys
///
/// Normalized edit ratio in `[0.0, 1.0]`: symmetric, and 1.0 for a
/// string compared with itself. Empty input on either side scores 0.0.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(a, b)
}
