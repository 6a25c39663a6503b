//! Fuzzy label matching
//!
//! OCR output from a phone snapshot of a printed bin label is noisy:
//! inserted whitespace, dropped letters, stray punctuation. Instead of edit
//! distance, matching counts how many characters of a known label appear in
//! order inside the extracted text, which tolerates arbitrary junk between
//! otherwise-correct characters.

/// Count the characters of `label` found in order within `input`,
/// case-insensitive. A single cursor walks `input` left to right; each label
/// character is searched for at or after the cursor, and on a hit the cursor
/// moves past it. A label character with no remaining occurrence is skipped
/// without consuming input, so later characters can still match.
pub fn in_order_matches(input: &str, label: &str) -> usize {
    let input: Vec<char> = input.to_lowercase().chars().collect();
    let mut cursor = 0;
    let mut matched = 0;

    for c in label.to_lowercase().chars() {
        if let Some(pos) = input[cursor..].iter().position(|&ic| ic == c) {
            matched += 1;
            cursor += pos + 1;
        }
    }

    matched
}

/// Pick the vocabulary label that best explains the extracted text.
///
/// A label qualifies when its score reaches at least half its own length,
/// rounded up. Among qualifying labels the strictly highest score wins;
/// ties keep the earliest label in vocabulary order. Returns `None` when no
/// label clears its threshold.
pub fn best_match<'a>(input: &str, labels: &'a [String]) -> Option<&'a str> {
    let mut best: Option<&str> = None;
    let mut best_score = 0;

    for label in labels {
        let length = label.chars().count();
        let score = in_order_matches(input, label);
        if score >= (length + 1) / 2 && score > best_score {
            best = Some(label);
            best_score = score;
        }
    }

    best
}

/// Load the known-label vocabulary: one label per line, trimmed and
/// lowercased, empty lines skipped. Order is preserved; it is the tie-break
/// order for `best_match`.
pub fn load_vocabulary(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim().to_lowercase())
        .filter(|line| !line.is_empty())
        .collect()
}
