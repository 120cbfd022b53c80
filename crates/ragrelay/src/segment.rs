use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref REASONING: Regex = Regex::new(r"(?s)<think>.*?</think>").unwrap();
}

/// Remove reasoning side-channel markup, contents included.
///
/// Some models interleave `<think>...</think>` spans with the answer;
/// nothing inside them is meant for display.
pub fn strip_reasoning(raw: &str) -> String {
    REASONING.replace_all(raw, "").trim().to_string()
}

/// Split an answer into sentence-bounded units.
///
/// A unit ends at `.`, `?` or `!` followed by whitespace, with the
/// terminator kept attached. Whitespace runs inside a unit collapse to
/// single spaces and units that normalize to nothing are dropped, so
/// the units always concatenate back to the normalized answer.
pub fn split_units(answer: &str) -> Vec<String> {
    let mut units = Vec::new();
    let mut current = String::new();
    let mut chars = answer.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '?' | '!')
            && chars.peek().map_or(false, |next| next.is_whitespace())
        {
            push_normalized(&mut units, &current);
            current.clear();
        }
    }
    push_normalized(&mut units, &current);

    units
}

fn push_normalized(units: &mut Vec<String>, raw: &str) {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !normalized.is_empty() {
        units.push(normalized);
    }
}
