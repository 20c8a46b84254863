//! Greedy word wrapping against a pixel width.
//!
//! The wrapper knows nothing about fonts: callers hand it a measurement
//! closure (usually [`Face::measure`](crate::font::Face::measure)) and the
//! widest line they can afford.
//!
//! ```text
//! "2021-07-04 10:20:30"  ──wrap(90px)──▶  ["2021-07-04", "10:20:30"]
//! ```
//!
//! Rules:
//! - Tokens are split on whitespace and joined back with single spaces.
//! - As many tokens as fit go on one line.
//! - A token that is wider than the limit on its own is broken character by
//!   character. A single character that still does not fit gets a line of its
//!   own rather than being dropped.
//! - Empty input yields one empty line, never an empty vector.

/// Wrap `text` into lines whose measured width is at most `max_width`.
///
/// The only lines allowed to exceed `max_width` are single characters that
/// are wider than the limit by themselves.
pub fn wrap_text(text: &str, max_width: u32, measure: impl Fn(&str) -> u32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for token in text.split_whitespace() {
        if !current.is_empty() {
            let joined = format!("{current} {token}");
            if measure(&joined) <= max_width {
                current = joined;
                continue;
            }
            lines.push(std::mem::take(&mut current));
        }

        current = if measure(token) <= max_width {
            token.to_string()
        } else {
            break_token(token, max_width, &measure, &mut lines)
        };
    }

    lines.push(current);
    lines
}

/// Split an over-long token into character runs, pushing every full run to
/// `lines` and returning the unfinished tail.
fn break_token(
    token: &str,
    max_width: u32,
    measure: &impl Fn(&str) -> u32,
    lines: &mut Vec<String>,
) -> String {
    let mut part = String::new();
    for ch in token.chars() {
        part.push(ch);
        if part.chars().count() > 1 && measure(&part) > max_width {
            part.pop();
            lines.push(std::mem::take(&mut part));
            part.push(ch);
        }
    }
    part
}
