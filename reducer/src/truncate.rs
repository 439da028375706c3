//! Character-budget helpers shared by the chunker and the reducer.
//!
//! All lengths are counted in `char`s so that cuts always land on UTF-8
//! boundaries and budgets mean the same thing for every script.

pub const ELLIPSIS: &str = "...";

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the `n`th char, or `s.len()` when `s` is shorter.
pub fn byte_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

/// Cuts `text` to at most `max_chars`, appending [`ELLIPSIS`] when anything was
/// removed. The cut moves back to the previous word boundary when that boundary
/// lies within the last tenth of the budget; otherwise it falls exactly at the
/// limit.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if char_len(text) <= max_chars {
        return text.to_string();
    }

    let marker_len = char_len(ELLIPSIS);
    if max_chars <= marker_len {
        return text[..byte_offset(text, max_chars)].to_string();
    }

    let budget = max_chars - marker_len;
    let cut = byte_offset(text, budget);
    let head = &text[..cut];

    let next_is_space = text[cut..].starts_with(char::is_whitespace);
    let head = if next_is_space {
        head.trim_end()
    } else {
        match head.rfind(char::is_whitespace) {
            Some(space) if budget - char_len(&head[..space]) <= budget / 10 => {
                head[..space].trim_end()
            }
            _ => head,
        }
    };

    format!("{}{}", head, ELLIPSIS)
}
