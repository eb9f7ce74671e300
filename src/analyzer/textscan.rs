//! Small string-span state machine.
//!
//! Tracks single-, double-, and backtick-delimited spans so line-oriented
//! rules can tell code from string content. Backtick strings are
//! multi-line (Go raw strings, JS template literals); quote strings end at
//! their closing quote or at the end of the line.

/// Replace the *contents* of string literals with spaces, keeping the
/// delimiters and all newlines, so byte offsets and line numbers survive.
pub fn mask_strings(text: &str) -> String {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Code,
        Single,
        Double,
        Backtick,
    }

    let mut out = String::with_capacity(text.len());
    let mut state = State::Code;
    let mut escaped = false;

    for ch in text.chars() {
        match state {
            State::Code => {
                match ch {
                    '\'' => state = State::Single,
                    '"' => state = State::Double,
                    '`' => state = State::Backtick,
                    _ => {}
                }
                out.push(ch);
            }
            State::Single | State::Double | State::Backtick => {
                let delimiter = match state {
                    State::Single => '\'',
                    State::Double => '"',
                    _ => '`',
                };
                // Non-ASCII content is kept as-is so byte offsets between
                // the original and the masked text stay aligned.
                if escaped {
                    escaped = false;
                    out.push(if ch == '\n' || !ch.is_ascii() { ch } else { ' ' });
                } else if ch == '\\' {
                    escaped = true;
                    out.push(' ');
                } else if ch == delimiter {
                    state = State::Code;
                    out.push(ch);
                } else if ch == '\n' {
                    // Quote strings do not span lines; backticks do.
                    if state != State::Backtick {
                        state = State::Code;
                    }
                    out.push('\n');
                } else {
                    out.push(if ch.is_ascii() { ' ' } else { ch });
                }
            }
        }
    }
    out
}

/// Index of the brace matching `open_idx` (which must point at `{`),
/// ignoring braces inside string literals. `None` when unbalanced.
pub fn find_matching_brace(text: &str, open_idx: usize) -> Option<usize> {
    let masked = mask_strings(text);
    let bytes = masked.as_bytes();
    if bytes.get(open_idx) != Some(&b'{') {
        return None;
    }
    let mut depth = 0usize;
    for (idx, &byte) in bytes.iter().enumerate().skip(open_idx) {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Index of the next `{` at parenthesis depth zero, starting at `from`.
/// Used to find a function body while skipping destructured or defaulted
/// parameter lists.
pub fn body_brace_index(text: &str, from: usize) -> Option<usize> {
    let mut paren_depth = 0usize;
    for (rel, ch) in text[from..].char_indices() {
        match ch {
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            '{' if paren_depth == 0 => return Some(from + rel),
            _ => {}
        }
    }
    None
}
