//! Tokenizer for block definition message templates.
//!
//! A message like `"move %1 by %2 degrees"` interleaves label text with
//! numbered argument placeholders. The factory uses the token sequence to lay
//! out fields and inputs in display order.

use std::fmt;

/// One piece of a tokenized message: literal label text, or a `%N` argument
/// placeholder (1-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageToken {
    Text(String),
    Placeholder(u32),
}

impl fmt::Display for MessageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageToken::Text(text) => write!(f, "{}", text),
            MessageToken::Placeholder(index) => write!(f, "%{}", index),
        }
    }
}

/// Splits a message template into text and placeholder tokens.
///
/// `%` followed by digits is a placeholder. `%%` is an escaped percent and
/// stays in the surrounding text verbatim, as does a `%` followed by a
/// non-digit or at the end of the string. Text runs are trimmed and dropped
/// when empty; placeholders are never trimmed. Single pass, no backtracking.
pub fn tokenize(message: &str) -> Vec<MessageToken> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut chars = message.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            text.push(c);
            continue;
        }
        match chars.peek() {
            // Escaped percent: keep both characters in the label text.
            Some('%') => {
                text.push('%');
                text.push('%');
                chars.next();
            }
            Some(d) if d.is_ascii_digit() => {
                flush_text(&mut tokens, &mut text);
                let mut digits = String::new();
                while let Some(d) = chars.peek() {
                    if d.is_ascii_digit() {
                        digits.push(*d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match digits.parse::<u32>() {
                    Ok(index) => tokens.push(MessageToken::Placeholder(index)),
                    // Absurdly long digit runs overflow; fall back to text.
                    Err(_) => text = format!("%{}", digits),
                }
            }
            // A lone % before a non-digit or at end-of-string is literal.
            _ => text.push('%'),
        }
    }
    flush_text(&mut tokens, &mut text);
    tokens
}

fn flush_text(tokens: &mut Vec<MessageToken>, text: &mut String) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        tokens.push(MessageToken::Text(trimmed.to_string()));
    }
    text.clear();
}
