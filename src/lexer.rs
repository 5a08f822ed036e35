use crate::line::{ParsedLine, SegmentKind};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Fault raised while tokenizing a line. The line is not dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("Unmatched {0}.")]
    UnmatchedQuote(char),
    #[error("Hanging backslash.")]
    HangingBackslash,
    #[error("Unexpected character: {0}")]
    UnexpectedCharacter(char),
}

fn is_stop_char(c: char) -> bool {
    matches!(c, ' ' | '\\' | '"' | '\'' | '`' | '#')
}

fn normalize_whitespace(line: &str) -> String {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s\s+").expect("whitespace pattern"));
    RE.replace_all(line, " ").trim().to_string()
}

/// Tokenize one line into segments.
///
/// Whitespace runs are collapsed to a single space first, so every
/// `Delimiter` segment holds exactly one space. Backslash escapes are not
/// interpreted here; the scanner only fixes their boundaries so that each
/// escape unit lands in its own `Unquoted` segment and an escaped quote
/// cannot terminate the surrounding span.
pub fn parse_line(line: &str) -> Result<ParsedLine, LexError> {
    let normalized = normalize_whitespace(line);
    let mut parsed = ParsedLine::new();
    let mut rest = normalized.as_str();
    while !rest.is_empty() {
        let span = rest.find(is_stop_char).unwrap_or(rest.len());
        parsed.push(SegmentKind::Unquoted, &rest[..span]);
        rest = &rest[span..];
        let Some(ch) = rest.chars().next() else {
            // Everything remaining was unquoted.
            break;
        };
        match ch {
            ' ' => {
                parsed.push(SegmentKind::Delimiter, " ");
                rest = &rest[1..];
            }
            '"' | '\'' | '`' => {
                let (inner, tail) = parse_quote(&rest[1..], ch)?;
                let kind = match ch {
                    '"' => SegmentKind::DoubleQuoted,
                    '\'' => SegmentKind::SingleQuoted,
                    _ => SegmentKind::BackQuoted,
                };
                parsed.push(kind, inner);
                rest = tail;
            }
            '#' => {
                parsed.push(SegmentKind::Comment, &rest[1..]);
                break;
            }
            '\\' => {
                let len = escape_unit_len(rest)?;
                parsed.push(SegmentKind::Unquoted, &rest[..len]);
                rest = &rest[len..];
            }
            other => return Err(LexError::UnexpectedCharacter(other)),
        }
    }
    Ok(parsed)
}

/// Scan `text` (the opening quote already consumed) up to the matching
/// close. A closing quote immediately preceded by a backslash is literal:
/// the backslash is dropped, the quote kept, and scanning continues.
/// Returns the inner text and everything after the closing quote.
pub fn parse_quote(text: &str, quote: char) -> Result<(String, &str), LexError> {
    let mut inner = String::new();
    let mut rest = text;
    loop {
        let Some(pos) = rest.find(quote) else {
            return Err(LexError::UnmatchedQuote(quote));
        };
        let before = &rest[..pos];
        if let Some(stripped) = before.strip_suffix('\\') {
            inner.push_str(stripped);
            inner.push(quote);
            rest = &rest[pos + 1..];
            continue;
        }
        inner.push_str(before);
        return Ok((inner, &rest[pos + 1..]));
    }
}

/// Byte length of the escape unit starting at a backslash: `\u`/`\U` plus
/// exactly four hex digits, else one to three octal digits taken greedily,
/// else the single following character.
fn escape_unit_len(rest: &str) -> Result<usize, LexError> {
    let body = &rest[1..];
    let Some(first) = body.chars().next() else {
        return Err(LexError::HangingBackslash);
    };
    if matches!(first, 'u' | 'U') {
        let hex = body[1..]
            .chars()
            .take(4)
            .take_while(char::is_ascii_hexdigit)
            .count();
        if hex == 4 {
            return Ok(6);
        }
    }
    let octal = body
        .chars()
        .take(3)
        .take_while(|c| matches!(c, '0'..='7'))
        .count();
    if octal > 0 {
        return Ok(1 + octal);
    }
    Ok(1 + first.len_utf8())
}
