use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

/// Fault raised while substituting variables into a segment.
///
/// The segment's processed text is left untouched when one of these is
/// returned, so a failed line never dispatches half-substituted arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubstError {
    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),
    #[error("Unmatched brace: {0}")]
    UnmatchedBrace(String),
}

fn brace_var_re() -> &'static Regex {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("brace pattern"));
    &RE
}

fn bare_var_re() -> &'static Regex {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\$([a-zA-Z_][a-zA-Z0-9_]*)").expect("bare pattern"));
    &RE
}

fn octal_re() -> &'static Regex {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\\([0-7]{1,3})").expect("octal pattern"));
    &RE
}

fn unicode_re() -> &'static Regex {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\\[uU]([0-9a-fA-F]{4})").expect("unicode pattern"));
    &RE
}

fn fallback_re() -> &'static Regex {
    static RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\\(.)").expect("fallback pattern"));
    &RE
}

/// Replace every `${name}` with the exact value of `name`.
///
/// An undefined name aborts the whole pass. A `${` left over afterwards with
/// no closing brace anywhere behind it is its own fault; `${` openings that
/// do not form a valid identifier reference are left verbatim.
pub fn subst_braced(text: &str, vars: &HashMap<String, String>) -> Result<String, SubstError> {
    let mut fault: Option<SubstError> = None;
    let replaced = brace_var_re().replace_all(text, |caps: &Captures| {
        let name = &caps[1];
        match vars.get(name) {
            Some(value) => value.clone(),
            None => {
                if fault.is_none() {
                    fault = Some(SubstError::UndefinedVariable(name.to_string()));
                }
                String::new()
            }
        }
    });
    if let Some(err) = fault {
        return Err(err);
    }
    let mut from = 0;
    while let Some(open) = replaced[from..].find("${") {
        let after = from + open + 2;
        match replaced[after..].find('}') {
            Some(close) => from = after + close + 1,
            None => {
                return Err(SubstError::UnmatchedBrace(
                    replaced[from + open..].to_string(),
                ));
            }
        }
    }
    Ok(replaced.into_owned())
}

/// Replace every `$name` using longest-prefix lookup against the variable
/// table: the longest key that prefixes `name` supplies the value, and the
/// unconsumed remainder of `name` is appended to it. So with `foo` set,
/// `$foobar` becomes the value of `foo` followed by `bar`.
///
/// The first undefined reference short-circuits the scan: later occurrences
/// in the same text are not inspected and nothing is substituted.
pub fn subst_bare(text: &str, vars: &HashMap<String, String>) -> Result<String, SubstError> {
    let mut fault: Option<SubstError> = None;
    let replaced = bare_var_re().replace_all(text, |caps: &Captures| {
        if fault.is_some() {
            return String::new();
        }
        let name = &caps[1];
        match longest_prefix(vars, name) {
            Some((key, value)) => format!("{}{}", value, &name[key.len()..]),
            None => {
                fault = Some(SubstError::UndefinedVariable(name.to_string()));
                String::new()
            }
        }
    });
    match fault {
        Some(err) => Err(err),
        None => Ok(replaced.into_owned()),
    }
}

fn longest_prefix<'a>(
    vars: &'a HashMap<String, String>,
    name: &str,
) -> Option<(&'a str, &'a str)> {
    let mut best: Option<(&str, &str)> = None;
    for (key, value) in vars {
        if !name.starts_with(key.as_str()) {
            continue;
        }
        if best.is_none_or(|(k, _)| key.len() > k.len()) {
            best = Some((key, value));
        }
    }
    best
}

/// Resolve backslash escapes in four ordered passes: the named two-character
/// sequences first, then octal `\NNN`, then `\uXXXX` as a big-endian UTF-16
/// code unit, and finally `\X` dropping the backslash. Running the named
/// pass first keeps `\n` from being read as the start of an octal sequence.
pub fn resolve_escapes(text: &str) -> String {
    let text = text
        .replace("\\n", "\n")
        .replace("\\r", "\r")
        .replace("\\t", "\t")
        .replace("\\v", "\u{0B}")
        .replace("\\e", "\u{1B}")
        .replace("\\f", "\u{0C}")
        .replace("\\a", "\u{07}")
        .replace("\\b", "\u{08}")
        .replace("\\0", "\0");
    let text = octal_re().replace_all(&text, |caps: &Captures| {
        match u32::from_str_radix(&caps[1], 8).ok().and_then(char::from_u32) {
            Some(c) => c.to_string(),
            None => String::new(),
        }
    });
    let text = unicode_re().replace_all(&text, |caps: &Captures| {
        let unit = u32::from_str_radix(&caps[1], 16).unwrap_or(0);
        char::from_u32(unit)
            .unwrap_or(char::REPLACEMENT_CHARACTER)
            .to_string()
    });
    fallback_re().replace_all(&text, "$1").into_owned()
}
