//! Prefix matching of input tokens against multi-word command names.
//!
//! `match_commands` narrows the registry by positional prefix; when more
//! than one name survives, `winnow` scores the survivors and keeps the
//! best. Both are pure functions so the scoring rules can be tested
//! without a session.

/// Narrow `commands` position by position. At position `i` a candidate
/// survives if its name has run out of words (the rest of the input is
/// arguments to it) or its `i`-th word starts with `input[i]`. Survivors
/// keep their registration order.
pub fn match_commands<'a>(input: &[&str], commands: &[&'a str]) -> Vec<&'a str> {
    let mut survivors: Vec<(&str, Vec<&str>)> = commands
        .iter()
        .map(|name| (*name, name.split_whitespace().collect()))
        .collect();
    for (i, token) in input.iter().enumerate() {
        survivors.retain(|(_, words)| match words.get(i) {
            None => true,
            Some(word) => word.starts_with(token),
        });
        if survivors.is_empty() {
            break;
        }
    }
    survivors.into_iter().map(|(name, _)| name).collect()
}

/// Keep the candidates tied at the highest score. Zero scorers are
/// dropped, so an empty result means nothing plausible remained and the
/// command is invalid rather than ambiguous.
pub fn winnow<'a>(input: &[&str], commands: &[&'a str]) -> Vec<&'a str> {
    let mut best: Vec<&str> = Vec::new();
    let mut best_score = 0;
    for &name in commands {
        let words: Vec<&str> = name.split_whitespace().collect();
        let score = winnow_score(input, &words);
        if score == 0 || score < best_score {
            continue;
        }
        if score > best_score {
            best_score = score;
            best.clear();
        }
        best.push(name);
    }
    best
}

/// Score one candidate against the input: 10 points per position where the
/// candidate's word starts with the input token, 1 more when they are
/// identical, stopping early once the candidate's words are exhausted. A
/// candidate whose word count equals the input length gets a flat bonus so
/// an exact-length match always beats longer or shorter inexact ones.
pub fn winnow_score(input: &[&str], words: &[&str]) -> u64 {
    let mut score = 0;
    for (i, token) in input.iter().enumerate() {
        let Some(word) = words.get(i) else {
            return score;
        };
        if !word.starts_with(token) {
            return 0;
        }
        score += 10;
        if word == token {
            score += 1;
        }
    }
    if words.len() == input.len() {
        score += 1_000_000;
    }
    score
}
