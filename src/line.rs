use crate::subst::{self, SubstError};
use std::collections::HashMap;

/// How a span of the source line was quoted, which controls both the
/// substitutions applied to it and how it is reassembled for history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Bare text, including backslash escape units.
    Unquoted,
    /// Text inside `'...'`; always literal.
    SingleQuoted,
    /// Text inside `"..."`; variables and escapes apply, word breaks do not.
    DoubleQuoted,
    /// Text inside `` `...` ``; replaced by the output of running it.
    BackQuoted,
    /// A single space separating arguments.
    Delimiter,
    /// Text after `#`, running to end of line.
    Comment,
}

/// One tokenized span. `text` keeps the inner source text exactly as
/// written; `processed` starts as a copy and is rewritten by the
/// substitution passes.
#[derive(Debug, Clone)]
pub struct Segment {
    kind: SegmentKind,
    text: String,
    processed: String,
}

impl Segment {
    fn new(kind: SegmentKind, text: String) -> Self {
        let processed = match kind {
            SegmentKind::Comment => String::new(),
            _ => text.clone(),
        };
        Self {
            kind,
            text,
            processed,
        }
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn processed(&self) -> &str {
        &self.processed
    }

    /// The source form of this segment, quotes restored. Comments render as
    /// empty unless asked for, so line reconstructions skip them by default.
    pub fn original(&self, include_comment: bool) -> String {
        match self.kind {
            SegmentKind::Unquoted | SegmentKind::Delimiter => self.text.clone(),
            SegmentKind::SingleQuoted => format!("'{}'", self.text),
            SegmentKind::DoubleQuoted => format!("\"{}\"", self.text),
            SegmentKind::BackQuoted => format!("`{}`", self.text),
            SegmentKind::Comment => {
                if include_comment {
                    format!("#{}", self.text)
                } else {
                    String::new()
                }
            }
        }
    }

    fn subst_backquotes(&mut self, run: &mut dyn FnMut(&str) -> String) {
        if self.kind == SegmentKind::BackQuoted {
            self.processed = run(&self.processed).trim().to_string();
        }
    }

    fn subst_variables(&mut self, vars: &HashMap<String, String>) -> Result<(), SubstError> {
        if matches!(
            self.kind,
            SegmentKind::SingleQuoted | SegmentKind::Comment | SegmentKind::Delimiter
        ) {
            return Ok(());
        }
        // The brace pass commits before the bare pass runs, so a bare-form
        // fault leaves brace substitutions in place. See subst::subst_bare
        // for the matching short-circuit behavior within one scan.
        self.processed = subst::subst_braced(&self.processed, vars)?;
        self.processed = subst::subst_bare(&self.processed, vars)?;
        Ok(())
    }

    fn subst_escapes(&mut self) {
        if matches!(self.kind, SegmentKind::Unquoted | SegmentKind::DoubleQuoted) {
            self.processed = subst::resolve_escapes(&self.processed);
        }
    }
}

/// A tokenized line: the ordered segments plus the operations the
/// dispatcher runs over them.
#[derive(Debug, Clone, Default)]
pub struct ParsedLine {
    segments: Vec<Segment>,
}

impl ParsedLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment, dropping empty text so that, e.g., an empty quoted
    /// string or a span between two adjacent stop characters never shows up.
    pub(crate) fn push(&mut self, kind: SegmentKind, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        self.segments.push(Segment::new(kind, text));
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Merge the processed text of consecutive non-delimiter segments into
    /// arguments. Empty accumulations vanish, so comments and empty quoted
    /// strings never produce a phantom argument, while a legitimate "0"
    /// argument survives.
    pub fn arguments(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut acc = String::new();
        for seg in &self.segments {
            if seg.kind() == SegmentKind::Delimiter {
                if !acc.is_empty() {
                    out.push(std::mem::take(&mut acc));
                }
                continue;
            }
            acc.push_str(seg.processed());
        }
        if !acc.is_empty() {
            out.push(acc);
        }
        out
    }

    /// Reassemble the source text, optionally dropping the first
    /// `skip_args` whitespace-delimited arguments. Used to recover the tail
    /// of a line after the matched command words for history recording.
    pub fn original(&self, skip_args: usize) -> String {
        let mut skip = skip_args;
        let mut out = String::new();
        for seg in &self.segments {
            if skip > 0 {
                if seg.kind() == SegmentKind::Delimiter {
                    skip -= 1;
                }
                continue;
            }
            out.push_str(&seg.original(false));
        }
        out
    }

    /// Run each backquoted segment through `run` and replace its processed
    /// text with the trimmed capture. Runs before variable substitution, so
    /// the nested line is dispatched exactly as written.
    pub fn subst_backquotes(&mut self, mut run: impl FnMut(&str) -> String) {
        for seg in &mut self.segments {
            seg.subst_backquotes(&mut run);
        }
    }

    /// Substitute variables in every eligible segment. The first fault stops
    /// the walk: earlier segments keep their substitutions, later segments
    /// are untouched, and the caller must not dispatch the line.
    pub fn subst_variables(&mut self, vars: &HashMap<String, String>) -> Result<(), SubstError> {
        for seg in &mut self.segments {
            seg.subst_variables(vars)?;
        }
        Ok(())
    }

    pub fn subst_escapes(&mut self) {
        for seg in &mut self.segments {
            seg.subst_escapes();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn line(parts: &[(SegmentKind, &str)]) -> ParsedLine {
        let mut pln = ParsedLine::new();
        for (kind, text) in parts {
            pln.push(*kind, *text);
        }
        pln
    }

    #[test]
    fn test_empty_text_never_becomes_a_segment() {
        let mut pln = ParsedLine::new();
        pln.push(SegmentKind::Unquoted, "");
        pln.push(SegmentKind::DoubleQuoted, "");
        assert!(pln.segments().is_empty());
    }

    #[test]
    fn test_original_restores_quotes() {
        let parts = [
            (SegmentKind::Unquoted, "a"),
            (SegmentKind::SingleQuoted, "b"),
            (SegmentKind::DoubleQuoted, "c"),
            (SegmentKind::BackQuoted, "d"),
        ];
        let pln = line(&parts);
        let originals: Vec<String> =
            pln.segments().iter().map(|s| s.original(false)).collect();
        assert_eq!(originals, vec!["a", "'b'", "\"c\"", "`d`"]);
    }

    #[test]
    fn test_comment_original_is_opt_in() {
        let pln = line(&[(SegmentKind::Comment, " trailing")]);
        assert_eq!(pln.segments()[0].original(false), "");
        assert_eq!(pln.segments()[0].original(true), "# trailing");
        assert_eq!(pln.segments()[0].processed(), "");
    }

    #[test]
    fn test_arguments_merge_adjacent_segments() {
        let pln = line(&[
            (SegmentKind::Unquoted, "foo"),
            (SegmentKind::DoubleQuoted, "bar"),
            (SegmentKind::Delimiter, " "),
            (SegmentKind::Unquoted, "baz"),
        ]);
        assert_eq!(pln.arguments(), vec!["foobar", "baz"]);
    }

    #[test]
    fn test_arguments_keep_zero() {
        let pln = line(&[
            (SegmentKind::Unquoted, "echo"),
            (SegmentKind::Delimiter, " "),
            (SegmentKind::Unquoted, "0"),
            (SegmentKind::Delimiter, " "),
            (SegmentKind::Unquoted, "x"),
        ]);
        assert_eq!(pln.arguments(), vec!["echo", "0", "x"]);
    }

    #[test]
    fn test_arguments_skip_comment() {
        let pln = line(&[
            (SegmentKind::Unquoted, "foo"),
            (SegmentKind::Delimiter, " "),
            (SegmentKind::Comment, "bar baz"),
        ]);
        assert_eq!(pln.arguments(), vec!["foo"]);
    }

    #[test]
    fn test_original_skips_leading_arguments() {
        let pln = line(&[
            (SegmentKind::Unquoted, "set"),
            (SegmentKind::Delimiter, " "),
            (SegmentKind::Unquoted, "x"),
            (SegmentKind::Delimiter, " "),
            (SegmentKind::SingleQuoted, "a b"),
        ]);
        assert_eq!(pln.original(0), "set x 'a b'");
        assert_eq!(pln.original(1), "x 'a b'");
        assert_eq!(pln.original(2), "'a b'");
        assert_eq!(pln.original(3), "");
    }

    #[test]
    fn test_single_quotes_are_immune() {
        let v = vars(&[("x", "5")]);
        let mut pln = line(&[(SegmentKind::SingleQuoted, "$x \\n ${x}")]);
        pln.subst_variables(&v).unwrap();
        pln.subst_escapes();
        assert_eq!(pln.segments()[0].processed(), "$x \\n ${x}");
    }

    #[test]
    fn test_variables_substitute_in_double_quotes() {
        let v = vars(&[("x", "5")]);
        let mut pln = line(&[(SegmentKind::DoubleQuoted, "x=$x")]);
        pln.subst_variables(&v).unwrap();
        assert_eq!(pln.segments()[0].processed(), "x=5");
    }

    #[test]
    fn test_variable_fault_leaves_earlier_segments_substituted() {
        let v = vars(&[("x", "5")]);
        let mut pln = line(&[
            (SegmentKind::Unquoted, "$x"),
            (SegmentKind::Delimiter, " "),
            (SegmentKind::Unquoted, "$missing"),
            (SegmentKind::Delimiter, " "),
            (SegmentKind::Unquoted, "$x"),
        ]);
        assert!(pln.subst_variables(&v).is_err());
        assert_eq!(pln.segments()[0].processed(), "5");
        assert_eq!(pln.segments()[2].processed(), "$missing");
        assert_eq!(pln.segments()[4].processed(), "$x");
    }

    #[test]
    fn test_brace_commit_survives_bare_fault() {
        let v = vars(&[("x", "5")]);
        let mut pln = line(&[(SegmentKind::Unquoted, "${x}=$missing")]);
        assert!(pln.subst_variables(&v).is_err());
        // The bare pass failed, but the brace pass had already committed.
        assert_eq!(pln.segments()[0].processed(), "5=$missing");
    }

    #[test]
    fn test_escapes_apply_to_unquoted_and_double_only() {
        let mut pln = line(&[
            (SegmentKind::Unquoted, "a\\tb"),
            (SegmentKind::DoubleQuoted, "c\\td"),
            (SegmentKind::BackQuoted, "e\\tf"),
        ]);
        pln.subst_escapes();
        assert_eq!(pln.segments()[0].processed(), "a\tb");
        assert_eq!(pln.segments()[1].processed(), "c\td");
        assert_eq!(pln.segments()[2].processed(), "e\\tf");
    }

    #[test]
    fn test_backquote_capture_is_trimmed() {
        let mut pln = line(&[
            (SegmentKind::Unquoted, "echo"),
            (SegmentKind::Delimiter, " "),
            (SegmentKind::BackQuoted, "inner"),
        ]);
        let mut seen = Vec::new();
        pln.subst_backquotes(|text| {
            seen.push(text.to_string());
            "  hello \n".to_string()
        });
        assert_eq!(seen, vec!["inner"]);
        assert_eq!(pln.segments()[2].processed(), "hello");
        // The original text is preserved for history reconstruction.
        assert_eq!(pln.segments()[2].original(false), "`inner`");
    }

    #[test]
    fn test_variables_apply_to_backquote_capture() {
        let v = vars(&[("x", "5")]);
        let mut pln = line(&[(SegmentKind::BackQuoted, "inner")]);
        pln.subst_backquotes(|_| "$x".to_string());
        pln.subst_variables(&v).unwrap();
        assert_eq!(pln.segments()[0].processed(), "5");
    }
}
