use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Fault raised by argument consumption inside a command handler.
///
/// The dispatcher recognizes this type at its boundary: the message is
/// logged and, when the command declares help text, a usage reminder is
/// printed. Anything else a handler returns is treated as a command
/// failure rather than an argument fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgsError {
    #[error("{0}")]
    Missing(String),
    #[error("Bad argument \"{value}\": {reason}")]
    Bad { value: String, reason: String },
    #[error("Extra arguments: {0}")]
    Extra(String),
    #[error("Unknown option: --{0}")]
    UnknownOption(String),
}

/// Value of a defined option: a switch or a text setting. The tuple slice
/// passed to [`Arguments::handle_options`] supplies the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Flag(bool),
    Text(String),
}

/// The remaining words of a dispatched line, consumed front to back by the
/// command handler. Handlers shift what they need and then call one of the
/// `end` variants to either reject or collect whatever is left.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    args: VecDeque<String>,
}

impl Arguments {
    pub fn new(args: Vec<String>) -> Self {
        Self { args: args.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn shift(&mut self) -> Option<String> {
        self.args.pop_front()
    }

    pub fn shift_string(&mut self) -> Result<String, ArgsError> {
        self.shift_required("Missing argument")
    }

    pub fn shift_required(&mut self, missing: &str) -> Result<String, ArgsError> {
        self.shift()
            .ok_or_else(|| ArgsError::Missing(missing.to_string()))
    }

    pub fn shift_float(&mut self) -> Result<f64, ArgsError> {
        let raw = self.shift_string()?;
        match raw.parse() {
            Ok(value) => Ok(value),
            Err(_) => Err(ArgsError::Bad {
                value: raw,
                reason: "expected a number".to_string(),
            }),
        }
    }

    pub fn shift_unsigned(&mut self) -> Result<usize, ArgsError> {
        let raw = self.shift_string()?;
        match raw.parse() {
            Ok(value) => Ok(value),
            Err(_) => Err(ArgsError::Bad {
                value: raw,
                reason: "expected a non-negative integer".to_string(),
            }),
        }
    }

    pub fn shift_keyword(&mut self, allowed: &[&str]) -> Result<String, ArgsError> {
        let raw = self.shift_string()?;
        if allowed.contains(&raw.as_str()) {
            Ok(raw)
        } else {
            Err(ArgsError::Bad {
                value: raw,
                reason: format!("expected one of: {}", allowed.join(" ")),
            })
        }
    }

    /// Reject any unconsumed arguments.
    pub fn end(&mut self) -> Result<(), ArgsError> {
        if self.args.is_empty() {
            return Ok(());
        }
        let rest: Vec<String> = self.args.drain(..).collect();
        Err(ArgsError::Extra(rest.join(" ")))
    }

    /// Collect everything left as one space-joined string.
    pub fn end_with_string(&mut self) -> String {
        let rest: Vec<String> = self.args.drain(..).collect();
        rest.join(" ")
    }

    pub fn end_with_string_required(&mut self, missing: &str) -> Result<String, ArgsError> {
        if self.args.is_empty() {
            return Err(ArgsError::Missing(missing.to_string()));
        }
        Ok(self.end_with_string())
    }

    pub fn end_with_vec(&mut self) -> Vec<String> {
        self.args.drain(..).collect()
    }

    /// Pull `--name`, `--no-name`, and `--name=value` out of the argument
    /// list, leaving positional arguments in place. `defined` supplies the
    /// known option names with their default values; an option not listed
    /// there is a fault.
    pub fn handle_options(
        &mut self,
        defined: &[(&str, OptionValue)],
    ) -> Result<HashMap<String, OptionValue>, ArgsError> {
        let mut out: HashMap<String, OptionValue> = defined
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        let mut kept = VecDeque::new();
        while let Some(arg) = self.args.pop_front() {
            let Some(body) = arg.strip_prefix("--") else {
                kept.push_back(arg);
                continue;
            };
            let (name, value) = if let Some(rest) = body.strip_prefix("no-") {
                (rest.to_string(), OptionValue::Flag(false))
            } else if let Some((name, text)) = body.split_once('=') {
                (name.to_string(), OptionValue::Text(text.to_string()))
            } else {
                (body.to_string(), OptionValue::Flag(true))
            };
            if !out.contains_key(&name) {
                return Err(ArgsError::UnknownOption(name));
            }
            out.insert(name, value);
        }
        self.args = kept;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Arguments {
        Arguments::new(words.iter().map(|w| w.to_string()).collect())
    }

    #[test]
    fn test_shift() {
        let mut a = args(&["one", "two"]);
        assert_eq!(a.shift(), Some("one".to_string()));
        assert_eq!(a.shift(), Some("two".to_string()));
        assert_eq!(a.shift(), None);
    }

    #[test]
    fn test_shift_string_missing() {
        let mut a = args(&[]);
        let err = a.shift_string().unwrap_err();
        assert_eq!(err.to_string(), "Missing argument");
    }

    #[test]
    fn test_shift_required_custom_message() {
        let mut a = args(&[]);
        let err = a.shift_required("Missing variable name").unwrap_err();
        assert_eq!(err.to_string(), "Missing variable name");
    }

    #[test]
    fn test_shift_float() {
        let mut a = args(&["2.5", "x"]);
        assert_eq!(a.shift_float().unwrap(), 2.5);
        let err = a.shift_float().unwrap_err();
        assert_eq!(err.to_string(), "Bad argument \"x\": expected a number");
    }

    #[test]
    fn test_shift_unsigned() {
        let mut a = args(&["3", "-1"]);
        assert_eq!(a.shift_unsigned().unwrap(), 3);
        assert!(a.shift_unsigned().is_err());
    }

    #[test]
    fn test_shift_keyword() {
        let mut a = args(&["+", "%"]);
        assert_eq!(a.shift_keyword(&["+", "-"]).unwrap(), "+");
        let err = a.shift_keyword(&["+", "-"]).unwrap_err();
        assert!(err.to_string().contains("expected one of: + -"));
    }

    #[test]
    fn test_end_rejects_leftovers() {
        let mut a = args(&["a", "b"]);
        let err = a.end().unwrap_err();
        assert_eq!(err.to_string(), "Extra arguments: a b");
        assert!(args(&[]).end().is_ok());
    }

    #[test]
    fn test_end_with_string() {
        let mut a = args(&["a", "b", "c"]);
        assert_eq!(a.end_with_string(), "a b c");
        assert_eq!(args(&[]).end_with_string(), "");
    }

    #[test]
    fn test_end_with_string_required() {
        let err = args(&[]).end_with_string_required("Missing value").unwrap_err();
        assert_eq!(err.to_string(), "Missing value");
    }

    #[test]
    fn test_zero_is_a_real_argument() {
        let mut a = args(&["0", "0"]);
        assert_eq!(a.shift(), Some("0".to_string()));
        assert_eq!(a.end_with_string(), "0");
    }

    #[test]
    fn test_handle_options() {
        let defined = [
            ("verbose", OptionValue::Flag(false)),
            ("name", OptionValue::Text("default".to_string())),
        ];
        let mut a = args(&["pos1", "--verbose", "--name=zok", "pos2"]);
        let opts = a.handle_options(&defined).unwrap();
        assert_eq!(opts["verbose"], OptionValue::Flag(true));
        assert_eq!(opts["name"], OptionValue::Text("zok".to_string()));
        assert_eq!(a.end_with_vec(), vec!["pos1", "pos2"]);
    }

    #[test]
    fn test_handle_options_negation() {
        let defined = [("color", OptionValue::Flag(true))];
        let mut a = args(&["--no-color"]);
        let opts = a.handle_options(&defined).unwrap();
        assert_eq!(opts["color"], OptionValue::Flag(false));
    }

    #[test]
    fn test_handle_options_unknown() {
        let defined = [("verbose", OptionValue::Flag(false))];
        let mut a = args(&["--bogus"]);
        let err = a.handle_options(&defined).unwrap_err();
        assert_eq!(err.to_string(), "Unknown option: --bogus");
    }
}
