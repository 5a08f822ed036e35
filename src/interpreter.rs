use crate::args::{Arguments, ArgsError};
use crate::command::ShellCommand;
use crate::env::Environment;
use crate::io_adapters::MemWriter;
use crate::lexer;
use crate::logger::{LogRelay, Logger};
use crate::matcher;
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::collections::BTreeMap;
use std::io::Write;
use std::rc::Rc;

/// Oldest entries are dropped once the history grows past this many lines.
const HISTORY_LIMIT: usize = 100;

const DEFAULT_PROMPT: &str = "> ";

/// Shown in help listings for commands registered without help text.
const NO_HELP: &str = "No help available.";

/// Help text is right-aligned to this column in help listings.
const HELP_WIDTH: usize = 80;

struct CommandEntry {
    name: String,
    handler: Rc<dyn ShellCommand>,
    help: Option<String>,
    usage: String,
    records_history: bool,
}

/// A line-oriented command interpreter.
///
/// The interpreter owns an [`Environment`], a command registry, and the session
/// history. Each input line is tokenized, run through backquote, variable and
/// escape substitution, matched against the registry by prefix, and dispatched
/// to the winning command. Output and log sinks are pluggable so sessions can
/// be driven from tests.
///
/// Example
/// ```
/// use cmdshell::Interpreter;
/// let mut sh = Interpreter::new();
/// sh.handle_command("echo hello world");
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<CommandEntry>,
    history: Vec<String>,
    history_start: usize,
    output: Box<dyn Write>,
    errors: Box<dyn Write>,
    logger: Box<dyn Logger>,
    prompt: String,
}

impl Interpreter {
    /// Create an interpreter with the default command set registered.
    pub fn new() -> Self {
        let mut sh = Self {
            env: Environment::new(),
            commands: Vec::new(),
            history: Vec::new(),
            history_start: 0,
            output: Box::new(std::io::stdout()),
            errors: Box::new(std::io::stderr()),
            logger: Box::new(LogRelay),
            prompt: DEFAULT_PROMPT.to_string(),
        };
        crate::builtin::register_defaults(&mut sh);
        sh
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn set_output(&mut self, output: Box<dyn Write>) {
        self.output = output;
    }

    pub fn set_error_output(&mut self, errors: Box<dyn Write>) {
        self.errors = errors;
    }

    pub fn set_logger(&mut self, logger: Box<dyn Logger>) {
        self.logger = logger;
    }

    /// Register a command under its declared name and aliases.
    ///
    /// Registering a name that is already taken replaces the earlier entry.
    pub fn register(&mut self, command: Rc<dyn ShellCommand>) {
        let name = command.name();
        let help = command.help().map(str::to_string);
        let usage = normalize_usage(name, command.usage());
        let records = command.records_history();
        self.register_entry(CommandEntry {
            name: name.to_string(),
            handler: command.clone(),
            help: help.clone(),
            usage: usage.clone(),
            records_history: records,
        });
        for alias in command.aliases() {
            self.register_entry(CommandEntry {
                name: (*alias).to_string(),
                handler: command.clone(),
                help: help.clone(),
                usage: usage.clone(),
                records_history: records,
            });
        }
    }

    fn register_entry(&mut self, entry: CommandEntry) {
        self.commands.retain(|known| known.name != entry.name);
        self.commands.push(entry);
    }

    /// Registered command names, including aliases, in registration order.
    pub fn command_names(&self) -> Vec<String> {
        self.commands.iter().map(|entry| entry.name.clone()).collect()
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.env.set_var(name, value);
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.env.get_var(name)
    }

    /// Ask the session to stop after the current line.
    pub fn request_exit(&mut self) {
        self.env.request_exit();
    }

    pub fn should_exit(&self) -> bool {
        self.env.should_exit()
    }

    /// Recorded history lines, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Index of the oldest retained history entry.
    ///
    /// Entries keep the index they were first recorded under even after old
    /// lines are dropped, so `history()[i]` has index `history_start() + i`.
    pub fn history_start(&self) -> usize {
        self.history_start
    }

    /// Look up a history line by its original index.
    pub fn history_entry(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(self.history_start)
            .and_then(|i| self.history.get(i))
            .map(String::as_str)
    }

    pub fn output(&mut self) -> &mut dyn Write {
        &mut *self.output
    }

    pub fn error_output(&mut self) -> &mut dyn Write {
        &mut *self.errors
    }

    pub fn logger(&mut self) -> &mut dyn Logger {
        &mut *self.logger
    }

    /// Feed a chunk of input to the session, one command per line.
    ///
    /// Processing stops at the first blank line or once a command requests
    /// exit.
    pub fn handle_input(&mut self, input: &str) {
        for line in input.split('\n') {
            let line = line.trim();
            if line.is_empty() {
                break;
            }
            self.handle_command(line);
            if self.should_exit() {
                break;
            }
        }
    }

    /// Parse, substitute, match and run a single command line.
    pub fn handle_command(&mut self, line: &str) {
        if let Some(prefix) = line.strip_prefix('!') {
            self.run_from_history(prefix);
            return;
        }

        let mut parsed = match lexer::parse_line(line) {
            Ok(parsed) => parsed,
            Err(err) => {
                self.logger.error(&err.to_string());
                return;
            }
        };

        parsed.subst_backquotes(|nested| self.run_captured(nested));
        if let Err(err) = parsed.subst_variables(self.env.vars()) {
            self.logger.error(&err.to_string());
            return;
        }
        parsed.subst_escapes();

        let args = parsed.arguments();
        if args.is_empty() {
            // Whole-line comment or nothing but whitespace.
            return;
        }

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let mut candidates: Vec<String> = {
            let names: Vec<&str> = self.commands.iter().map(|entry| entry.name.as_str()).collect();
            matcher::match_commands(&arg_refs, &names)
                .into_iter()
                .map(str::to_string)
                .collect()
        };
        self.logger.debug(&format!("matches = {:?}", candidates));
        if candidates.is_empty() {
            self.logger.error(&format!("Unknown command: {}", line));
            return;
        }
        if candidates.len() > 1 {
            let winnowed: Vec<String> = {
                let names: Vec<&str> = candidates.iter().map(String::as_str).collect();
                matcher::winnow(&arg_refs, &names)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            };
            self.logger.debug(&format!("winnow = {:?}", winnowed));
            candidates = winnowed;
            if candidates.is_empty() {
                self.logger.error(&format!("Invalid command: {}", line));
                return;
            }
            if candidates.len() > 1 {
                self.logger
                    .warning(&format!("Ambiguous command: {} ({})", line, candidates.len()));
                let names: Vec<&str> = candidates.iter().map(String::as_str).collect();
                self.show_help(Some(&names));
                return;
            }
        }
        let name = candidates.remove(0);

        let Some(entry) = self.commands.iter().find(|entry| entry.name == name) else {
            self.logger.error(&format!("Invalid command: {}", line));
            return;
        };
        let handler = entry.handler.clone();
        let usage = entry.usage.clone();
        let has_help = entry.help.is_some();
        let records = entry.records_history;

        let word_count = name.split_whitespace().count();
        let rest: Vec<String> = args.iter().skip(word_count).cloned().collect();
        if rest.len() == 1 && rest[0] == "?" {
            self.show_help(Some(&[name.as_str()]));
            return;
        }

        // Record the full name even when the user typed an abbreviation, so
        // history lines replay without re-matching.
        let tail = parsed.original(word_count);
        let history_line = if tail.is_empty() {
            name.clone()
        } else {
            format!("{} {}", name, tail)
        };

        let mut arguments = Arguments::new(rest);
        match handler.run(self, &mut arguments) {
            Ok(()) => {
                if records {
                    self.record_history(history_line);
                }
            }
            Err(err) => match err.downcast_ref::<ArgsError>() {
                Some(args_err) => {
                    self.logger.error(&args_err.to_string());
                    if has_help {
                        let _ = writeln!(self.output, "Usage: {}", usage);
                    }
                    if records {
                        self.record_history(history_line);
                    }
                }
                None => {
                    self.logger.error(&format!("Command failed: {:#}", err));
                }
            },
        }
    }

    /// Run a backquoted command with output captured into a string.
    fn run_captured(&mut self, line: &str) -> String {
        let (writer, handle) = MemWriter::with_handle();
        let previous = std::mem::replace(&mut self.output, Box::new(writer));
        self.handle_command(line);
        self.output = previous;
        String::from_utf8_lossy(&handle.borrow()).into_owned()
    }

    /// Re-run the most recent history line starting with `prefix`.
    fn run_from_history(&mut self, prefix: &str) {
        let found = self
            .history
            .iter()
            .rev()
            .find(|line| line.starts_with(prefix))
            .cloned();
        match found {
            Some(line) => self.handle_command(&line),
            None => self.logger.error(&format!("No match in history: {}", prefix)),
        }
    }

    fn record_history(&mut self, line: String) {
        self.history.push(line);
        if self.history.len() > HISTORY_LIMIT {
            let excess = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..excess);
            self.history_start += excess;
        }
    }

    /// Print usage and help for the selected commands, or for all of them.
    ///
    /// A command is selected when its usage line starts with one of the given
    /// names. Aliases share their command's usage line, so the listing shows
    /// each command once, sorted by usage.
    pub fn show_help(&mut self, commands: Option<&[&str]>) {
        let mut listing: BTreeMap<String, String> = BTreeMap::new();
        for entry in &self.commands {
            let wanted = match commands {
                None => true,
                Some(names) => names.iter().any(|name| entry.usage.starts_with(name)),
            };
            if !wanted {
                continue;
            }
            let help = entry.help.clone().unwrap_or_else(|| NO_HELP.to_string());
            listing.insert(entry.usage.clone(), help);
        }
        for (usage, help) in listing {
            let _ = writeln!(self.output, "{}", usage);
            let _ = writeln!(self.output, "{:>width$}", help, width = HELP_WIDTH);
        }
    }

    /// Run the interactive prompt loop until exit or end of input.
    ///
    /// Each read buffer goes through [`Interpreter::handle_input`], so a
    /// pasted multi-line buffer runs one command per line.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let mut rl = Editor::<ShellHelper, DefaultHistory>::new()?;
        rl.set_helper(Some(ShellHelper {
            commands: self.command_names(),
        }));
        loop {
            match rl.readline(&self.prompt) {
                Ok(input) => {
                    for line in input.split('\n') {
                        let line = line.trim();
                        if line.is_empty() {
                            break;
                        }
                        rl.add_history_entry(line)?;
                    }
                    self.handle_input(&input);
                    if self.should_exit() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    let _ = writeln!(self.output);
                    break;
                }
                Err(err) => {
                    self.logger.error(&format!("Readline failed: {}", err));
                    break;
                }
            }
        }
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Prefix a declared usage string with the command name when it lacks one.
fn normalize_usage(name: &str, usage: Option<&str>) -> String {
    match usage {
        Some(usage) if usage.starts_with(name) => usage.to_string(),
        Some(usage) => format!("{} {}", name, usage.trim()),
        None => name.to_string(),
    }
}

/// Line editor helper providing command name completion at the prompt.
pub struct ShellHelper {
    commands: Vec<String>,
}

impl Completer for ShellHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let typed = &line[..pos];
        let lead = typed.len() - typed.trim_start().len();
        let candidates = complete_line(&self.commands, typed.trim_start());
        Ok((lead, candidates))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

/// Completion candidates for a partial command line.
///
/// Multiword commands complete one word at a time: while several commands
/// share the typed prefix, only their next words are offered. Full names are
/// offered once no shorter word list would narrow the choice.
fn complete_line(commands: &[String], prefix: &str) -> Vec<String> {
    let full: Vec<String> = commands
        .iter()
        .filter(|name| name.starts_with(prefix))
        .cloned()
        .collect();
    let mut words: Vec<String> = Vec::new();
    for name in &full {
        let word = match name[prefix.len()..].find(' ') {
            Some(offset) => &name[..prefix.len() + offset],
            None => name.as_str(),
        };
        if !words.iter().any(|known| known == word) {
            words.push(word.to_string());
        }
    }
    if words.len() < full.len() { words } else { full }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::BufferLogger;
    use log::Level;
    use std::cell::RefCell;

    fn test_shell() -> (
        Interpreter,
        Rc<RefCell<Vec<u8>>>,
        Rc<RefCell<Vec<(Level, String)>>>,
    ) {
        let mut sh = Interpreter::new();
        let (writer, out) = MemWriter::with_handle();
        sh.set_output(Box::new(writer));
        let (logger, log) = BufferLogger::with_handle();
        sh.set_logger(Box::new(logger));
        (sh, out, log)
    }

    fn output_of(out: &Rc<RefCell<Vec<u8>>>) -> String {
        String::from_utf8(out.borrow().clone()).unwrap()
    }

    fn messages_of(log: &Rc<RefCell<Vec<(Level, String)>>>, level: Level) -> Vec<String> {
        log.borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    #[test]
    fn test_echo() {
        let (mut sh, out, _log) = test_shell();
        sh.handle_command("echo Hello world");
        assert_eq!(output_of(&out), "Hello world\n");
    }

    #[test]
    fn test_unknown_command() {
        let (mut sh, out, log) = test_shell();
        sh.handle_command("nonesuch 1 2");
        assert_eq!(output_of(&out), "");
        assert_eq!(
            messages_of(&log, Level::Error),
            vec!["Unknown command: nonesuch 1 2".to_string()]
        );
    }

    #[test]
    fn test_ambiguous_command_counts_candidates() {
        let (mut sh, out, log) = test_shell();
        sh.handle_command("e hello");
        assert_eq!(
            messages_of(&log, Level::Warn),
            vec!["Ambiguous command: e hello (3)".to_string()]
        );
        let printed = output_of(&out);
        assert!(printed.contains("echo <string>"));
        assert!(printed.contains("exit"));
        assert!(printed.contains("expr <number> <operator> <number>"));
    }

    #[test]
    fn test_abbreviation_dispatches_unique_prefix() {
        let (mut sh, out, _log) = test_shell();
        sh.handle_command("ec Hello");
        assert_eq!(output_of(&out), "Hello\n");
    }

    #[test]
    fn test_multiword_command_beats_shorter_name() {
        let (mut sh, _out, log) = test_shell();
        sh.handle_command("history run 0");
        assert_eq!(
            messages_of(&log, Level::Error),
            vec!["History index 0 is out of range.".to_string()]
        );
    }

    #[test]
    fn test_history_records_full_name() {
        let (mut sh, _out, _log) = test_shell();
        sh.handle_command("ec Hello");
        assert_eq!(sh.history(), &["echo Hello".to_string()]);
    }

    #[test]
    fn test_history_keeps_original_argument_text() {
        let (mut sh, _out, _log) = test_shell();
        sh.handle_command("set greeting hello");
        sh.handle_command("echo 'a b' $greeting");
        assert_eq!(
            sh.history(),
            &[
                "set greeting hello".to_string(),
                "echo 'a b' $greeting".to_string(),
            ]
        );
    }

    #[test]
    fn test_history_skips_failed_commands() {
        let (mut sh, _out, _log) = test_shell();
        sh.handle_command("nonesuch");
        sh.handle_command("echo $undefined");
        assert!(sh.history().is_empty());
    }

    #[test]
    fn test_history_records_argument_faults() {
        let (mut sh, _out, log) = test_shell();
        sh.handle_command("expr 1 ^ 2");
        assert_eq!(sh.history(), &["expr 1 ^ 2".to_string()]);
        assert_eq!(
            messages_of(&log, Level::Error),
            vec!["Bad argument \"^\": Invalid operator.".to_string()]
        );
    }

    #[test]
    fn test_usage_reminder_after_argument_fault() {
        let (mut sh, out, _log) = test_shell();
        sh.handle_command("expr 1 +");
        assert_eq!(
            output_of(&out),
            "Usage: expr <number> <operator> <number>\n"
        );
    }

    #[test]
    fn test_history_limit_preserves_indices() {
        let (mut sh, _out, _log) = test_shell();
        for i in 0..105 {
            sh.handle_command(&format!("echo {}", i));
        }
        assert_eq!(sh.history().len(), 100);
        assert_eq!(sh.history_start(), 5);
        assert_eq!(sh.history()[0], "echo 5");
        assert_eq!(sh.history_entry(5), Some("echo 5"));
        assert_eq!(sh.history_entry(104), Some("echo 104"));
        assert_eq!(sh.history_entry(4), None);
        assert_eq!(sh.history_entry(105), None);
    }

    #[test]
    fn test_bang_reruns_most_recent_match() {
        let (mut sh, out, _log) = test_shell();
        sh.handle_command("echo first");
        sh.handle_command("echo second");
        sh.handle_command("!echo");
        assert_eq!(output_of(&out), "first\nsecond\nsecond\n");
    }

    #[test]
    fn test_bang_without_match_stops_the_line() {
        let (mut sh, out, log) = test_shell();
        sh.handle_command("!echo");
        assert_eq!(output_of(&out), "");
        assert_eq!(
            messages_of(&log, Level::Error),
            vec!["No match in history: echo".to_string()]
        );
    }

    #[test]
    fn test_backquote_capture_feeds_outer_command() {
        let (mut sh, out, _log) = test_shell();
        sh.handle_command("echo `echo nested` done");
        assert_eq!(output_of(&out), "nested done\n");
    }

    #[test]
    fn test_undefined_variable_stops_the_line() {
        let (mut sh, out, log) = test_shell();
        sh.handle_command("echo $missing");
        assert_eq!(output_of(&out), "");
        assert_eq!(
            messages_of(&log, Level::Error),
            vec!["Undefined variable: missing".to_string()]
        );
    }

    #[test]
    fn test_comment_line_does_nothing() {
        let (mut sh, out, log) = test_shell();
        sh.handle_command("# just a note");
        assert_eq!(output_of(&out), "");
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_question_mark_shows_command_help() {
        let (mut sh, out, _log) = test_shell();
        sh.handle_command("echo ?");
        let printed = output_of(&out);
        assert!(printed.starts_with("echo <string>\n"));
        assert!(printed.contains("Echo the arguments to the output stream."));
        assert!(sh.history().is_empty());
    }

    #[test]
    fn test_handle_input_runs_pasted_lines_separately() {
        let (mut sh, out, _log) = test_shell();
        sh.handle_input("echo a\necho b");
        assert_eq!(output_of(&out), "a\nb\n");
        assert_eq!(sh.history(), &["echo a".to_string(), "echo b".to_string()]);
    }

    #[test]
    fn test_handle_input_stops_at_blank_line() {
        let (mut sh, out, _log) = test_shell();
        sh.handle_input("echo one\necho two\n\necho three\n");
        assert_eq!(output_of(&out), "one\ntwo\n");
    }

    #[test]
    fn test_handle_input_stops_after_exit() {
        let (mut sh, out, _log) = test_shell();
        sh.handle_input("echo one\nexit\necho two\n");
        assert_eq!(output_of(&out), "one\n");
        assert!(sh.should_exit());
    }

    #[test]
    fn test_reregistration_replaces_entries() {
        let (mut sh, _out, _log) = test_shell();
        let before = sh.command_names().len();
        crate::builtin::register_defaults(&mut sh);
        assert_eq!(sh.command_names().len(), before);
    }

    #[test]
    fn test_normalize_usage() {
        assert_eq!(normalize_usage("echo", Some("echo <string>")), "echo <string>");
        assert_eq!(normalize_usage("history run", Some("<index>")), "history run <index>");
        assert_eq!(normalize_usage("exit", None), "exit");
    }

    #[test]
    fn test_complete_line_offers_full_names() {
        let commands = vec!["echo".to_string(), "exit".to_string(), "expr".to_string()];
        assert_eq!(complete_line(&commands, "ec"), vec!["echo"]);
        assert_eq!(complete_line(&commands, "e"), vec!["echo", "exit", "expr"]);
    }

    #[test]
    fn test_complete_line_offers_next_words_first() {
        let commands = vec![
            "history".to_string(),
            "history run".to_string(),
            "history search".to_string(),
        ];
        assert_eq!(complete_line(&commands, "hi"), vec!["history"]);
        assert_eq!(
            complete_line(&commands, "history "),
            vec!["history run", "history search"]
        );
    }
}
