use crate::args::{Arguments, ArgsError};
use crate::command::ShellCommand;
use crate::interpreter::Interpreter;
use anyhow::Result;
use std::io::Write;
use std::rc::Rc;

/// Register the commands every session starts with.
pub fn register_defaults(shell: &mut Interpreter) {
    shell.register(Rc::new(Echo));
    shell.register(Rc::new(Exit));
    shell.register(Rc::new(Expr));
    shell.register(Rc::new(Help));
    shell.register(Rc::new(Set));
    shell.register(Rc::new(History));
    shell.register(Rc::new(HistoryRun));
    shell.register(Rc::new(HistorySearch));
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

/// Echo the processed arguments to the output stream.
pub struct Echo;

impl ShellCommand for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn help(&self) -> Option<&'static str> {
        Some("Echo the arguments to the output stream.")
    }

    fn usage(&self) -> Option<&'static str> {
        Some("echo <string>")
    }

    fn run(&self, shell: &mut Interpreter, args: &mut Arguments) -> Result<()> {
        let text = args.end_with_string();
        writeln!(shell.output(), "{}", text)?;
        Ok(())
    }
}

pub struct Exit;

impl ShellCommand for Exit {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["quit"]
    }

    fn help(&self) -> Option<&'static str> {
        Some("Exit the program.")
    }

    fn run(&self, shell: &mut Interpreter, args: &mut Arguments) -> Result<()> {
        args.end()?;
        shell.request_exit();
        Ok(())
    }
}

/// Evaluate `<number> <operator> <number>` and print the result.
pub struct Expr;

impl ShellCommand for Expr {
    fn name(&self) -> &'static str {
        "expr"
    }

    fn help(&self) -> Option<&'static str> {
        Some("Evaluate a simple expression.")
    }

    fn usage(&self) -> Option<&'static str> {
        Some("expr <number> <operator> <number>")
    }

    fn run(&self, shell: &mut Interpreter, args: &mut Arguments) -> Result<()> {
        let a = args.shift_float()?;
        let op = args.shift_string()?;
        let b = args.shift_float()?;
        args.end()?;
        let result = match op.as_str() {
            "+" => a + b,
            "-" => a - b,
            "*" => a * b,
            "/" => a / b,
            _ => {
                return Err(ArgsError::Bad {
                    value: op,
                    reason: "Invalid operator.".to_string(),
                }
                .into());
            }
        };
        writeln!(shell.output(), "{}", result)?;
        Ok(())
    }
}

pub struct Help;

impl ShellCommand for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn help(&self) -> Option<&'static str> {
        Some("Show available commands.")
    }

    fn usage(&self) -> Option<&'static str> {
        Some("help [command...]")
    }

    fn run(&self, shell: &mut Interpreter, args: &mut Arguments) -> Result<()> {
        if args.is_empty() {
            shell.show_help(None);
            return Ok(());
        }
        let names = args.end_with_vec();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        shell.show_help(Some(&refs));
        Ok(())
    }
}

pub struct Set;

impl ShellCommand for Set {
    fn name(&self) -> &'static str {
        "set"
    }

    fn help(&self) -> Option<&'static str> {
        Some("Set a variable.")
    }

    fn usage(&self) -> Option<&'static str> {
        Some("set <variable> <value...>")
    }

    fn run(&self, shell: &mut Interpreter, args: &mut Arguments) -> Result<()> {
        let name = args.shift_required("Missing variable name")?;
        let value = args.end_with_string_required("Missing value")?;
        shell.set_variable(name, value);
        Ok(())
    }
}

/// List the session history with each entry's index.
///
/// Indices are stable: entries keep the number they were first listed
/// under even after the oldest lines age out.
pub struct History;

impl ShellCommand for History {
    fn name(&self) -> &'static str {
        "history"
    }

    fn help(&self) -> Option<&'static str> {
        Some("Show command history.")
    }

    fn usage(&self) -> Option<&'static str> {
        Some("history")
    }

    fn records_history(&self) -> bool {
        false
    }

    fn run(&self, shell: &mut Interpreter, args: &mut Arguments) -> Result<()> {
        args.end()?;
        let start = shell.history_start();
        let lines: Vec<String> = shell
            .history()
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:>3} {}", start + i, line))
            .collect();
        let out = shell.output();
        writeln!(out, "History has {} command{}:", lines.len(), plural(lines.len()))?;
        for line in &lines {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }
}

pub struct HistoryRun;

impl ShellCommand for HistoryRun {
    fn name(&self) -> &'static str {
        "history run"
    }

    fn help(&self) -> Option<&'static str> {
        Some("Run a command from the history.")
    }

    fn usage(&self) -> Option<&'static str> {
        Some("<index>")
    }

    fn records_history(&self) -> bool {
        false
    }

    fn run(&self, shell: &mut Interpreter, args: &mut Arguments) -> Result<()> {
        let index = args.shift_unsigned()?;
        args.end()?;
        let Some(line) = shell.history_entry(index).map(str::to_string) else {
            let message = format!("History index {} is out of range.", index);
            shell.logger().error(&message);
            return Ok(());
        };
        shell.logger().info(&format!("[{}]", line));
        shell.handle_command(&line);
        Ok(())
    }
}

pub struct HistorySearch;

impl ShellCommand for HistorySearch {
    fn name(&self) -> &'static str {
        "history search"
    }

    fn help(&self) -> Option<&'static str> {
        Some("Search command history.")
    }

    fn usage(&self) -> Option<&'static str> {
        Some("<string>")
    }

    fn records_history(&self) -> bool {
        false
    }

    fn run(&self, shell: &mut Interpreter, args: &mut Arguments) -> Result<()> {
        // An empty search string matches every entry.
        let needle = args.end_with_string();
        let start = shell.history_start();
        let matching: Vec<String> = shell
            .history()
            .iter()
            .enumerate()
            .filter(|(_, line)| line.contains(&needle))
            .map(|(i, line)| format!("{:>3} {}", start + i, line))
            .collect();
        let out = shell.output();
        writeln!(
            out,
            "History has {} matching command{}:",
            matching.len(),
            plural(matching.len())
        )?;
        for line in &matching {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }
}

/// Echo the processed arguments to the error stream.
pub struct EchoError;

impl ShellCommand for EchoError {
    fn name(&self) -> &'static str {
        "echo error"
    }

    fn help(&self) -> Option<&'static str> {
        Some("Echo arguments to stderr.")
    }

    fn usage(&self) -> Option<&'static str> {
        Some("echo error <string...>")
    }

    fn run(&self, shell: &mut Interpreter, args: &mut Arguments) -> Result<()> {
        let text = args.end_with_string();
        writeln!(shell.error_output(), "{}", text)?;
        Ok(())
    }
}

/// Example command that reverses each argument and echoes them back.
/// Registered by the binary to show how to add a command.
pub struct Reverse;

impl ShellCommand for Reverse {
    fn name(&self) -> &'static str {
        "reverse"
    }

    fn help(&self) -> Option<&'static str> {
        Some("Reverse the arguments and echo them to the output stream.")
    }

    fn usage(&self) -> Option<&'static str> {
        Some("reverse <string>")
    }

    fn run(&self, shell: &mut Interpreter, args: &mut Arguments) -> Result<()> {
        let out = shell.output();
        let mut first = true;
        while let Some(arg) = args.shift() {
            if !first {
                write!(out, " ")?;
            }
            let reversed: String = arg.chars().rev().collect();
            write!(out, "{}", reversed)?;
            first = false;
        }
        writeln!(out)?;
        Ok(())
    }
}
