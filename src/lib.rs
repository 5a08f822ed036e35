//! A small, embeddable line-oriented command interpreter.
//!
//! This crate provides the front end of an interactive shell: a quoting and
//! escaping tokenizer, backquote, variable and escape substitution, prefix
//! matching of possibly multi-word command names, and a dispatcher with
//! session history. Commands are implemented in Rust against the
//! [`command::ShellCommand`] trait and registered with a session at runtime.
//!
//! The main entry point is [`Interpreter`], which dispatches single lines or
//! runs an interactive prompt. The public modules expose the building blocks
//! so each stage can be used or tested on its own: [`lexer`] and [`line`] for
//! tokenization, [`subst`] for substitution, [`matcher`] for command name
//! resolution, and [`args`] for typed argument consumption inside commands.

pub mod args;
pub mod builtin;
pub mod command;
pub mod env;
pub mod io_adapters;
pub mod lexer;
pub mod line;
pub mod logger;
pub mod matcher;
pub mod subst;

mod interpreter;

/// Just a convenient re-export of the interactive session type.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
