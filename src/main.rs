use argh::FromArgs;
use cmdshell::builtin::{EchoError, Reverse};
use cmdshell::Interpreter;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::rc::Rc;

#[derive(FromArgs)]
/// Interactive line-oriented command interpreter.
struct CliArgs {
    /// log matcher and dispatch details
    #[argh(switch)]
    debug: bool,

    /// prompt shown before each input line
    #[argh(option, default = "String::from(\"$ \")")]
    prompt: String,
}

fn main() -> anyhow::Result<()> {
    let cli: CliArgs = argh::from_env();
    let level = if cli.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)?;

    let mut sh = Interpreter::new();
    sh.set_prompt(cli.prompt);
    sh.register(Rc::new(EchoError));
    sh.register(Rc::new(Reverse));
    sh.repl()?;
    Ok(())
}
