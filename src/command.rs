use crate::args::Arguments;
use crate::interpreter::Interpreter;
use anyhow::Result;

/// A command that can be registered with a session.
///
/// `name` is the canonical (possibly multi-word) name users type, matched
/// by prefix. The metadata methods feed the registry: aliases become
/// independent entries, help text shows up in `help` output, and the usage
/// string gets the command name prepended at registration when it does not
/// already start with it.
///
/// `run` receives the session itself, so a command can write output, read
/// and set variables, walk the history, or dispatch further lines.
/// Argument faults should be surfaced by returning an [`ArgsError`]
/// (usually just with `?` from the `Arguments` methods); the dispatcher
/// turns those into a logged message plus a usage reminder.
///
/// [`ArgsError`]: crate::args::ArgsError
pub trait ShellCommand {
    fn name(&self) -> &'static str;

    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn help(&self) -> Option<&'static str> {
        None
    }

    fn usage(&self) -> Option<&'static str> {
        None
    }

    /// Whether successful invocations are recorded to the session history.
    /// Commands that manipulate the history themselves opt out.
    fn records_history(&self) -> bool {
        true
    }

    fn run(&self, shell: &mut Interpreter, args: &mut Arguments) -> Result<()>;
}
