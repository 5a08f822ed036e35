use log::Level;
use std::cell::RefCell;
use std::rc::Rc;

/// Leveled sink for interpreter diagnostics: unknown commands, lexical and
/// substitution faults, and the match/winnow traces. The default relay
/// forwards to the global `log` facade; tests swap in [`BufferLogger`] to
/// assert on what was reported.
pub trait Logger {
    fn log(&mut self, level: Level, message: &str);

    fn debug(&mut self, message: &str) {
        self.log(Level::Debug, message);
    }

    fn info(&mut self, message: &str) {
        self.log(Level::Info, message);
    }

    fn warning(&mut self, message: &str) {
        self.log(Level::Warn, message);
    }

    fn error(&mut self, message: &str) {
        self.log(Level::Error, message);
    }
}

/// Forwards every entry to whatever logger the binary installed.
#[derive(Debug, Default)]
pub struct LogRelay;

impl Logger for LogRelay {
    fn log(&mut self, level: Level, message: &str) {
        log::log!(level, "{}", message);
    }
}

/// Collects entries in memory behind a shared handle, so a test can hand
/// the logger to a session and still read what accumulated.
pub struct BufferLogger {
    entries: Rc<RefCell<Vec<(Level, String)>>>,
}

impl BufferLogger {
    pub fn new() -> Self {
        Self {
            entries: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// A logger plus the handle its entries can be read through.
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<(Level, String)>>>) {
        let logger = Self::new();
        let handle = logger.entries.clone();
        (logger, handle)
    }
}

impl Default for BufferLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for BufferLogger {
    fn log(&mut self, level: Level, message: &str) {
        self.entries.borrow_mut().push((level, message.to_string()));
    }
}
