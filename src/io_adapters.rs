use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// In-memory writer used to capture command output: backquote substitution
/// swaps one in for the session's output stream while the nested line runs,
/// and tests use the shared handle to read what a command printed.
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    pub fn new() -> Self {
        Self {
            buf: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// A writer plus the buffer handle it writes through.
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let writer = Self::new();
        let handle = writer.buf.clone();
        (writer, handle)
    }
}

impl Default for MemWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
