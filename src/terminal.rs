//! Terminal sinks a progress bar draws into.
//!
//! The [`Terminal`] trait is the full capability set the controller relies on:
//! writing text, clearing the current line, moving the cursor to a column and
//! querying the width. Every call may fail; the controller ignores failures so a
//! broken terminal never takes the host program down with it.
//!
//! * [`StderrTerminal`] writes ANSI escapes to standard error, one flush per frame.
//! * [`BufferTerminal`] records every call in memory, for tests and for callers that
//!   want to capture frames.

use std::{
    env,
    fmt::Write as _,
    io::{self, Write as _},
    sync::Arc,
};

use parking_lot::Mutex;

/// Fallback width used when the terminal size cannot be determined.
pub const DEFAULT_COLUMNS: usize = 80;

/// Output capabilities required to draw a progress line.
pub trait Terminal: Send {
    /// Writes `text` at the current cursor position.
    fn write(&mut self, text: &str) -> io::Result<()>;

    /// Clears the whole current line.
    fn clear_line(&mut self) -> io::Result<()>;

    /// Moves the cursor to the zero-based `column` of the current line.
    fn cursor_to(&mut self, column: usize) -> io::Result<()>;

    /// Returns the terminal width in columns, if known.
    fn columns(&self) -> Option<usize>;

    /// Pushes buffered output to the device. Called once after every frame.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes to the process' standard error stream.
///
/// Output is collected until [`flush`](Terminal::flush), so a whole frame reaches
/// stderr in a single locked write.
#[derive(Clone, Debug, Default)]
pub struct StderrTerminal {
    pending: String,
}

impl Terminal for StderrTerminal {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.pending.push_str(text);
        Ok(())
    }

    fn clear_line(&mut self) -> io::Result<()> {
        self.pending.push_str("\x1b[2K");
        Ok(())
    }

    fn cursor_to(&mut self, column: usize) -> io::Result<()> {
        // CHA is one-based.
        let _ = write!(self.pending, "\x1b[{}G", column + 1);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.pending);
        let mut stderr = io::stderr().lock();
        stderr.write_all(text.as_bytes())?;
        stderr.flush()
    }

    fn columns(&self) -> Option<usize> {
        if let Some((width, _)) = terminal_size::terminal_size() {
            return Some(usize::from(width.0));
        }
        env::var("COLUMNS").ok()?.parse().ok()
    }
}

/// A single recorded call on a [`BufferTerminal`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TerminalOp {
    /// Text written.
    Write(String),
    /// The line was cleared.
    ClearLine,
    /// The cursor was moved to a column.
    CursorTo(usize),
}

#[derive(Debug, Default)]
struct Buffer {
    ops: Vec<TerminalOp>,
    columns: Option<usize>,
    failing: bool,
    flushes: usize,
}

/// An in-memory terminal that records every operation.
///
/// Clones share the same buffer, so one handle can be given to a bar while
/// another inspects what was drawn.
#[derive(Clone, Debug, Default)]
pub struct BufferTerminal {
    inner: Arc<Mutex<Buffer>>,
}

impl BufferTerminal {
    /// Creates a recorder that reports `columns` as its width.
    #[must_use]
    pub fn new(columns: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Buffer {
                columns: Some(columns),
                ..Buffer::default()
            })),
        }
    }

    /// Changes the reported width.
    pub fn set_columns(&self, columns: Option<usize>) {
        self.inner.lock().columns = columns;
    }

    /// Makes every subsequent call fail with a broken-pipe error.
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().failing = failing;
    }

    /// Returns all recorded operations.
    #[must_use]
    pub fn ops(&self) -> Vec<TerminalOp> {
        self.inner.lock().ops.clone()
    }

    /// Returns only the written text, one entry per write call.
    #[must_use]
    pub fn writes(&self) -> Vec<String> {
        self.inner
            .lock()
            .ops
            .iter()
            .filter_map(|op| match op {
                TerminalOp::Write(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of flush calls so far.
    #[must_use]
    pub fn flushes(&self) -> usize {
        self.inner.lock().flushes
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.inner.lock().ops.clear();
    }

    fn record(&self, op: TerminalOp) -> io::Result<()> {
        let mut inner = self.inner.lock();
        if inner.failing {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        inner.ops.push(op);
        Ok(())
    }
}

impl Terminal for BufferTerminal {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.record(TerminalOp::Write(text.to_owned()))
    }

    fn clear_line(&mut self) -> io::Result<()> {
        self.record(TerminalOp::ClearLine)
    }

    fn cursor_to(&mut self, column: usize) -> io::Result<()> {
        self.record(TerminalOp::CursorTo(column))
    }

    fn columns(&self) -> Option<usize> {
        self.inner.lock().columns
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut inner = self.inner.lock();
        if inner.failing {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        inner.flushes += 1;
        Ok(())
    }
}
