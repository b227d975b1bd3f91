use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// Bounded ring of formatted log lines shown in the TUI log pane.
pub struct LogStore {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LogStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn push_line(&mut self, line: impl Into<String>) {
        let line = line.into();
        if line.trim().is_empty() {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Up to `max` lines ending `skip_newest` lines before the newest one, oldest first.
    pub fn tail(&self, max: usize, skip_newest: usize) -> Vec<String> {
        let end = self.lines.len().saturating_sub(skip_newest);
        let start = end.saturating_sub(max);
        self.lines.range(start..end).cloned().collect()
    }
}

pub type SharedLogStore = Arc<Mutex<LogStore>>;

#[derive(Clone)]
pub struct LogMakeWriter {
    store: SharedLogStore,
}

impl LogMakeWriter {
    pub fn new(store: SharedLogStore) -> Self {
        Self { store }
    }
}

impl<'a> MakeWriter<'a> for LogMakeWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            store: self.store.clone(),
            pending: String::new(),
        }
    }
}

/// Splits formatted output on newlines; a trailing partial line is kept until drop.
pub struct LogWriter {
    store: SharedLogStore,
    pending: String,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.push_str(&String::from_utf8_lossy(buf));
        if let Some(last_newline) = self.pending.rfind('\n') {
            let rest = self.pending.split_off(last_newline + 1);
            let complete = std::mem::replace(&mut self.pending, rest);
            let mut store = self.store.lock();
            for line in complete.lines() {
                store.push_line(line.trim_end_matches('\r'));
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LogWriter {
    fn drop(&mut self) {
        if !self.pending.trim().is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.store.lock().push_line(line.trim_end());
        }
    }
}
