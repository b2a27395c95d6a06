//! Process-wide log capture
//!
//! The config cache logs from its actor task and its blocking I/O thread,
//! so a thread-local `set_default` subscriber would miss events. Instead one
//! global subscriber records every formatted line; tests filter the lines by
//! something unique to them (a temp path, an extension id).

use parking_lot::Mutex;
use std::io::Write;
use std::sync::{Arc, OnceLock};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub struct LogCapture {
    buffer: SharedBuffer,
}

static CAPTURE: OnceLock<LogCapture> = OnceLock::new();

impl LogCapture {
    /// Install the capturing subscriber on first use. Records `debug` and above.
    pub fn global() -> &'static LogCapture {
        CAPTURE.get_or_init(|| {
            let buffer = SharedBuffer::default();
            let writer = buffer.clone();
            let _ = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("debug"))
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .try_init();
            LogCapture { buffer }
        })
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.0.lock())
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Number of captured lines containing every one of `needles`.
    pub fn count(&self, needles: &[&str]) -> usize {
        self.lines()
            .iter()
            .filter(|line| needles.iter().all(|n| line.contains(n)))
            .count()
    }
}
