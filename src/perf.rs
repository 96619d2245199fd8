//! Lightweight performance instrumentation.
//!
//! Two independent switches: timing scopes printed to stderr (`--perf`) and a
//! render debug event log written to a file (`--render-debug-log`). Both are
//! process-wide so the engine and the viewer can report without plumbing.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

static TIMINGS: AtomicBool = AtomicBool::new(false);
static EVENT_LOG: Mutex<Option<EventLog>> = Mutex::new(None);

/// Prints its lifetime on drop while timings are enabled.
#[derive(Debug)]
#[must_use = "the scope is timed until it is dropped"]
pub struct Timing {
    label: &'static str,
    began: Instant,
}

impl Drop for Timing {
    fn drop(&mut self) {
        if is_enabled() {
            eprintln!("[perf] {:<28} {:.2?}", self.label, self.began.elapsed());
        }
    }
}

/// Render debug events, timestamped from when the log was opened.
#[derive(Debug)]
struct EventLog {
    origin: Instant,
    out: BufWriter<File>,
}

impl EventLog {
    fn create(path: &Path) -> io::Result<Self> {
        let mut log = Self {
            origin: Instant::now(),
            out: BufWriter::new(File::create(path)?),
        };
        log.write("log.open", &path.display().to_string())?;
        Ok(log)
    }

    fn write(&mut self, name: &str, detail: &str) -> io::Result<()> {
        let at = self.origin.elapsed().as_secs_f64() * 1000.0;
        writeln!(self.out, "{at:>10.3}ms {name} {detail}")?;
        self.out.flush()
    }
}

fn event_log() -> MutexGuard<'static, Option<EventLog>> {
    EVENT_LOG.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn set_enabled(enabled: bool) {
    TIMINGS.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    TIMINGS.load(Ordering::Relaxed)
}

pub fn scope(label: &'static str) -> Timing {
    Timing {
        label,
        began: Instant::now(),
    }
}

/// Start writing debug events to `path`, or stop when `None`.
///
/// # Errors
///
/// Returns the I/O error when the file cannot be created or written.
pub fn set_debug_log_path(path: Option<&Path>) -> io::Result<()> {
    let next = path.map(EventLog::create).transpose()?;
    *event_log() = next;
    Ok(())
}

pub fn is_debug_log_enabled() -> bool {
    event_log().is_some()
}

/// Append one event when the debug log is open. Write failures close the log.
pub fn log_event(name: &str, detail: impl AsRef<str>) {
    let mut guard = event_log();
    let failed = guard
        .as_mut()
        .is_some_and(|log| log.write(name, detail.as_ref()).is_err());
    if failed {
        tracing::warn!("render debug log write failed; closing it");
        *guard = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_timings_switch() {
        set_enabled(true);
        assert!(is_enabled());
        drop(scope("test.scope"));
        set_enabled(false);
        assert!(!is_enabled());
    }

    #[test]
    fn test_debug_log_records_events_until_closed() {
        let file = NamedTempFile::new().unwrap();
        set_debug_log_path(Some(file.path())).unwrap();
        assert!(is_debug_log_enabled());
        log_event("engine.page", "page=3 epoch=1");
        set_debug_log_path(None).unwrap();
        assert!(!is_debug_log_enabled());
        log_event("engine.page", "after-close");

        let content = std::fs::read_to_string(file.path()).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().contains("log.open"), "{content}");
        assert!(
            lines.any(|line| line.ends_with("ms engine.page page=3 epoch=1")),
            "{content}"
        );
        assert!(!content.contains("after-close"));
    }
}
