//! Job context: cancellation, progress reporting and the job record.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Progress sink: `(percent, message)`.
pub type ProgressSink = Arc<dyn Fn(u8, &str) + Send + Sync>;

/// Cooperative cancellation flag shared between a job and its scheduler.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Error::Cancelled)` once cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Display name and metadata of a job, shared with the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobRecord {
    pub name: String,
    pub metadata: BTreeMap<String, String>,
}

impl JobRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: BTreeMap::new(),
        }
    }
}

/// Everything the scheduler hands to a running job.
#[derive(Clone, Default)]
pub struct JobContext {
    pub cancel: CancellationToken,
    pub progress: Option<ProgressSink>,
    pub record: Arc<Mutex<JobRecord>>,
}

impl JobContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, sink: impl Fn(u8, &str) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(sink));
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_record(mut self, record: JobRecord) -> Self {
        self.record = Arc::new(Mutex::new(record));
        self
    }
}

/// Forwards progress to a sink, never letting the value go backwards.
///
/// Values are capped at 99 until [`ProgressReporter::complete`] emits 100.
pub struct ProgressReporter {
    sink: Option<ProgressSink>,
    last: Mutex<u8>,
}

impl ProgressReporter {
    pub fn new(sink: Option<ProgressSink>) -> Self {
        Self {
            sink,
            last: Mutex::new(0),
        }
    }

    pub fn report(&self, percent: u8, message: &str) {
        let value = {
            let mut last = self.last.lock();
            *last = (*last).max(percent.min(99));
            *last
        };
        if let Some(sink) = &self.sink {
            sink(value, message);
        }
    }

    /// Report `done / total` mapped into the `[from, to]` range.
    pub fn report_scaled(&self, from: u8, to: u8, done: u64, total: u64, message: &str) {
        self.report(scale(from, to, done, total), message);
    }

    pub fn complete(&self, message: &str) {
        *self.last.lock() = 100;
        if let Some(sink) = &self.sink {
            sink(100, message);
        }
    }

    pub fn current(&self) -> u8 {
        *self.last.lock()
    }
}

/// Map `done / total` into `[from, to]`.
pub fn scale(from: u8, to: u8, done: u64, total: u64) -> u8 {
    if total == 0 || to <= from {
        return from;
    }
    let span = u64::from(to - from);
    let offset = done.min(total).saturating_mul(span) / total;
    from + offset as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> (ProgressSink, Arc<Mutex<Vec<(u8, String)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink: ProgressSink = Arc::new(move |p: u8, msg: &str| sink_seen.lock().push((p, msg.to_string())));
        (sink, seen)
    }

    #[test]
    fn test_cancellation_token() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());

        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_progress_never_decreases() {
        let (sink, seen) = recording();
        let progress = ProgressReporter::new(Some(sink));

        progress.report(40, "a");
        progress.report(20, "b");
        progress.report(100, "c");
        assert_eq!(progress.current(), 99);
        progress.complete("done");

        let values: Vec<u8> = seen.lock().iter().map(|(p, _)| *p).collect();
        assert_eq!(values, vec![40, 40, 99, 100]);
    }

    #[test]
    fn test_scale() {
        assert_eq!(scale(25, 75, 0, 1000), 25);
        assert_eq!(scale(25, 75, 500, 1000), 50);
        assert_eq!(scale(25, 75, 1000, 1000), 75);
        assert_eq!(scale(25, 75, 5000, 1000), 75);
        assert_eq!(scale(10, 50, 7, 0), 10);
    }

    #[test]
    fn test_job_context_builders() {
        let ctx = JobContext::new()
            .with_record(JobRecord::new("Album 1"))
            .with_progress(|_, _| {});
        assert_eq!(ctx.record.lock().name, "Album 1");
        assert!(ctx.progress.is_some());
    }
}
