//! Test utilities and mock implementations.
//!
//! Provides a recording span sink for asserting on span bracketing and tag
//! contents, and a mock hosted process, so tests never need a real tracing
//! subscriber.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::hosted::ProcessError;
use crate::trace::{SpanHandle, SpanSink, TagValue};

/// One closed span as observed by [`RecordingSpanSink`].
#[derive(Debug, Clone)]
pub struct RecordedSpan {
    /// The method simple name the span was opened with.
    pub name: &'static str,
    /// Tags in the order they were attached.
    pub tags: Vec<(&'static str, TagValue)>,
}

impl RecordedSpan {
    /// Look up a tag by key.
    pub fn tag(&self, key: &str) -> Option<&TagValue> {
        self.tags.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

#[derive(Default)]
struct SinkState {
    opened: AtomicUsize,
    closed: Mutex<Vec<RecordedSpan>>,
}

/// Span sink that records every opened span and its tags for assertions.
///
/// Clones share state, so a clone can be handed to a registry while the
/// original stays available to the test.
#[derive(Clone, Default)]
pub struct RecordingSpanSink {
    state: Arc<SinkState>,
}

impl RecordingSpanSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of spans opened so far.
    pub fn opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    /// Snapshot of closed spans, in close order.
    pub fn closed(&self) -> Vec<RecordedSpan> {
        self.state.closed.lock().clone()
    }
}

impl SpanSink for RecordingSpanSink {
    fn start_span(&self, name: &'static str) -> Box<dyn SpanHandle> {
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Box::new(RecordingSpan {
            name,
            tags: Vec::new(),
            state: self.state.clone(),
        })
    }
}

struct RecordingSpan {
    name: &'static str,
    tags: Vec<(&'static str, TagValue)>,
    state: Arc<SinkState>,
}

impl SpanHandle for RecordingSpan {
    fn tag(&mut self, key: &'static str, value: TagValue) {
        self.tags.push((key, value));
    }
}

impl Drop for RecordingSpan {
    fn drop(&mut self) {
        self.state.closed.lock().push(RecordedSpan {
            name: self.name,
            tags: std::mem::take(&mut self.tags),
        });
    }
}

/// Mock hosted process recording lifecycle calls, with failure toggles.
#[derive(Default)]
pub struct MockHostedProcess {
    pub started: AtomicBool,
    pub stopped: AtomicBool,
    pub fail_on_start: AtomicBool,
    pub fail_on_stop: AtomicBool,
}

#[async_trait::async_trait]
impl crate::hosted::HostedProcess for MockHostedProcess {
    async fn start(&self) -> Result<(), ProcessError> {
        if self.fail_on_start.load(Ordering::SeqCst) {
            return Err("start failed".into());
        }
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ProcessError> {
        if self.fail_on_stop.load(Ordering::SeqCst) {
            return Err("stop failed".into());
        }
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}
