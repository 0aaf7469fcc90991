//! Trace span emission contract and the default `tracing`-backed sink.
//!
//! The sink is constructed once, shared by every proxy, and safe for
//! concurrent span creation. Each span handle is owned exclusively by the
//! in-flight call that opened it and closes when dropped, so closure is
//! guaranteed on every exit path.

use std::time::Instant;

use tracing::{field, Level, Span};

use crate::config::TraceConfig;

/// Tag values carried by a span: string- or boolean-valued.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Bool(bool),
    Str(String),
}

impl From<bool> for TagValue {
    fn from(value: bool) -> Self {
        TagValue::Bool(value)
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        TagValue::Str(value)
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        TagValue::Str(value.to_string())
    }
}

/// Factory for named spans.
///
/// Process-wide, immutable after construction, and shared by all proxies.
/// Implementations must support concurrent span creation without coordination.
pub trait SpanSink: Send + Sync {
    /// Open a span named after a method's simple name.
    fn start_span(&self, name: &'static str) -> Box<dyn SpanHandle>;
}

/// One open span covering one method invocation.
///
/// Dropping the handle closes the span.
pub trait SpanHandle: Send {
    /// Attach a tag to the span.
    fn tag(&mut self, key: &'static str, value: TagValue);
}

/// Default sink backed by the `tracing` crate.
///
/// Spans carry the method name in both the `method` field and `otel.name`,
/// so OpenTelemetry layers display the method as the span name. Elapsed
/// milliseconds are recorded at close when enabled.
pub struct TracingSpanSink {
    level: Level,
    record_elapsed: bool,
}

impl TracingSpanSink {
    pub fn new(config: &TraceConfig) -> Self {
        Self {
            level: config.tracing_level(),
            record_elapsed: config.record_elapsed,
        }
    }
}

impl Default for TracingSpanSink {
    fn default() -> Self {
        Self::new(&TraceConfig::default())
    }
}

impl SpanSink for TracingSpanSink {
    fn start_span(&self, name: &'static str) -> Box<dyn SpanHandle> {
        // span! bakes its level into static callsite metadata, so each
        // level needs its own constant-level invocation.
        macro_rules! call_span {
            ($level:expr) => {
                tracing::span!(
                    target: "traced_services",
                    $level,
                    "call",
                    otel.name = name,
                    method = field::Empty,
                    error = field::Empty,
                    exception = field::Empty,
                    elapsed_ms = field::Empty,
                )
            };
        }

        let span = if self.level == Level::TRACE {
            call_span!(Level::TRACE)
        } else if self.level == Level::DEBUG {
            call_span!(Level::DEBUG)
        } else if self.level == Level::INFO {
            call_span!(Level::INFO)
        } else if self.level == Level::WARN {
            call_span!(Level::WARN)
        } else {
            call_span!(Level::ERROR)
        };
        Box::new(TracingSpanHandle {
            span,
            start: Instant::now(),
            record_elapsed: self.record_elapsed,
        })
    }
}

struct TracingSpanHandle {
    span: Span,
    start: Instant,
    record_elapsed: bool,
}

impl SpanHandle for TracingSpanHandle {
    fn tag(&mut self, key: &'static str, value: TagValue) {
        match value {
            TagValue::Bool(b) => {
                self.span.record(key, b);
            }
            TagValue::Str(s) => {
                self.span.record(key, s.as_str());
            }
        }
    }
}

impl Drop for TracingSpanHandle {
    fn drop(&mut self) {
        if self.record_elapsed {
            self.span
                .record("elapsed_ms", self.start.elapsed().as_millis() as u64);
        }
    }
}
