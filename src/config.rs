//! Configuration for the default tracing span sink.
//!
//! Deserializable so hosts can embed it in their own configuration files;
//! loading from file or environment is the host's concern.

use serde::Deserialize;
use tracing::Level;

/// Span emission configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Level spans are emitted at: "trace", "debug", "info", "warn" or "error".
    pub level: String,
    /// Record elapsed milliseconds on the span when it closes.
    pub record_elapsed: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
            record_elapsed: true,
        }
    }
}

impl TraceConfig {
    /// Parse the configured level, falling back to DEBUG for unknown values.
    pub(crate) fn tracing_level(&self) -> Level {
        match self.level.to_ascii_lowercase().as_str() {
            "trace" => Level::TRACE,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::DEBUG,
        }
    }
}
