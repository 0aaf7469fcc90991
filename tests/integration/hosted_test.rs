//! Hosted process lifecycle through the traced proxy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use traced_services::test_utils::{MockHostedProcess, RecordingSpanSink};
use traced_services::{HostedProcess, ProcessError, Registry, TagValue};

#[tokio::test]
async fn test_hosted_process_start_and_stop_are_traced() {
    let sink = RecordingSpanSink::new();
    let mut registry = Registry::with_sink(Arc::new(sink.clone()));
    registry.add_traced_hosted::<MockHostedProcess>();
    let provider = registry.build();

    let process = provider.resolve::<dyn HostedProcess>().unwrap();
    process.start().await.unwrap();
    process.stop().await.unwrap();

    let spans = sink.closed();
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].name, "start");
    assert_eq!(spans[0].tag("method"), Some(&TagValue::Str("start".into())));
    assert_eq!(spans[1].name, "stop");

    let worker = provider.resolve::<MockHostedProcess>().unwrap();
    assert!(worker.started.load(Ordering::SeqCst));
    assert!(worker.stopped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_hosted_process_failure_is_tagged_and_propagated() {
    let sink = RecordingSpanSink::new();
    let mut registry = Registry::with_sink(Arc::new(sink.clone()));
    registry.add_traced_hosted_with::<MockHostedProcess, _>(|_| {
        let process = MockHostedProcess::default();
        process.fail_on_stop.store(true, Ordering::SeqCst);
        Ok(Arc::new(process))
    });
    let provider = registry.build();

    let process = provider.resolve::<dyn HostedProcess>().unwrap();
    process.start().await.unwrap();
    let error = process.stop().await.unwrap_err();
    assert_eq!(error.to_string(), "stop failed");

    let spans = sink.closed();
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[1].tag("error"), Some(&TagValue::Bool(true)));
    assert_eq!(
        spans[1].tag("exception"),
        Some(&TagValue::Str("stop failed".into()))
    );
}

/// Worker that suspends during start, to pin span bracketing across awaits.
#[derive(Default)]
struct SlowWorker {
    running: AtomicBool,
}

#[async_trait::async_trait]
impl HostedProcess for SlowWorker {
    async fn start(&self) -> Result<(), ProcessError> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ProcessError> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_span_closes_only_after_suspended_start_completes() {
    let sink = RecordingSpanSink::new();
    let mut registry = Registry::with_sink(Arc::new(sink.clone()));
    registry.add_traced_hosted::<SlowWorker>();
    let provider = registry.build();

    let process = provider.resolve::<dyn HostedProcess>().unwrap();

    let pending = process.start();
    tokio::pin!(pending);

    // Poll once so the span has opened but the call is still suspended.
    let _ = futures::poll!(pending.as_mut());
    assert_eq!(sink.opened(), 1);
    assert!(sink.closed().is_empty());

    pending.await.unwrap();
    assert_eq!(sink.closed().len(), 1);
    assert_eq!(sink.closed()[0].name, "start");
}
