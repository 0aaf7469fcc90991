//! End-to-end registration and invocation through a traced contract.

use std::sync::Arc;

use traced_services::test_utils::RecordingSpanSink;
use traced_services::{Lifetime, Registry, TagValue};

#[derive(Debug, thiserror::Error, PartialEq)]
enum GreetError {
    #[error("name must not be empty")]
    EmptyName,
}

traced_services::traced_contract! {
    pub trait Greeter {
        fn greet(&self, name: &str) -> Result<String, GreetError>;
    }
}

#[derive(Default)]
struct HelloGreeter;

impl Greeter for HelloGreeter {
    fn greet(&self, name: &str) -> Result<String, GreetError> {
        if name.is_empty() {
            return Err(GreetError::EmptyName);
        }
        Ok(format!("Hello, {}", name))
    }
}

#[test]
fn test_greet_through_registered_contract() {
    let sink = RecordingSpanSink::new();
    let mut registry = Registry::with_sink(Arc::new(sink.clone()));
    registry.add_traced::<dyn Greeter, HelloGreeter>(Lifetime::Singleton);
    let provider = registry.build();

    let greeter = provider.resolve::<dyn Greeter>().unwrap();
    assert_eq!(greeter.greet("Ana").unwrap(), "Hello, Ana");

    let spans = sink.closed();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "greet");
    assert_eq!(spans[0].tag("method"), Some(&TagValue::Str("greet".into())));
    assert_eq!(spans[0].tag("error"), None);
}

#[test]
fn test_greet_failure_preserves_kind_and_message() {
    let sink = RecordingSpanSink::new();
    let mut registry = Registry::with_sink(Arc::new(sink.clone()));
    registry.add_traced::<dyn Greeter, HelloGreeter>(Lifetime::Singleton);
    let provider = registry.build();

    let greeter = provider.resolve::<dyn Greeter>().unwrap();
    let proxied = greeter.greet("").unwrap_err();
    let direct = HelloGreeter.greet("").unwrap_err();

    assert_eq!(proxied, direct);
    assert_eq!(proxied.to_string(), direct.to_string());

    let spans = sink.closed();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].tag("error"), Some(&TagValue::Bool(true)));
    assert_eq!(
        spans[0].tag("exception"),
        Some(&TagValue::Str("name must not be empty".into()))
    );
}

#[test]
fn test_default_sink_works_without_subscriber() {
    // The default tracing-backed sink must not require a subscriber.
    let mut registry = Registry::new();
    registry.add_traced::<dyn Greeter, HelloGreeter>(Lifetime::Singleton);
    let provider = registry.build();

    let greeter = provider.resolve::<dyn Greeter>().unwrap();
    assert_eq!(greeter.greet("Ana").unwrap(), "Hello, Ana");
    assert!(greeter.greet("").is_err());
}
