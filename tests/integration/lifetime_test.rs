//! Lifetime fidelity through traced contracts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use traced_services::test_utils::RecordingSpanSink;
use traced_services::{Lifetime, Registry, RegistryError};

#[derive(Debug, thiserror::Error)]
enum CounterError {}

traced_services::traced_contract! {
    pub trait HitCounter {
        fn hit(&self) -> Result<usize, CounterError>;
    }
}

#[derive(Default)]
struct InMemoryCounter {
    hits: AtomicUsize,
}

impl HitCounter for InMemoryCounter {
    fn hit(&self) -> Result<usize, CounterError> {
        Ok(self.hits.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[test]
fn test_singleton_proxies_share_one_decorated_instance() {
    let mut registry = Registry::with_sink(Arc::new(RecordingSpanSink::new()));
    registry.add_traced::<dyn HitCounter, InMemoryCounter>(Lifetime::Singleton);
    let provider = registry.build();

    let first = provider.resolve::<dyn HitCounter>().unwrap();
    let second = provider.resolve::<dyn HitCounter>().unwrap();

    assert_eq!(first.hit().unwrap(), 1);
    assert_eq!(second.hit().unwrap(), 2);
}

#[test]
fn test_transient_proxies_wrap_distinct_instances() {
    let mut registry = Registry::with_sink(Arc::new(RecordingSpanSink::new()));
    registry.add_traced::<dyn HitCounter, InMemoryCounter>(Lifetime::Transient);
    let provider = registry.build();

    let first = provider.resolve::<dyn HitCounter>().unwrap();
    let second = provider.resolve::<dyn HitCounter>().unwrap();

    assert_eq!(first.hit().unwrap(), 1);
    assert_eq!(second.hit().unwrap(), 1);
}

#[test]
fn test_scoped_proxies_share_within_scope_only() {
    let mut registry = Registry::with_sink(Arc::new(RecordingSpanSink::new()));
    registry.add_traced::<dyn HitCounter, InMemoryCounter>(Lifetime::Scoped);
    let provider = registry.build();

    let scope_a = provider.create_scope();
    let scope_b = provider.create_scope();

    assert_eq!(scope_a.resolve::<dyn HitCounter>().unwrap().hit().unwrap(), 1);
    assert_eq!(scope_a.resolve::<dyn HitCounter>().unwrap().hit().unwrap(), 2);
    assert_eq!(scope_b.resolve::<dyn HitCounter>().unwrap().hit().unwrap(), 1);
}

#[test]
fn test_keyed_singletons_are_independent() {
    let mut registry = Registry::with_sink(Arc::new(RecordingSpanSink::new()));
    registry.add_traced_keyed::<dyn HitCounter, InMemoryCounter>("blue", Lifetime::Singleton);
    registry.add_traced_keyed::<dyn HitCounter, InMemoryCounter>("green", Lifetime::Singleton);
    let provider = registry.build();

    let blue = provider.resolve_keyed::<dyn HitCounter>("blue").unwrap();
    let green = provider.resolve_keyed::<dyn HitCounter>("green").unwrap();

    assert_eq!(blue.hit().unwrap(), 1);
    assert_eq!(blue.hit().unwrap(), 2);
    assert_eq!(green.hit().unwrap(), 1);
}

#[test]
fn test_unregistered_contract_is_missing() {
    let provider = Registry::new().build();

    assert!(matches!(
        provider.resolve::<dyn HitCounter>(),
        Err(RegistryError::MissingRegistration { .. })
    ));
}
