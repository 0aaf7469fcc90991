//! Service registry - type-keyed registrations with lifetime-scoped resolution.
//!
//! A minimal container shaped like the registration contract the traced
//! helpers consume: `register(type, lifetime, key?, factory)` and
//! `resolve(type, key?)`. Registrations are keyed by the contract's `TypeId`
//! plus an optional string key; multiple registrations per slot append, and
//! single resolution uses the last one. It is deliberately not a
//! general-purpose container: no constructor injection, no reflection.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::trace::{SpanSink, TracingSpanSink};

/// How long a container-managed instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// One instance for the provider's whole lifetime.
    Singleton,
    /// One instance per [`Scope`].
    Scoped,
    /// A fresh instance per resolution.
    Transient,
}

/// Error types for registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("missing registration for {contract} (key: {key:?})")]
    MissingRegistration {
        contract: &'static str,
        key: Option<String>,
    },

    /// The type-erased slot payload did not match the requested contract.
    ///
    /// This indicates a defect in the wiring layer, never normal decorated
    /// behavior; it is fatal to the call and not retried.
    #[error("invalid invocation: registration for {contract} holds an unexpected type")]
    InvalidInvocation { contract: &'static str },
}

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ServiceKey {
    type_id: TypeId,
    key: Option<String>,
}

/// A resolved instance, erased for storage. The payload is always the
/// `Arc<S>` of the registered service type.
type AnyInstance = Arc<dyn Any + Send + Sync>;

type Factory = Arc<dyn Fn(&Scope) -> Result<AnyInstance> + Send + Sync>;

struct Registration {
    lifetime: Lifetime,
    contract: &'static str,
    factory: Factory,
}

/// Mutable registration surface, consumed by [`Registry::build`].
pub struct Registry {
    entries: HashMap<ServiceKey, Vec<Registration>>,
    sink: Arc<dyn SpanSink>,
}

impl Registry {
    /// Create a registry emitting spans through the default `tracing` sink.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSpanSink::default()))
    }

    /// Create a registry with an explicitly constructed span sink.
    pub fn with_sink(sink: Arc<dyn SpanSink>) -> Self {
        Self {
            entries: HashMap::new(),
            sink,
        }
    }

    /// The span sink shared by every proxy registered here.
    pub fn sink(&self) -> Arc<dyn SpanSink> {
        self.sink.clone()
    }

    /// Register a factory for `S` under the given lifetime.
    pub fn register<S, F>(&mut self, lifetime: Lifetime, factory: F)
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Scope) -> Result<Arc<S>> + Send + Sync + 'static,
    {
        self.register_slot::<S, F>(None, lifetime, factory);
    }

    /// Register a factory for `S` under the given lifetime and key.
    pub fn register_keyed<S, F>(&mut self, key: impl Into<String>, lifetime: Lifetime, factory: F)
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Scope) -> Result<Arc<S>> + Send + Sync + 'static,
    {
        self.register_slot::<S, F>(Some(key.into()), lifetime, factory);
    }

    fn register_slot<S, F>(&mut self, key: Option<String>, lifetime: Lifetime, factory: F)
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&Scope) -> Result<Arc<S>> + Send + Sync + 'static,
    {
        let contract = std::any::type_name::<S>();
        debug!(contract, key = ?key, lifetime = ?lifetime, "registering service");

        let erased: Factory =
            Arc::new(move |scope| factory(scope).map(|arc| Arc::new(arc) as AnyInstance));

        self.entries
            .entry(ServiceKey {
                type_id: TypeId::of::<S>(),
                key,
            })
            .or_default()
            .push(Registration {
                lifetime,
                contract,
                factory: erased,
            });
    }

    /// Check for an unkeyed registration of `S`.
    pub fn contains<S: ?Sized + 'static>(&self) -> bool {
        self.entries.contains_key(&ServiceKey {
            type_id: TypeId::of::<S>(),
            key: None,
        })
    }

    /// Check for a registration of `S` under the given key.
    pub fn contains_keyed<S: ?Sized + 'static>(&self, key: &str) -> bool {
        self.entries.contains_key(&ServiceKey {
            type_id: TypeId::of::<S>(),
            key: Some(key.to_string()),
        })
    }

    /// Check for any registration of `S`, keyed or not.
    pub fn contains_type<S: ?Sized + 'static>(&self) -> bool {
        let type_id = TypeId::of::<S>();
        self.entries.keys().any(|k| k.type_id == type_id)
    }

    /// Freeze registrations into a resolvable [`Provider`].
    pub fn build(self) -> Provider {
        debug!(registrations = self.entries.len(), "building provider");
        let shared = Arc::new(ProviderShared {
            entries: self.entries,
            singletons: RwLock::new(HashMap::new()),
            sink: self.sink,
        });
        Provider {
            root: Scope::new(shared.clone()),
            shared,
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifies one registration within a slot's append-ordered list.
type SlotId = (ServiceKey, usize);

struct ProviderShared {
    entries: HashMap<ServiceKey, Vec<Registration>>,
    singletons: RwLock<HashMap<SlotId, AnyInstance>>,
    sink: Arc<dyn SpanSink>,
}

/// Immutable resolution surface over the frozen registrations.
///
/// Resolving directly from the provider uses its root scope, so scoped
/// services resolved here behave as root-scoped.
#[derive(Clone)]
pub struct Provider {
    shared: Arc<ProviderShared>,
    root: Scope,
}

impl Provider {
    /// Resolve the unkeyed registration of `S`.
    pub fn resolve<S: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<S>> {
        self.root.resolve::<S>()
    }

    /// Resolve the registration of `S` under the given key.
    pub fn resolve_keyed<S: ?Sized + Send + Sync + 'static>(&self, key: &str) -> Result<Arc<S>> {
        self.root.resolve_keyed::<S>(key)
    }

    /// Resolve every unkeyed registration of `S`, in registration order.
    pub fn resolve_all<S: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<S>>> {
        self.root.resolve_all::<S>()
    }

    /// Open a new scope with its own cache for scoped registrations.
    pub fn create_scope(&self) -> Scope {
        Scope::new(self.shared.clone())
    }

    /// The span sink shared by every proxy resolved from this provider.
    pub fn sink(&self) -> Arc<dyn SpanSink> {
        self.shared.sink.clone()
    }
}

/// One resolution scope: scoped registrations resolve to at most one
/// instance per scope.
#[derive(Clone)]
pub struct Scope {
    shared: Arc<ProviderShared>,
    scoped: Arc<RwLock<HashMap<SlotId, AnyInstance>>>,
}

impl Scope {
    fn new(shared: Arc<ProviderShared>) -> Self {
        Self {
            shared,
            scoped: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Resolve the unkeyed registration of `S`.
    pub fn resolve<S: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<S>> {
        self.resolve_slot::<S>(None)
    }

    /// Resolve the registration of `S` under the given key.
    pub fn resolve_keyed<S: ?Sized + Send + Sync + 'static>(&self, key: &str) -> Result<Arc<S>> {
        self.resolve_slot::<S>(Some(key))
    }

    /// Resolve every unkeyed registration of `S`, in registration order.
    ///
    /// Returns an empty vector when nothing is registered.
    pub fn resolve_all<S: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<S>>> {
        let service_key = ServiceKey {
            type_id: TypeId::of::<S>(),
            key: None,
        };
        let Some(registrations) = self.shared.entries.get(&service_key) else {
            return Ok(Vec::new());
        };

        let mut resolved = Vec::with_capacity(registrations.len());
        for (index, registration) in registrations.iter().enumerate() {
            resolved.push(self.materialize::<S>(&service_key, index, registration)?);
        }
        Ok(resolved)
    }

    fn resolve_slot<S: ?Sized + Send + Sync + 'static>(&self, key: Option<&str>) -> Result<Arc<S>> {
        let service_key = ServiceKey {
            type_id: TypeId::of::<S>(),
            key: key.map(str::to_string),
        };

        let registrations = self
            .shared
            .entries
            .get(&service_key)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| RegistryError::MissingRegistration {
                contract: std::any::type_name::<S>(),
                key: key.map(str::to_string),
            })?;

        // Last registration wins for single resolution.
        let index = registrations.len() - 1;
        self.materialize::<S>(&service_key, index, &registrations[index])
    }

    fn materialize<S: ?Sized + Send + Sync + 'static>(
        &self,
        service_key: &ServiceKey,
        index: usize,
        registration: &Registration,
    ) -> Result<Arc<S>> {
        match registration.lifetime {
            Lifetime::Transient => downcast::<S>((registration.factory)(self)?, registration),
            Lifetime::Singleton => {
                self.cached::<S>(&self.shared.singletons, (service_key.clone(), index), registration)
            }
            Lifetime::Scoped => {
                self.cached::<S>(&self.scoped, (service_key.clone(), index), registration)
            }
        }
    }

    /// Resolve through a cache. The lock is never held while the factory
    /// runs, so factories may re-enter `resolve` for their dependencies; on
    /// a concurrent race the first inserted instance wins.
    fn cached<S: ?Sized + Send + Sync + 'static>(
        &self,
        cache: &RwLock<HashMap<SlotId, AnyInstance>>,
        slot: SlotId,
        registration: &Registration,
    ) -> Result<Arc<S>> {
        if let Some(hit) = cache.read().get(&slot) {
            return downcast::<S>(hit.clone(), registration);
        }

        let built = (registration.factory)(self)?;

        let instance = {
            let mut guard = cache.write();
            guard.entry(slot).or_insert(built).clone()
        };
        downcast::<S>(instance, registration)
    }
}

fn downcast<S: ?Sized + Send + Sync + 'static>(
    instance: AnyInstance,
    registration: &Registration,
) -> Result<Arc<S>> {
    instance
        .downcast::<Arc<S>>()
        .map(|arc| (*arc).clone())
        .map_err(|_| RegistryError::InvalidInvocation {
            contract: registration.contract,
        })
}
