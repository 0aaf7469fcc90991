//! Traced registration helpers.
//!
//! Each helper registers the implementation in the registry under its own
//! type, then registers the contract trait as resolving to a [`Traced`]
//! proxy wrapping that implementation. Every resolution of the contract
//! yields a proxy; the raw implementation is never exposed through the
//! contract's slot.
//!
//! Contracts are referred to by their trait object type:
//!
//! ```ignore
//! registry.add_traced::<dyn Greeter, HelloGreeter>(Lifetime::Scoped);
//! registry.add_traced_with::<dyn Mailer, SmtpMailer, _>(Lifetime::Singleton, |scope| {
//!     let greeter = scope.resolve::<dyn Greeter>()?;
//!     Ok(Arc::new(SmtpMailer::new(greeter)))
//! });
//! ```

use std::sync::Arc;

use crate::hosted::HostedProcess;
use crate::proxy::{Traced, WrapContract};
use crate::registry::{Lifetime, Registry, Result, Scope};

impl Registry {
    /// Register `I` under itself and the contract `C` as a traced proxy
    /// over it, both with the given lifetime.
    pub fn add_traced<C, I>(&mut self, lifetime: Lifetime) -> &mut Self
    where
        C: WrapContract<I> + ?Sized + Send + Sync + 'static,
        I: Default + Send + Sync + 'static,
    {
        self.add_traced_with::<C, I, _>(lifetime, |_| Ok(Arc::new(I::default())))
    }

    /// As [`add_traced`](Registry::add_traced), with the implementation
    /// produced by a caller-supplied factory.
    pub fn add_traced_with<C, I, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        C: WrapContract<I> + ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        F: Fn(&Scope) -> Result<Arc<I>> + Send + Sync + 'static,
    {
        self.register::<I, _>(lifetime, factory);

        let sink = self.sink();
        self.register::<C, _>(lifetime, move |scope| {
            let decorated = scope.resolve::<I>()?;
            Ok(C::wrap(Traced::new(decorated, sink.clone())))
        });
        self
    }

    /// Keyed variant of [`add_traced`](Registry::add_traced): both the
    /// implementation and the contract are registered under the key.
    pub fn add_traced_keyed<C, I>(&mut self, key: &str, lifetime: Lifetime) -> &mut Self
    where
        C: WrapContract<I> + ?Sized + Send + Sync + 'static,
        I: Default + Send + Sync + 'static,
    {
        self.add_traced_keyed_with::<C, I, _>(key, lifetime, |_| Ok(Arc::new(I::default())))
    }

    /// Keyed variant of [`add_traced_with`](Registry::add_traced_with).
    pub fn add_traced_keyed_with<C, I, F>(
        &mut self,
        key: &str,
        lifetime: Lifetime,
        factory: F,
    ) -> &mut Self
    where
        C: WrapContract<I> + ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        F: Fn(&Scope) -> Result<Arc<I>> + Send + Sync + 'static,
    {
        self.register_keyed::<I, _>(key, lifetime, factory);

        let sink = self.sink();
        let inner_key = key.to_string();
        self.register_keyed::<C, _>(key, lifetime, move |scope| {
            let decorated = scope.resolve_keyed::<I>(&inner_key)?;
            Ok(C::wrap(Traced::new(decorated, sink.clone())))
        });
        self
    }

    /// Wrap an already-constructed instance and register the proxy as a
    /// singleton under the contract only. No separate unwrapped
    /// registration is created.
    pub fn add_traced_instance<C, I>(&mut self, instance: Arc<I>) -> &mut Self
    where
        C: WrapContract<I> + ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
    {
        let proxy = C::wrap(Traced::new(instance, self.sink()));
        self.register::<C, _>(Lifetime::Singleton, move |_| Ok(proxy.clone()));
        self
    }

    /// Singleton register-by-type, only if `C` has no registration yet.
    ///
    /// The check is by contract type alone: a keyed registration of `C`
    /// also suppresses the add, matching the original behavior.
    pub fn try_add_traced<C, I>(&mut self) -> &mut Self
    where
        C: WrapContract<I> + ?Sized + Send + Sync + 'static,
        I: Default + Send + Sync + 'static,
    {
        if !self.contains_type::<C>() {
            self.add_traced::<C, I>(Lifetime::Singleton);
        }
        self
    }

    /// Register a hosted process as a singleton under itself, plus a traced
    /// [`HostedProcess`] proxy over the same instance so lifecycle calls
    /// are traced.
    pub fn add_traced_hosted<I>(&mut self) -> &mut Self
    where
        I: HostedProcess + Default + 'static,
    {
        self.add_traced_hosted_with::<I, _>(|_| Ok(Arc::new(I::default())))
    }

    /// As [`add_traced_hosted`](Registry::add_traced_hosted), with the
    /// process produced by a caller-supplied factory.
    pub fn add_traced_hosted_with<I, F>(&mut self, factory: F) -> &mut Self
    where
        I: HostedProcess + 'static,
        F: Fn(&Scope) -> Result<Arc<I>> + Send + Sync + 'static,
    {
        self.register::<I, _>(Lifetime::Singleton, factory);

        let sink = self.sink();
        self.register::<dyn HostedProcess, _>(Lifetime::Singleton, move |scope| {
            let decorated = scope.resolve::<I>()?;
            Ok(<dyn HostedProcess as WrapContract<I>>::wrap(Traced::new(
                decorated,
                sink.clone(),
            )))
        });
        self
    }
}
