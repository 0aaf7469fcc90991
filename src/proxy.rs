//! Tracing proxy wrapper applied at service composition time.
//!
//! [`Traced`] decorates any contract implementation so that every call is
//! intercepted: a span named after the method opens at entry, the call is
//! forwarded with its original arguments, failures are tagged and re-raised
//! with their original identity, and the span closes on every exit path.
//!
//! Rust has no runtime proxy synthesis, so per-contract forwarding impls are
//! generated at compile time by [`traced_contract!`], or written by hand once
//! per contract using the `call*` helpers.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use crate::trace::{SpanHandle, SpanSink, TagValue};

/// Wrapper that adds span instrumentation to a contract implementation.
///
/// Holds only the decorated instance and the shared span sink; it carries no
/// other state and takes no locks. The decorated instance's own thread-safety
/// is its own responsibility.
pub struct Traced<T: ?Sized> {
    inner: Arc<T>,
    sink: Arc<dyn SpanSink>,
}

impl<T: ?Sized> Traced<T> {
    /// Wrap a decorated instance, emitting spans through `sink`.
    pub fn new(inner: Arc<T>, sink: Arc<dyn SpanSink>) -> Self {
        Self { inner, sink }
    }

    /// Get a reference to the decorated instance.
    pub fn inner(&self) -> &Arc<T> {
        &self.inner
    }

    /// Consume the wrapper and return the decorated instance.
    pub fn into_inner(self) -> Arc<T> {
        self.inner
    }

    fn open(&self, method: &'static str) -> Box<dyn SpanHandle> {
        let mut span = self.sink.start_span(method);
        span.tag("method", TagValue::Str(method.to_string()));
        span
    }

    /// Forward a fallible synchronous call, bracketed by a span.
    ///
    /// On failure the span is tagged `error=true` and `exception=<Display of
    /// the error>`, then the error value itself is propagated, never a
    /// wrapper.
    pub fn call<R, E, F>(&self, method: &'static str, f: F) -> Result<R, E>
    where
        E: Display,
        F: FnOnce(&T) -> Result<R, E>,
    {
        let mut span = self.open(method);
        let result = f(&self.inner);
        if let Err(ref error) = result {
            record_failure(&mut span, error);
        }
        result
        // span handle drops here on every path, closing the span
    }

    /// Forward a fallible asynchronous call, bracketed by a span.
    ///
    /// The span handle is held across the await, so the span covers the
    /// entire suspended duration, not just the synchronous portion.
    pub async fn call_async<'a, R, E, F, Fut>(
        &'a self,
        method: &'static str,
        f: F,
    ) -> Result<R, E>
    where
        E: Display,
        F: FnOnce(&'a T) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        let mut span = self.open(method);
        let result = f(self.inner.as_ref()).await;
        if let Err(ref error) = result {
            record_failure(&mut span, error);
        }
        result
    }

    /// Forward an infallible synchronous call, bracketed by a span.
    pub fn call_value<R, F>(&self, method: &'static str, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        let _span = self.open(method);
        f(&self.inner)
    }

    /// Forward an infallible asynchronous call, bracketed by a span.
    pub async fn call_value_async<'a, R, F, Fut>(&'a self, method: &'static str, f: F) -> R
    where
        F: FnOnce(&'a T) -> Fut,
        Fut: Future<Output = R>,
    {
        let _span = self.open(method);
        f(self.inner.as_ref()).await
    }
}

fn record_failure<E: Display>(span: &mut Box<dyn SpanHandle>, error: &E) {
    span.tag("error", TagValue::Bool(true));
    span.tag("exception", TagValue::Str(error.to_string()));
}

/// Coercion seam between the registration helper and a contract trait.
///
/// Generic registration code cannot name `Arc<dyn C>` for an arbitrary
/// contract, so each contract carries one impl of this trait (generated by
/// [`traced_contract!`]) that performs the unsized coercion where the
/// concrete types are known.
pub trait WrapContract<T> {
    /// Wrap a decorated instance into a contract trait object.
    fn wrap(traced: Traced<T>) -> Arc<Self>;
}

/// Declare a contract trait together with its tracing forwarding impls.
///
/// Generates three items: the trait itself (with `Send + Sync` supertraits),
/// an impl of the trait for [`Traced`] that routes every method through a
/// span, and a [`WrapContract`] impl so the registration helpers can produce
/// `Arc<dyn Contract>` proxies.
///
/// Two shapes are supported: all methods synchronous, or all methods `async`
/// (the async shape expands through `#[async_trait]`, which must be a
/// dependency of the calling crate). Every method takes `&self` and returns
/// `Result`. Contracts outside these shapes get a hand-written forwarding
/// impl over the `Traced::call*` helpers instead.
///
/// ```ignore
/// traced_contract! {
///     pub trait Greeter {
///         fn greet(&self, name: &str) -> Result<String, GreetError>;
///     }
/// }
/// ```
#[macro_export]
macro_rules! traced_contract {
    // Synchronous contract: every method is a plain fn returning Result.
    (
        $(#[$meta:meta])*
        $vis:vis trait $name:ident {
            $(
                $(#[$method_meta:meta])*
                fn $method:ident(&self $(, $arg:ident : $arg_ty:ty)* $(,)?) -> Result<$ok:ty, $err:ty>;
            )+
        }
    ) => {
        $(#[$meta])*
        $vis trait $name: Send + Sync {
            $(
                $(#[$method_meta])*
                fn $method(&self $(, $arg: $arg_ty)*) -> Result<$ok, $err>;
            )+
        }

        impl<T: $name + ?Sized> $name for $crate::Traced<T> {
            $(
                fn $method(&self $(, $arg: $arg_ty)*) -> Result<$ok, $err> {
                    self.call(stringify!($method), |inner| inner.$method($($arg),*))
                }
            )+
        }

        impl<T> $crate::WrapContract<T> for dyn $name
        where
            T: $name + 'static,
        {
            fn wrap(traced: $crate::Traced<T>) -> ::std::sync::Arc<Self> {
                ::std::sync::Arc::new(traced)
            }
        }
    };

    // Asynchronous contract: every method is an async fn returning Result.
    (
        $(#[$meta:meta])*
        $vis:vis trait $name:ident {
            $(
                $(#[$method_meta:meta])*
                async fn $method:ident(&self $(, $arg:ident : $arg_ty:ty)* $(,)?) -> Result<$ok:ty, $err:ty>;
            )+
        }
    ) => {
        $(#[$meta])*
        #[async_trait::async_trait]
        $vis trait $name: Send + Sync {
            $(
                $(#[$method_meta])*
                async fn $method(&self $(, $arg: $arg_ty)*) -> Result<$ok, $err>;
            )+
        }

        #[async_trait::async_trait]
        impl<T: $name + ?Sized> $name for $crate::Traced<T> {
            $(
                async fn $method(&self $(, $arg: $arg_ty)*) -> Result<$ok, $err> {
                    self.call_async(stringify!($method), |inner| inner.$method($($arg),*))
                        .await
                }
            )+
        }

        impl<T> $crate::WrapContract<T> for dyn $name
        where
            T: $name + 'static,
        {
            fn wrap(traced: $crate::Traced<T>) -> ::std::sync::Arc<Self> {
                ::std::sync::Arc::new(traced)
            }
        }
    };
}
