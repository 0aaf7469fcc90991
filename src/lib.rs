//! traced-services - transparent tracing decoration for service contracts.
//!
//! Registers a service under a contract trait and wraps the concrete
//! implementation in a proxy that opens an observability span around every
//! method invocation. Callers that depend on the contract always go through
//! tracing; neither the caller nor the decorated instance is aware of the
//! interception.
//!
//! # Architecture
//!
//! Decoration is applied at registration time, not in implementations:
//!
//! ```ignore
//! traced_contract! {
//!     pub trait Greeter {
//!         fn greet(&self, name: &str) -> Result<String, GreetError>;
//!     }
//! }
//!
//! let mut registry = Registry::new();
//! registry.add_traced::<dyn Greeter, HelloGreeter>(Lifetime::Singleton);
//!
//! let provider = registry.build();
//! let greeter = provider.resolve::<dyn Greeter>()?;
//! greeter.greet("Ana")?; // one span, tagged method=greet
//! ```

pub mod config;
pub mod hosted;
pub mod proxy;
pub mod registration;
pub mod registry;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod trace;

pub use config::TraceConfig;
pub use hosted::{HostedProcess, ProcessError};
pub use proxy::{Traced, WrapContract};
pub use registry::{Lifetime, Provider, Registry, RegistryError, Scope};
pub use trace::{SpanHandle, SpanSink, TagValue, TracingSpanSink};
