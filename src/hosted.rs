//! Hosted background process capability.
//!
//! A contract for long-running worker-style components with a managed
//! start/stop lifecycle. Registered through
//! [`Registry::add_traced_hosted`](crate::Registry::add_traced_hosted), the
//! lifecycle calls are traced like any other contract method.

/// Failure raised by a hosted process lifecycle call.
pub type ProcessError = Box<dyn std::error::Error + Send + Sync>;

crate::traced_contract! {
    /// Long-running background component with a managed lifecycle.
    pub trait HostedProcess {
        /// Begin background work. Called once when the host starts.
        async fn start(&self) -> Result<(), ProcessError>;

        /// Stop background work and release resources.
        async fn stop(&self) -> Result<(), ProcessError>;
    }
}
