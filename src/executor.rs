//! Traced command executor wrapper.

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::command::Command;
use crate::provider::{TracingBackend, TracingProvider};
use crate::tracer::Tracer;

/// Sends one command to the server and returns its reply document.
///
/// Implemented by the dispatch layer; this crate only wraps it.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    type Error: Display + Send;

    async fn execute(&self, command: &Command) -> Result<Value, Self::Error>;
}

/// A traced wrapper around any [`CommandExecutor`].
///
/// Implements `CommandExecutor` itself, so it is a drop-in replacement for the
/// executor it wraps. Every command runs inside a span named after its verb and
/// namespace, e.g. `find shop.orders`.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use mongodb_tracing::{Tracer, TracingConfig, TracingExt};
///
/// let tracer = Arc::new(Tracer::from_env());
/// let traced = executor.with_tracing(tracer);
///
/// // All commands are now traced
/// let reply = traced.execute(&command).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TracedExecutor<X, P = TracingBackend> {
    inner: X,
    tracer: Arc<Tracer<P>>,
    obfuscate: bool,
}

impl<X, P: TracingProvider> TracedExecutor<X, P> {
    /// Create a traced executor. Obfuscation follows the tracer's config.
    pub fn new(executor: X, tracer: Arc<Tracer<P>>) -> Self {
        let obfuscate = tracer.config().obfuscate;
        Self {
            inner: executor,
            tracer,
            obfuscate,
        }
    }

    /// Override value obfuscation for this executor.
    pub fn with_obfuscation(mut self, obfuscate: bool) -> Self {
        self.obfuscate = obfuscate;
        self
    }

    /// Get a reference to the underlying executor.
    pub fn inner(&self) -> &X {
        &self.inner
    }

    pub fn tracer(&self) -> &Tracer<P> {
        &self.tracer
    }

    /// Consume the wrapper and return the inner executor.
    pub fn into_inner(self) -> X {
        self.inner
    }
}

#[async_trait]
impl<X, P> CommandExecutor for TracedExecutor<X, P>
where
    X: CommandExecutor,
    P: TracingProvider,
{
    type Error = X::Error;

    async fn execute(&self, command: &Command) -> Result<Value, Self::Error> {
        let name = command.span_name(self.tracer.config().database_name.as_deref());

        self.tracer
            .in_span_async(&name, command, self.obfuscate, || self.inner.execute(command))
            .await
    }
}

/// Extension trait for easy wrapping of executors.
pub trait TracingExt: Sized {
    /// Wrap this executor with tracing instrumentation.
    fn with_tracing<P: TracingProvider>(self, tracer: Arc<Tracer<P>>) -> TracedExecutor<Self, P>;
}

impl<X: CommandExecutor> TracingExt for X {
    fn with_tracing<P: TracingProvider>(self, tracer: Arc<Tracer<P>>) -> TracedExecutor<Self, P> {
        TracedExecutor::new(self, tracer)
    }
}
