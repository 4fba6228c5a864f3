//! Span lifecycle around a single database command.

use std::fmt::Display;
use std::future::Future;

use tracing::Instrument;

use crate::command::Command;
use crate::config::TracingConfig;
use crate::provider::{SpanHandle, TracingBackend, TracingProvider, DB_STATEMENT};
use crate::statement::StatementBuilder;

/// Wraps command execution in spans carrying a redacted `db.statement`.
///
/// Whether tracing is on is decided once, at construction, and never changes
/// for the lifetime of the value. Build one at client startup and share it
/// (for example behind an `Arc`); every method takes `&self`.
///
/// # Example
///
/// ```rust
/// use mongodb_tracing::{Command, Tracer, TracingConfig};
/// use serde_json::json;
///
/// let tracer = Tracer::new(TracingConfig::default().with_enabled(true));
/// let command = Command::try_from(json!({"find": "orders", "filter": {"a": 1}})).unwrap();
///
/// let reply: Result<u32, std::io::Error> = tracer.in_span("find orders", &command, true, || Ok(3));
/// assert_eq!(reply.unwrap(), 3);
/// ```
#[derive(Debug)]
pub struct Tracer<P = TracingBackend> {
    provider: Option<P>,
    config: TracingConfig,
}

impl Tracer {
    /// Create a tracer backed by the `tracing` crate.
    pub fn new(config: TracingConfig) -> Self {
        let backend = TracingBackend::new(config.slow_command_threshold);
        Self::with_provider(config, backend)
    }

    /// Create a tracer configured from the process environment.
    pub fn from_env() -> Self {
        Self::new(TracingConfig::from_env())
    }

    /// A tracer that never creates spans.
    pub fn disabled() -> Self {
        Self::new(TracingConfig::default().with_enabled(false))
    }
}

impl<P: TracingProvider> Tracer<P> {
    /// Create a tracer over a custom provider.
    ///
    /// The provider is dropped right away when `config.enabled` is false.
    pub fn with_provider(config: TracingConfig, provider: P) -> Self {
        let provider = config.enabled.then_some(provider);
        tracing::debug!(enabled = provider.is_some(), "Command tracing initialized");
        Self { provider, config }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Get the tracing configuration.
    pub fn config(&self) -> &TracingConfig {
        &self.config
    }

    /// Run `block` inside a span named `name`.
    ///
    /// The block's result is returned untouched. An `Err` marks the span as
    /// failed before it is ended; the error itself still reaches the caller.
    pub fn in_span<T, E, F>(&self, name: &str, command: &Command, obfuscate: bool, block: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: Display,
    {
        let Some(provider) = &self.provider else {
            return block();
        };

        let mut guard = SpanGuard::new(self.open_span(provider, name, command, obfuscate));
        guard.begin();
        let result = match guard.tracing_span() {
            Some(inner) => inner.in_scope(block),
            None => block(),
        };
        guard.finish(&result);

        result
    }

    /// Async form of [`in_span`](Self::in_span). The future returned by
    /// `block` runs instrumented with the span.
    pub async fn in_span_async<T, E, F, Fut>(
        &self,
        name: &str,
        command: &Command,
        obfuscate: bool,
        block: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let Some(provider) = &self.provider else {
            return block().await;
        };

        let mut guard = SpanGuard::new(self.open_span(provider, name, command, obfuscate));
        guard.begin();
        let future = block();
        let inner_span = guard.tracing_span().cloned();
        let result = match inner_span {
            Some(inner) => future.instrument(inner).await,
            None => future.await,
        };
        guard.finish(&result);

        result
    }

    fn open_span(&self, provider: &P, name: &str, command: &Command, obfuscate: bool) -> P::Span {
        let mut span = provider.start_span(name);

        let statement = StatementBuilder::new(command, obfuscate)
            .with_internal_keys(&self.config.internal_keys)
            .with_max_length(self.config.max_statement_length)
            .build();
        if let Some(statement) = statement {
            span.set_attribute(DB_STATEMENT, statement);
        }

        span
    }
}

/// Ends its span exactly once, including when the block panics or the
/// future running it is dropped before completing.
struct SpanGuard<S: SpanHandle> {
    span: Option<S>,
    completed: bool,
}

impl<S: SpanHandle> SpanGuard<S> {
    fn new(span: S) -> Self {
        Self {
            span: Some(span),
            completed: false,
        }
    }

    fn begin(&mut self) {
        if let Some(span) = self.span.as_mut() {
            span.begin();
        }
    }

    fn tracing_span(&self) -> Option<&tracing::Span> {
        self.span.as_ref().and_then(|span| span.tracing_span())
    }

    fn finish<T, E: Display>(mut self, result: &Result<T, E>) {
        if let (Some(span), Err(e)) = (self.span.as_mut(), result) {
            span.set_error(&e.to_string());
        }
        self.completed = true;
    }
}

impl<S: SpanHandle> Drop for SpanGuard<S> {
    fn drop(&mut self) {
        let Some(mut span) = self.span.take() else {
            return;
        };

        if !self.completed {
            let message = if std::thread::panicking() {
                "operation panicked"
            } else {
                "operation cancelled"
            };
            span.set_error(message);
        }
        span.end();
    }
}
