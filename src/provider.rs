//! The tracing provider seam and its default `tracing` backend.

use std::time::{Duration, Instant};

use tracing::{field, Span};

/// Attribute key carrying the redacted command.
pub const DB_STATEMENT: &str = "db.statement";

/// Something that can open spans.
///
/// The tracer only ever calls these operations; context propagation and
/// parent/child nesting are the provider's business.
pub trait TracingProvider: Send + Sync {
    type Span: SpanHandle + Send;

    fn start_span(&self, name: &str) -> Self::Span;
}

/// A single open span.
pub trait SpanHandle {
    fn set_attribute(&mut self, key: &'static str, value: String);

    /// Mark the span as failed.
    fn set_error(&mut self, message: &str);

    /// Called right before the wrapped operation starts running.
    fn begin(&mut self) {}

    fn end(self);

    /// The `tracing` span to enter while the wrapped operation runs, if any.
    fn tracing_span(&self) -> Option<&Span> {
        None
    }
}

/// Provider that records spans through the `tracing` crate.
///
/// Spans follow the OpenTelemetry database conventions so that a
/// `tracing-opentelemetry` layer exports them as client spans.
#[derive(Debug, Clone)]
pub struct TracingBackend {
    slow_command_threshold: Duration,
}

impl TracingBackend {
    pub fn new(slow_command_threshold: Duration) -> Self {
        Self {
            slow_command_threshold,
        }
    }
}

impl Default for TracingBackend {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl TracingProvider for TracingBackend {
    type Span = BackendSpan;

    fn start_span(&self, name: &str) -> BackendSpan {
        let span = tracing::info_span!(
            "db.command",
            otel.name = %name,
            otel.kind = "client",
            db.system = "mongodb",
            db.statement = field::Empty,
            db.duration_ms = field::Empty,
            otel.status_code = field::Empty,
            error.message = field::Empty,
            slow_command = field::Empty,
        );

        BackendSpan {
            span,
            start: Instant::now(),
            failed: false,
            slow_command_threshold: self.slow_command_threshold,
        }
    }
}

/// Span handed out by [`TracingBackend`].
#[derive(Debug)]
pub struct BackendSpan {
    span: Span,
    start: Instant,
    failed: bool,
    slow_command_threshold: Duration,
}

impl SpanHandle for BackendSpan {
    fn set_attribute(&mut self, key: &'static str, value: String) {
        self.span.record(key, value.as_str());
    }

    // Duration covers the operation only, not statement building.
    fn begin(&mut self) {
        self.start = Instant::now();
    }

    fn set_error(&mut self, message: &str) {
        self.failed = true;
        self.span.record("error.message", message);
        tracing::error!(
            parent: &self.span,
            error = %message,
            "Database command failed"
        );
    }

    fn end(self) {
        let elapsed = self.start.elapsed();
        let duration_ms = elapsed.as_millis() as i64;
        self.span.record("db.duration_ms", duration_ms);

        if elapsed > self.slow_command_threshold {
            self.span.record("slow_command", true);
            let threshold_ms = self.slow_command_threshold.as_millis() as i64;
            tracing::warn!(
                parent: &self.span,
                duration_ms = duration_ms,
                threshold_ms = threshold_ms,
                "Slow command detected"
            );
        }

        let status = if self.failed { "ERROR" } else { "OK" };
        self.span.record("otel.status_code", status);
        // The span closes once its last handle drops.
    }

    fn tracing_span(&self) -> Option<&Span> {
        Some(&self.span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fmt;
    use std::sync::{Arc, Mutex};

    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id, Record};
    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Collects every field value recorded on any span.
    #[derive(Clone, Default)]
    struct FieldCapture {
        fields: Arc<Mutex<HashMap<String, String>>>,
    }

    impl FieldCapture {
        fn get(&self, name: &str) -> Option<String> {
            self.fields.lock().unwrap().get(name).cloned()
        }
    }

    impl Visit for FieldCapture {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.fields
                .lock()
                .unwrap()
                .insert(field.name().to_string(), value.to_string());
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.fields
                .lock()
                .unwrap()
                .insert(field.name().to_string(), format!("{:?}", value));
        }
    }

    impl<S: Subscriber> Layer<S> for FieldCapture {
        fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
            attrs.record(&mut self.clone());
        }

        fn on_record(&self, _id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
            values.record(&mut self.clone());
        }
    }

    fn run_captured(f: impl FnOnce()) -> FieldCapture {
        let capture = FieldCapture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        tracing::subscriber::with_default(subscriber, f);
        capture
    }

    #[test]
    fn test_backend_span_records_failure() {
        let capture = run_captured(|| {
            let backend = TracingBackend::new(Duration::ZERO);
            let mut span = backend.start_span("find shop.orders");
            assert!(span.tracing_span().is_some());
            span.set_attribute(DB_STATEMENT, r#"{"filter":{"a":"?"}}"#.to_string());
            span.begin();
            span.set_error("boom");
            span.end();
        });

        assert_eq!(capture.get("otel.name").as_deref(), Some("find shop.orders"));
        assert_eq!(capture.get("db.system").as_deref(), Some("mongodb"));
        assert_eq!(capture.get(DB_STATEMENT).as_deref(), Some(r#"{"filter":{"a":"?"}}"#));
        assert_eq!(capture.get("otel.status_code").as_deref(), Some("ERROR"));
        assert_eq!(capture.get("error.message").as_deref(), Some("boom"));
        assert_eq!(capture.get("slow_command").as_deref(), Some("true"));
        assert!(capture.get("db.duration_ms").is_some());
    }

    #[test]
    fn test_backend_span_records_success() {
        let capture = run_captured(|| {
            let backend = TracingBackend::default();
            let mut span = backend.start_span("ping");
            span.begin();
            span.end();
        });

        assert_eq!(capture.get("otel.status_code").as_deref(), Some("OK"));
        assert_eq!(capture.get("error.message"), None);
        assert_eq!(capture.get(DB_STATEMENT), None);
        assert_eq!(capture.get("slow_command"), None);
        assert!(capture.get("db.duration_ms").is_some());
    }

    #[test]
    fn test_duration_starts_at_begin() {
        let capture = run_captured(|| {
            let backend = TracingBackend::new(Duration::from_millis(50));
            let mut span = backend.start_span("find orders");
            // Time spent before the operation starts is not counted.
            std::thread::sleep(Duration::from_millis(100));
            span.begin();
            span.end();
        });

        assert_eq!(capture.get("slow_command"), None);
        assert_eq!(capture.get("otel.status_code").as_deref(), Some("OK"));
    }

    #[test]
    fn test_default_threshold() {
        let backend = TracingBackend::default();
        assert_eq!(backend.slow_command_threshold, Duration::from_millis(500));
    }
}
