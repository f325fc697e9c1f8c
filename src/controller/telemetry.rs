//! Span capability injected into the lifecycle executor.
//!
//! Each lifecycle operation runs inside the span returned by [`Tracer::span`],
//! so tracing stays out of the operation bodies.

use tracing::Span;

/// Opens a span for one lifecycle operation on one resource.
pub trait Tracer: Send + Sync {
    fn span(&self, operation: &'static str, resource: &str) -> Span;
}

/// Default tracer emitting `tracing` spans at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct SpanTracer;

impl Tracer for SpanTracer {
    fn span(&self, operation: &'static str, resource: &str) -> Span {
        tracing::info_span!("external", operation, resource = %resource)
    }
}

/// Tracer that records nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn span(&self, _operation: &'static str, _resource: &str) -> Span {
        Span::none()
    }
}
