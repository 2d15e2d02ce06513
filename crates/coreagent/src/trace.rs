use coreagent_protocol::{Id, IdError};

use crate::reporter::Reporter;

/// Where request and span ids come from; [`Id::generate`] by default
pub type IdSource = fn() -> Result<Id, IdError>;

/// An in-flight request, bounded by `StartRequest` and `FinishRequest`.
///
/// `FinishRequest` is sent by [`RequestTrace::finish`] or on drop, exactly
/// once. Reporting is best-effort: send failures are logged, never returned,
/// so tracing cannot fail the request being traced.
pub struct RequestTrace<'a, R: Reporter + ?Sized> {
    reporter: &'a R,
    ids: IdSource,
    request_id: Id,
}

impl<'a, R: Reporter + ?Sized> RequestTrace<'a, R> {
    /// Generate a request id and send `StartRequest`
    pub fn start(reporter: &'a R) -> Result<Self, IdError> {
        Self::start_with(reporter, Id::generate)
    }

    /// Like [`RequestTrace::start`], drawing this request's ids from `ids`.
    ///
    /// If no request id can be made, nothing is sent.
    pub fn start_with(reporter: &'a R, ids: IdSource) -> Result<Self, IdError> {
        let request_id = ids()?;
        if let Err(e) = reporter.start_request(&request_id) {
            tracing::warn!("failed to report request start {}: {}", request_id, e);
        }
        Ok(Self {
            reporter,
            ids,
            request_id,
        })
    }

    pub fn request_id(&self) -> &Id {
        &self.request_id
    }

    /// Open a span under this request.
    ///
    /// The span borrows the trace, so the request cannot finish while the
    /// span is still open.
    pub fn span(&self, operation: &str) -> Result<SpanGuard<'_, 'a, R>, IdError> {
        let span_id = (self.ids)()?;
        if let Err(e) = self
            .reporter
            .start_span(&self.request_id, &span_id, operation)
        {
            tracing::warn!("failed to report span start {} ({}): {}", span_id, operation, e);
        }
        Ok(SpanGuard {
            trace: self,
            span_id,
        })
    }

    pub fn finish(self) {
        // FinishRequest goes out from Drop
    }
}

impl<R: Reporter + ?Sized> Drop for RequestTrace<'_, R> {
    fn drop(&mut self) {
        if let Err(e) = self.reporter.finish_request(&self.request_id) {
            tracing::warn!("failed to report request finish {}: {}", self.request_id, e);
        }
    }
}

/// An open span; sends `StopSpan` when stopped or dropped
pub struct SpanGuard<'t, 'a, R: Reporter + ?Sized> {
    trace: &'t RequestTrace<'a, R>,
    span_id: Id,
}

impl<R: Reporter + ?Sized> SpanGuard<'_, '_, R> {
    pub fn span_id(&self) -> &Id {
        &self.span_id
    }

    pub fn stop(self) {
        // StopSpan goes out from Drop
    }
}

impl<R: Reporter + ?Sized> Drop for SpanGuard<'_, '_, R> {
    fn drop(&mut self) {
        let trace = self.trace;
        if let Err(e) = trace.reporter.stop_span(&trace.request_id, &self.span_id) {
            tracing::warn!("failed to report span stop {}: {}", self.span_id, e);
        }
    }
}
