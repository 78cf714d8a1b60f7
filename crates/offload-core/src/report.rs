//! # Error reporter
//!
//! Sink for every failure of a submitted task. Callers of `run_async`/`dispatch` never see
//! errors; they arrive here, out of band, on the execution unit that observed them
//! (the task itself, a pool worker, or the submitting future for admission failures).
//!
//! Reporters should return quickly. A reporter that panics is contained and logged.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, error};

use crate::{
    context::Context,
    error::{AdmissionError, AsyncError},
    guard,
};

/// Receives `(context, error)` for every failed, panicked, expired or refused task.
pub trait ErrorReporter: Send + Sync + 'static {
    fn report(&self, ctx: &Context, err: AsyncError);
}

impl<F> ErrorReporter for F
where
    F: Fn(&Context, AsyncError) + Send + Sync + 'static,
{
    fn report(&self, ctx: &Context, err: AsyncError) {
        (self)(ctx, err)
    }
}

/// Reporter that discards everything (the default).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ErrorReporter for NoopReporter {
    fn report(&self, _ctx: &Context, _err: AsyncError) {}
}

/// Hands `err` to `reporter`, containing a panic raised by the reporter itself.
pub(crate) fn deliver(reporter: &dyn ErrorReporter, ctx: &Context, err: AsyncError) {
    let label = err.as_label();
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| reporter.report(ctx, err))) {
        let panic = guard::from_payload(payload);
        error!(
            error = label,
            reason = panic.message(),
            "error reporter panicked while reporting"
        );
    }
}

/// Report owed by a submission that is waiting for admission.
///
/// Dropped while armed (the submitting future was cancelled mid-wait), it delivers
/// [`AdmissionError::Abandoned`]. [`disarm`](Self::disarm) once the task is admitted or its
/// refusal has been reported.
pub(crate) struct Pending<'a> {
    reporter: &'a dyn ErrorReporter,
    ctx: Option<Context>,
}

impl<'a> Pending<'a> {
    pub(crate) fn new(reporter: &'a dyn ErrorReporter, ctx: Context) -> Self {
        Self {
            reporter,
            ctx: Some(ctx),
        }
    }

    pub(crate) fn disarm(mut self) -> Context {
        self.ctx.take().unwrap_or_default()
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            debug!(task = ?ctx.task_id(), "submission dropped before admission");
            deliver(self.reporter, &ctx, AdmissionError::Abandoned.into());
        }
    }
}
