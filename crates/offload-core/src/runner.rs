//! # Run one admitted task.
//!
//! Shared by the launcher and the pool workers. The caller owns the admission resource
//! (slot or worker) and the task context; this module only polls the body under the panic
//! guard and turns the outcome into at most one report.
//!
//! ```text
//! Ok(())                          → trace (warn if it finished past its deadline)
//! Err(e), deadline not elapsed    → AsyncError::Task
//! Err(e), deadline elapsed        → AsyncError::Expired
//! panic                           → AsyncError::Panic
//! ```
//!
//! The deadline is never enforced by dropping the body: a body that ignores its context
//! runs to completion and its outcome is still reported.

use std::future::Future;

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::{
    context::Context,
    error::AsyncError,
    guard,
    report::{ErrorReporter, deliver},
};

/// Polls `body` to completion and reports its failure, if any.
pub(crate) async fn run_once<Fut>(ctx: &Context, reporter: &dyn ErrorReporter, body: Fut)
where
    Fut: Future<Output = anyhow::Result<()>>,
{
    let started = Instant::now();
    trace!("task starting");

    let outcome = guard::catch(body).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(())) => match ctx.expired_timeout() {
            Some(timeout) => warn!(
                elapsed_ms,
                timeout_ms = timeout.as_millis() as u64,
                "task finished after its deadline"
            ),
            None => trace!(elapsed_ms, "task finished"),
        },
        Ok(Err(err)) => {
            let err = match ctx.expired_timeout() {
                Some(timeout) => AsyncError::Expired {
                    timeout,
                    source: err,
                },
                None => AsyncError::Task(err),
            };
            debug!(elapsed_ms, error = err.as_label(), "task failed");
            deliver(reporter, ctx, err);
        }
        Err(panic) => {
            debug!(elapsed_ms, reason = panic.message(), "task panicked");
            deliver(reporter, ctx, AsyncError::Panic(panic));
        }
    }
}
