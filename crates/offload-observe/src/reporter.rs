//! [`ErrorReporter`] backed by `tracing`.

use offload_core::{AsyncError, Context, ErrorKind, ErrorReporter};
use tracing::{error, warn};

/// Human readable summary for each error class.
#[inline]
pub fn message_for(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Admission => "task refused before it ran",
        ErrorKind::Task => "task failed",
        ErrorKind::Panic => "task panicked",
        ErrorKind::Expired => "task failed after its deadline",
    }
}

/// Logs every reported error.
///
/// Admission failures are logged at `warn` (back-pressure, the caller's load is the
/// problem); task failures, expirations and panics at `error`. Each event carries the task
/// id, the error label and the error chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, ctx: &Context, err: AsyncError) {
        let kind = err.kind();
        let msg = message_for(kind);
        let task = ctx
            .task_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let label = err.as_label();

        match kind {
            ErrorKind::Admission => warn!(task = %task, error = label, reason = %err, "{msg}"),
            ErrorKind::Task | ErrorKind::Expired => {
                error!(task = %task, error = label, reason = %error_chain(&err), "{msg}")
            }
            ErrorKind::Panic => error!(task = %task, error = label, reason = %err, "{msg}"),
        }
    }
}

/// Display of `err` followed by its sources, `: `-separated.
fn error_chain(err: &AsyncError) -> String {
    let mut out = err.to_string();
    let mut next = std::error::Error::source(err);
    while let Some(e) = next {
        let s = e.to_string();
        if !out.ends_with(&s) {
            out.push_str(": ");
            out.push_str(&s);
        }
        next = e.source();
    }
    out
}
