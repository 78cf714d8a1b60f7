//! Error types produced by the launcher, the worker pool and task contexts.
//!
//! Every failure of a submitted task ends up as exactly one [`AsyncError`] delivered to the
//! configured [`ErrorReporter`](crate::ErrorReporter). Nothing is ever returned to the
//! submitting caller.
//!
//! - [`AsyncError`]: what the reporter receives.
//! - [`AdmissionError`]: a task was refused before it started.
//! - [`PanicError`]: a panic payload converted into an error value.
//! - [`ContextError`]: why a [`Context`](crate::Context) is done; handlers may return it with `?`.
//! - [`ShutdownError`]: returned by the lifecycle `shutdown` calls.

use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;

/// Coarse classification of an [`AsyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The task was never admitted (slot pool or queue saturated, or closed).
    Admission,
    /// The handler returned an error before its deadline.
    Task,
    /// The handler panicked.
    Panic,
    /// The handler returned an error after its deadline elapsed.
    Expired,
}

/// # Errors delivered to the error reporter.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AsyncError {
    /// Task was refused at admission and never ran.
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    /// Handler returned an error.
    #[error("async task failed: {0}")]
    Task(#[source] anyhow::Error),

    /// Handler panicked; the panic was contained on its execution unit.
    #[error("async task panicked: {0}")]
    Panic(#[source] PanicError),

    /// Handler returned an error after the per-task deadline had already elapsed.
    #[error("async task failed after its {timeout:?} deadline: {source}")]
    Expired {
        /// Per-task timeout that elapsed.
        timeout: Duration,
        /// Error returned by the handler.
        #[source]
        source: anyhow::Error,
    },
}

impl AsyncError {
    /// Returns the taxonomy class of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AsyncError::Admission(_) => ErrorKind::Admission,
            AsyncError::Task(_) => ErrorKind::Task,
            AsyncError::Panic(_) => ErrorKind::Panic,
            AsyncError::Expired { .. } => ErrorKind::Expired,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use offload_core::{AdmissionError, AsyncError};
    ///
    /// let err = AsyncError::from(AdmissionError::SlotTimeout { waited: Duration::from_millis(10) });
    /// assert_eq!(err.as_label(), "admission_slot_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            AsyncError::Admission(e) => e.as_label(),
            AsyncError::Task(_) => "task_failed",
            AsyncError::Panic(_) => "task_panicked",
            AsyncError::Expired { .. } => "task_expired",
        }
    }

    /// Returns `true` for refusals caused by a saturated slot pool or queue.
    pub fn is_admission_timeout(&self) -> bool {
        matches!(self, AsyncError::Admission(e) if e.is_timeout())
    }
}

/// # Refusals at the admission point.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    /// Every slot stayed busy for the whole acquire timeout.
    #[error("async timeout while waiting for a free slot after {waited:?}")]
    SlotTimeout {
        /// How long the submission waited.
        waited: Duration,
    },

    /// The pool queue stayed full for the whole enqueue timeout; the item was dropped.
    #[error("pool queue is full, timeout waiting for dispatch after {waited:?}")]
    QueueTimeout {
        /// How long the submission waited.
        waited: Duration,
    },

    /// Admission is closed because shutdown has started.
    #[error("admission closed (shutting down)")]
    Closed,

    /// The submitting future was dropped while it waited for a slot or queue space.
    #[error("submission abandoned while waiting for admission")]
    Abandoned,
}

impl AdmissionError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AdmissionError::SlotTimeout { .. } => "admission_slot_timeout",
            AdmissionError::QueueTimeout { .. } => "admission_queue_timeout",
            AdmissionError::Closed => "admission_closed",
            AdmissionError::Abandoned => "admission_abandoned",
        }
    }

    /// `true` for [`SlotTimeout`](Self::SlotTimeout) and [`QueueTimeout`](Self::QueueTimeout).
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            AdmissionError::SlotTimeout { .. } | AdmissionError::QueueTimeout { .. }
        )
    }
}

/// A panic payload converted into an error.
///
/// Payloads that already are errors (`anyhow::Error`, `Box<dyn Error + Send + Sync>`) are kept
/// as the [`source`](StdError::source); string payloads become the message.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct PanicError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl PanicError {
    pub(crate) fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn from_error(err: Box<dyn StdError + Send + Sync + 'static>) -> Self {
        Self {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Panic message (or the display of the error payload).
    pub fn message(&self) -> &str {
        &self.message
    }

    /// `true` if the payload was an error value rather than a plain message.
    pub fn is_error_payload(&self) -> bool {
        self.source.is_some()
    }
}

/// Why a [`Context`](crate::Context) is done.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// The context (or one of its parents) was cancelled.
    #[error("context canceled")]
    Canceled,

    /// The context deadline elapsed.
    #[error("context deadline exceeded ({timeout:?})")]
    DeadlineExceeded {
        /// Timeout the deadline was derived from.
        timeout: Duration,
    },
}

/// Error returned by the `shutdown` lifecycle calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShutdownError {
    /// Some tasks were still running when the grace period ran out.
    #[error("shutdown grace {grace:?} exceeded; {running} task(s) still running")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Tasks (launcher) or workers (pool) still running.
        running: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_labels() {
        let slot = AsyncError::from(AdmissionError::SlotTimeout {
            waited: Duration::from_millis(5),
        });
        assert_eq!(slot.kind(), ErrorKind::Admission);
        assert!(slot.is_admission_timeout());

        let closed = AsyncError::from(AdmissionError::Closed);
        assert_eq!(closed.kind(), ErrorKind::Admission);
        assert_eq!(closed.as_label(), "admission_closed");
        assert!(!closed.is_admission_timeout());

        let abandoned = AsyncError::from(AdmissionError::Abandoned);
        assert_eq!(abandoned.kind(), ErrorKind::Admission);
        assert_eq!(abandoned.as_label(), "admission_abandoned");
        assert!(!abandoned.is_admission_timeout());

        let task = AsyncError::Task(anyhow::anyhow!("boom"));
        assert_eq!(task.kind(), ErrorKind::Task);
        assert_eq!(task.to_string(), "async task failed: boom");

        let expired = AsyncError::Expired {
            timeout: Duration::from_secs(1),
            source: anyhow::anyhow!("late"),
        };
        assert_eq!(expired.kind(), ErrorKind::Expired);
        assert_eq!(expired.as_label(), "task_expired");
    }

    #[test]
    fn slot_and_queue_timeouts_read_differently() {
        let slot = AdmissionError::SlotTimeout {
            waited: Duration::from_millis(10),
        };
        let queue = AdmissionError::QueueTimeout {
            waited: Duration::from_millis(10),
        };
        assert_ne!(slot.to_string(), queue.to_string());
        assert_ne!(slot.as_label(), queue.as_label());
    }

    #[test]
    fn panic_error_keeps_error_payload_as_source() {
        let io = std::io::Error::other("disk gone");
        let err = PanicError::from_error(Box::new(io));
        assert_eq!(err.message(), "disk gone");
        assert!(err.is_error_payload());
        assert!(err.source().is_some());

        let plain = PanicError::from_message("aaaa");
        assert!(!plain.is_error_payload());
        assert!(plain.source().is_none());
    }
}
