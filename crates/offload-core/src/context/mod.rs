//! # Task context
//!
//! [`Context`] is what a caller hands to [`Launcher::run_async`](crate::Launcher::run_async)
//! or [`Pool::dispatch`](crate::Pool::dispatch), and what a handler receives.
//! It carries:
//! - a key-value set ([`Values`]),
//! - a cancellation signal ([`CancellationToken`]),
//! - an optional deadline,
//! - the [`TaskId`] of the task that owns it (set on admission).
//!
//! Contexts are cheap to clone; clones share values and the cancellation signal.
//!
//! ## Deadlines
//! A deadline is a signal only. [`Context::cancelled`] resolves when it elapses and
//! [`Context::err`] reports [`ContextError::DeadlineExceeded`], but a handler that never
//! looks at its context keeps running.

mod propagate;
mod values;

pub use propagate::{Carrier, CopyKeys, Isolator, Propagate};
pub use values::Values;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

use crate::error::ContextError;

/// Identifier stamped on every admitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a new random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    timeout: Duration,
}

/// Values, cancellation and deadline for one unit of work.
#[derive(Debug, Clone)]
pub struct Context {
    values: Arc<Values>,
    token: CancellationToken,
    deadline: Option<Deadline>,
    task: Option<TaskId>,
}

impl Context {
    /// Empty context: no values, never cancelled unless [`cancel`](Self::cancel) is called, no deadline.
    pub fn background() -> Self {
        Self::from_values(Values::new())
    }

    pub(crate) fn from_values(values: Values) -> Self {
        Self {
            values: Arc::new(values),
            token: CancellationToken::new(),
            deadline: None,
            task: None,
        }
    }

    /// Returns a copy carrying `key = value` in addition to the existing values.
    ///
    /// The copy shares the cancellation signal and deadline of `self`.
    pub fn with_value<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Arc::make_mut(&mut self.values).push(key, value);
        self
    }

    /// Value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key)
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Id of the task owning this context; `None` for contexts built by callers.
    pub fn task_id(&self) -> Option<TaskId> {
        self.task
    }

    pub(crate) fn with_task(mut self, id: TaskId) -> Self {
        self.task = Some(id);
        self
    }

    /// Derives a child context that is done when `self` is cancelled or after `timeout`.
    ///
    /// The child keeps the earlier of the two deadlines. `Duration::ZERO` adds no deadline.
    /// Cancelling the child never cancels `self`.
    pub fn with_timeout(&self, timeout: Duration) -> Context {
        let mut deadline = self.deadline;
        if !timeout.is_zero() {
            let at = Instant::now() + timeout;
            if deadline.is_none_or(|d| at < d.at) {
                deadline = Some(Deadline { at, timeout });
            }
        }
        Context {
            values: Arc::clone(&self.values),
            token: self.token.child_token(),
            deadline,
            task: self.task,
        }
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns a guard that cancels this context when dropped.
    pub(crate) fn cancel_on_drop(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }

    /// `true` once the context is cancelled or its deadline has elapsed.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.is_expired()
    }

    /// Resolves when the context is cancelled or its deadline elapses.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(d) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = time::sleep_until(d.at) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        self.expired_timeout()
            .map(|timeout| ContextError::DeadlineExceeded { timeout })
    }

    /// Instant at which the context expires.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline.map(|d| d.at)
    }

    /// Time left before the deadline; `None` without a deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.at.saturating_duration_since(Instant::now()))
    }

    /// Underlying token, for APIs that take a [`CancellationToken`] directly.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }

    fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d.at)
    }

    /// Timeout of the elapsed deadline, if it has elapsed.
    pub(crate) fn expired_timeout(&self) -> Option<Duration> {
        self.deadline
            .filter(|d| Instant::now() >= d.at)
            .map(|d| d.timeout)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_is_live_and_empty() {
        let ctx = Context::background();
        assert!(!ctx.is_cancelled());
        assert!(ctx.err().is_none());
        assert!(ctx.deadline().is_none());
        assert!(ctx.values().is_empty());
        assert!(ctx.task_id().is_none());
    }

    #[test]
    fn values_are_shared_by_clones_but_copied_on_write() {
        let base = Context::background().with_value("trace", "t-1");
        let extended = base.clone().with_value("user", "u-1");

        assert_eq!(base.get("trace"), Some("t-1"));
        assert_eq!(base.get("user"), None);
        assert_eq!(extended.get("user"), Some("u-1"));
    }

    #[test]
    fn cancelling_parent_cancels_child_but_not_reverse() {
        let parent = Context::background();
        let child = parent.with_timeout(Duration::ZERO);
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());

        let child = parent.with_timeout(Duration::ZERO);
        parent.cancel();
        assert!(child.is_cancelled());
        assert_eq!(child.err(), Some(ContextError::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_elapses() {
        let ctx = Context::background().with_timeout(Duration::from_secs(5));
        assert!(ctx.err().is_none());
        assert!(ctx.remaining().is_some());

        ctx.cancelled().await;

        assert!(ctx.is_cancelled());
        assert_eq!(
            ctx.err(),
            Some(ContextError::DeadlineExceeded {
                timeout: Duration::from_secs(5)
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn child_keeps_earlier_deadline() {
        let parent = Context::background().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(10));
        assert_eq!(child.deadline(), parent.deadline());

        let tighter = parent.with_timeout(Duration::from_millis(100));
        assert!(tighter.deadline() < parent.deadline());
    }

    #[tokio::test]
    async fn drop_guard_cancels() {
        let ctx = Context::background();
        {
            let _guard = ctx.cancel_on_drop();
        }
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn task_ids_are_unique() {
        assert_ne!(TaskId::new(), TaskId::new());
    }
}
