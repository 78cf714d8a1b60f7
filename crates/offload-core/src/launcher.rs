//! # Fire-and-forget launcher
//!
//! [`Launcher::run_async`] runs each submission on its own tokio task, gated by a
//! [`SlotPool`].
//!
//! ```text
//! run_async(ctx, f)
//!   ├─► isolate ctx (propagation rules) + stamp TaskId
//!   ├─► acquire slot (acquire_timeout)
//!   │     ├─ timeout/closed ─► report Admission, return (f never runs)
//!   │     └─ caller drops the future mid-wait ─► report Abandoned
//!   └─► spawn ─► derive task ctx (task_timeout)
//!                ├─► run f under the panic guard
//!                ├─► report Task / Expired / Panic
//!                └─► drop: cancel task ctx, release slot
//! ```
//!
//! `run_async` returns as soon as the task is spawned. There is no handle to await the
//! task or read its result.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, info};

use crate::{
    config::LaunchConfig,
    context::{Context, Isolator, Propagate, TaskId},
    error::{AdmissionError, ShutdownError},
    report::{ErrorReporter, NoopReporter, Pending, deliver},
    runner::run_once,
    slot::SlotPool,
};

/// Concurrency-limited background launcher.
///
/// Cheap to clone; clones share the slot pool, the reporter and the lifecycle.
#[derive(Clone)]
pub struct Launcher {
    slots: SlotPool,
    isolator: Arc<Isolator>,
    reporter: Arc<dyn ErrorReporter>,
    acquire_timeout: Duration,
    task_timeout: Duration,
    closing: CancellationToken,
}

impl Launcher {
    /// Starts a builder with the given configuration.
    pub fn builder(config: LaunchConfig) -> LauncherBuilder {
        LauncherBuilder::new(config)
    }

    /// Launcher with no propagation rules and a no-op reporter.
    pub fn new(config: LaunchConfig) -> Self {
        Self::builder(config).build()
    }

    /// Runs `f` in the background.
    ///
    /// Waits only for admission (at most the acquire timeout). `f` receives an isolated
    /// context carrying the propagated values and the per-task deadline.
    ///
    /// Dropping the returned future before it completes gives up the submission; `f` does
    /// not run and [`AdmissionError::Abandoned`] is reported.
    pub async fn run_async<F, Fut>(&self, ctx: &Context, f: F)
    where
        F: FnOnce(Context) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let id = TaskId::new();
        let pending = Pending::new(
            self.reporter.as_ref(),
            self.isolator.isolate(ctx).with_task(id),
        );

        if self.closing.is_cancelled() {
            debug!(task = %id, "launcher is shutting down; task refused");
            let ctx = pending.disarm();
            deliver(self.reporter.as_ref(), &ctx, AdmissionError::Closed.into());
            return;
        }

        let slot = match self.slots.acquire(self.acquire_timeout).await {
            Ok(slot) => slot,
            Err(err) => {
                debug!(task = %id, error = err.as_label(), "task not admitted");
                let ctx = pending.disarm();
                deliver(self.reporter.as_ref(), &ctx, err.into());
                return;
            }
        };
        let ctx = pending.disarm();

        let reporter = Arc::clone(&self.reporter);
        let timeout = self.task_timeout;
        let span = debug_span!("task", id = %id);

        tokio::spawn(
            async move {
                let _slot = slot;
                let task_ctx = ctx.with_timeout(timeout);
                let _cancel = task_ctx.cancel_on_drop();

                let body_ctx = task_ctx.clone();
                run_once(&task_ctx, reporter.as_ref(), async move { f(body_ctx).await }).await;
            }
            .instrument(span),
        );
    }

    /// Number of tasks currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.slots.in_use()
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Stops admitting new tasks and waits up to `grace` for running ones to finish.
    ///
    /// Submissions made after this call report [`AdmissionError::Closed`]. Running tasks are
    /// never aborted; if they outlive `grace` they keep running and are counted in the error.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), ShutdownError> {
        self.closing.cancel();
        info!(in_flight = self.in_flight(), "launcher shutting down");
        self.slots.drain(grace).await
    }

    pub fn is_closed(&self) -> bool {
        self.closing.is_cancelled()
    }
}

impl Default for Launcher {
    fn default() -> Self {
        Self::new(LaunchConfig::default())
    }
}

/// Builder for [`Launcher`].
pub struct LauncherBuilder {
    config: LaunchConfig,
    isolator: Isolator,
    reporter: Arc<dyn ErrorReporter>,
}

impl LauncherBuilder {
    pub fn new(config: LaunchConfig) -> Self {
        Self {
            config,
            isolator: Isolator::new(),
            reporter: Arc::new(NoopReporter),
        }
    }

    /// Sets the sink for failures and admission timeouts.
    pub fn with_reporter(mut self, reporter: impl ErrorReporter) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Appends a propagation rule; rules run in the order they are added.
    pub fn with_propagator(mut self, rule: impl Propagate) -> Self {
        self.isolator.register(Arc::new(rule));
        self
    }

    pub fn build(self) -> Launcher {
        Launcher {
            slots: SlotPool::new(self.config.max_concurrent()),
            isolator: Arc::new(self.isolator),
            reporter: self.reporter,
            acquire_timeout: self.config.acquire_timeout(),
            task_timeout: self.config.task_timeout(),
            closing: CancellationToken::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::sync::oneshot;
    use tokio::time;

    use super::*;
    use crate::context::CopyKeys;
    use crate::error::{AsyncError, ErrorKind};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(Option<TaskId>, ErrorKind, &'static str)>>>);

    impl ErrorReporter for Recorder {
        fn report(&self, ctx: &Context, err: AsyncError) {
            self.0
                .lock()
                .unwrap()
                .push((ctx.task_id(), err.kind(), err.as_label()));
        }
    }

    impl Recorder {
        fn labels(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().iter().map(|r| r.2).collect()
        }
    }

    fn config(max: usize, acquire_ms: u64) -> LaunchConfig {
        LaunchConfig {
            max_concurrent: max,
            acquire_timeout_ms: acquire_ms,
            task_timeout_ms: 4_000,
        }
    }

    #[tokio::test]
    async fn runs_with_propagated_values_only() {
        let rec = Recorder::default();
        let launcher = Launcher::builder(LaunchConfig::default())
            .with_reporter(rec.clone())
            .with_propagator(CopyKeys::new(["someKey"]))
            .build();

        let ctx = Context::background()
            .with_value("someKey", "someValue")
            .with_value("someOtherKey", "someOtherValue");

        let (tx, rx) = oneshot::channel();
        launcher
            .run_async(&ctx, move |ctx: Context| async move {
                let seen = (
                    ctx.get("someKey").map(str::to_owned),
                    ctx.get("someOtherKey").map(str::to_owned),
                    ctx.task_id().is_some(),
                    ctx.deadline().is_some(),
                );
                let _ = tx.send(seen);
                Ok(())
            })
            .await;

        let (key, other, has_id, has_deadline) =
            time::timeout(Duration::from_millis(100), rx).await.unwrap().unwrap();
        assert_eq!(key.as_deref(), Some("someValue"));
        assert_eq!(other, None);
        assert!(has_id);
        assert!(has_deadline);
        assert!(rec.labels().is_empty());
    }

    #[tokio::test]
    async fn panic_is_reported_and_launcher_stays_usable() {
        let rec = Recorder::default();
        let launcher = Launcher::builder(LaunchConfig::default())
            .with_reporter(rec.clone())
            .build();

        launcher
            .run_async(&Context::background(), |_ctx: Context| async move {
                if true {
                    panic!("aaaa");
                }
                Ok(())
            })
            .await;

        let (tx, rx) = oneshot::channel();
        launcher
            .run_async(&Context::background(), move |_ctx: Context| async move {
                let _ = tx.send(());
                Ok(())
            })
            .await;
        time::timeout(Duration::from_millis(100), rx).await.unwrap().unwrap();

        time::timeout(Duration::from_millis(100), async {
            while launcher.in_flight() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(rec.labels(), vec!["task_panicked"]);
    }

    #[tokio::test(start_paused = true)]
    async fn saturated_launcher_reports_slot_timeout() {
        let rec = Recorder::default();
        let launcher = Launcher::builder(config(1, 10))
            .with_reporter(rec.clone())
            .build();

        let (done_tx, done_rx) = oneshot::channel();
        launcher
            .run_async(&Context::background(), move |_ctx: Context| async move {
                time::sleep(Duration::from_secs(5)).await;
                let _ = done_tx.send(());
                Ok(())
            })
            .await;

        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        launcher
            .run_async(&Context::background(), move |_ctx: Context| async move {
                *flag.lock().unwrap() = true;
                Ok(())
            })
            .await;

        assert_eq!(rec.labels(), vec!["admission_slot_timeout"]);
        assert!(rec.0.lock().unwrap()[0].0.is_some());

        done_rx.await.unwrap();
        assert!(!*ran.lock().unwrap());
    }

    #[tokio::test]
    async fn shutdown_waits_and_refuses_new_work() {
        let rec = Recorder::default();
        let launcher = Launcher::builder(config(4, 10))
            .with_reporter(rec.clone())
            .build();

        let finished = Arc::new(Mutex::new(0));
        for _ in 0..3 {
            let finished = Arc::clone(&finished);
            launcher
                .run_async(&Context::background(), move |_ctx: Context| async move {
                    time::sleep(Duration::from_millis(20)).await;
                    *finished.lock().unwrap() += 1;
                    Ok(())
                })
                .await;
        }

        launcher.shutdown(Duration::from_secs(1)).await.unwrap();
        assert_eq!(*finished.lock().unwrap(), 3);
        assert!(launcher.is_closed());

        launcher
            .run_async(&Context::background(), |_ctx: Context| async move { Ok(()) })
            .await;
        assert_eq!(rec.labels(), vec!["admission_closed"]);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_submission_is_reported() {
        let rec = Recorder::default();
        let launcher = Launcher::builder(config(1, 5_000))
            .with_reporter(rec.clone())
            .build();

        launcher
            .run_async(&Context::background(), |_ctx: Context| async move {
                time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;

        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        let waited = time::timeout(
            Duration::from_millis(50),
            launcher.run_async(&Context::background(), move |_ctx: Context| async move {
                *flag.lock().unwrap() = true;
                Ok(())
            }),
        )
        .await;
        assert!(waited.is_err());

        assert_eq!(rec.labels(), vec!["admission_abandoned"]);
        assert!(rec.0.lock().unwrap()[0].0.is_some());
        assert_eq!(launcher.in_flight(), 1);

        launcher.shutdown(Duration::from_secs(20)).await.unwrap();
        assert!(!*ran.lock().unwrap());
        assert_eq!(rec.labels(), vec!["admission_abandoned"]);
    }
}
