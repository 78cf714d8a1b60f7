//! # Worker pool
//!
//! A bounded FIFO queue consumed by a fixed set of persistent workers.
//!
//! ```text
//! dispatch(ctx, item)
//!     ├─► isolate ctx + stamp TaskId
//!     └─► send_timeout(enqueue_timeout) ──► [ bounded queue (queue_capacity) ]
//!           ├─ timeout ─► report QueueTimeout, item dropped        │
//!           └─ future dropped ─► report Abandoned, item dropped   │
//!                                        ┌─────────────┬───────────┘
//!                                        ▼             ▼
//!                                     worker 1 ...  worker N
//!                                        └─► derive task ctx (task_timeout)
//!                                        └─► handler under the panic guard
//!                                        └─► report Task / Expired / Panic
//! ```
//!
//! ## Rules
//! - Items are taken in successful-enqueue order; completion order across workers is not
//!   defined.
//! - The queue is the only throttle: a producer waits at most `enqueue_timeout`, then the
//!   item is dropped and reported. Dropped items are never retried.
//! - Handler failures never stop a worker.
//!
//! ## Shutdown
//! [`Pool::shutdown`] closes the queue, lets the workers finish every item already queued,
//! and waits for them up to a grace period. Dropping a [`Pool`] without calling it closes
//! the queue the same way but does not wait.

mod handler;
mod worker;

pub use handler::Handler;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{
    Mutex,
    mpsc::{
        self,
        error::{SendTimeoutError, TrySendError},
    },
};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info};

use crate::{
    config::PoolConfig,
    context::{Context, Isolator, Propagate, TaskId},
    error::{AdmissionError, ShutdownError},
    report::{ErrorReporter, NoopReporter, Pending, deliver},
};
use worker::Worker;

/// Queued item together with its isolated context.
struct Job<T> {
    id: TaskId,
    ctx: Context,
    item: T,
}

/// Fixed-size worker pool over a bounded queue.
pub struct Pool<T> {
    tx: mpsc::Sender<Job<T>>,
    isolator: Isolator,
    reporter: Arc<dyn ErrorReporter>,
    enqueue_timeout: Duration,
    workers: Vec<JoinHandle<()>>,
}

impl<T> Pool<T>
where
    T: Send + 'static,
{
    /// Starts a builder; workers are spawned by [`PoolBuilder::build`].
    pub fn builder(config: PoolConfig, handler: impl Handler<T>) -> PoolBuilder<T> {
        PoolBuilder::new(config, handler)
    }

    /// Queues `item` for the workers.
    ///
    /// Waits at most the enqueue timeout for queue space; on timeout the item is dropped and
    /// [`AdmissionError::QueueTimeout`] is reported. Dropping the returned future while it
    /// waits drops the item too and reports [`AdmissionError::Abandoned`].
    pub async fn dispatch(&self, ctx: &Context, item: T) {
        let id = TaskId::new();
        let ctx = self.isolator.isolate(ctx).with_task(id);
        let pending = Pending::new(self.reporter.as_ref(), ctx.clone());
        let job = Job { id, ctx, item };

        let res = if self.enqueue_timeout.is_zero() {
            self.tx.try_send(job).map_err(|e| match e {
                TrySendError::Full(_) => AdmissionError::QueueTimeout {
                    waited: Duration::ZERO,
                },
                TrySendError::Closed(_) => AdmissionError::Closed,
            })
        } else {
            self.tx
                .send_timeout(job, self.enqueue_timeout)
                .await
                .map_err(|e| match e {
                    SendTimeoutError::Timeout(_) => AdmissionError::QueueTimeout {
                        waited: self.enqueue_timeout,
                    },
                    SendTimeoutError::Closed(_) => AdmissionError::Closed,
                })
        };

        let ctx = pending.disarm();
        if let Err(err) = res {
            debug!(task = %id, error = err.as_label(), "item dropped at dispatch");
            deliver(self.reporter.as_ref(), &ctx, err.into());
        }
    }

    /// Items waiting in the queue (not yet taken by a worker).
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Closes the queue, drains it, and waits up to `grace` for the workers to exit.
    ///
    /// Every item queued before this call is still handled. Workers still busy after
    /// `grace` are left running and counted in the error.
    pub async fn shutdown(self, grace: Duration) -> Result<(), ShutdownError> {
        let Pool {
            tx, mut workers, ..
        } = self;
        info!(
            queued = tx.max_capacity() - tx.capacity(),
            "pool shutting down"
        );
        drop(tx);

        if time::timeout(grace, join_all(workers.iter_mut())).await.is_ok() {
            debug!("all pool workers stopped");
            return Ok(());
        }
        let running = workers.iter().filter(|h| !h.is_finished()).count();
        Err(ShutdownError::GraceExceeded { grace, running })
    }
}

/// Builder for [`Pool`].
pub struct PoolBuilder<T> {
    config: PoolConfig,
    handler: Arc<dyn Handler<T>>,
    isolator: Isolator,
    reporter: Arc<dyn ErrorReporter>,
}

impl<T> PoolBuilder<T>
where
    T: Send + 'static,
{
    pub fn new(config: PoolConfig, handler: impl Handler<T>) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
            isolator: Isolator::new(),
            reporter: Arc::new(NoopReporter),
        }
    }

    /// Sets the sink for handler failures and dispatch timeouts.
    pub fn with_reporter(mut self, reporter: impl ErrorReporter) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Appends a propagation rule; rules run in the order they are added.
    pub fn with_propagator(mut self, rule: impl Propagate) -> Self {
        self.isolator.register(Arc::new(rule));
        self
    }

    /// Creates the queue and spawns the workers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Pool<T> {
        let (tx, rx) = mpsc::channel(self.config.queue_capacity());
        let queue = Arc::new(Mutex::new(rx));

        let workers = (0..self.config.workers())
            .map(|id| {
                Worker {
                    id,
                    queue: Arc::clone(&queue),
                    handler: Arc::clone(&self.handler),
                    reporter: Arc::clone(&self.reporter),
                    task_timeout: self.config.task_timeout(),
                }
                .spawn()
            })
            .collect::<Vec<_>>();

        debug!(
            workers = workers.len(),
            queue_capacity = self.config.queue_capacity(),
            "pool started"
        );
        Pool {
            tx,
            isolator: self.isolator,
            reporter: self.reporter,
            enqueue_timeout: self.config.enqueue_timeout(),
            workers,
        }
    }
}
