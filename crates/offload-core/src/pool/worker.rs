use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, debug_span};

use super::{Job, handler::Handler};
use crate::{report::ErrorReporter, runner::run_once};

/// Shared receiving end of the pool queue.
pub(super) type Queue<T> = Arc<Mutex<mpsc::Receiver<Job<T>>>>;

/// One persistent consumer of the pool queue.
///
/// Loops until the queue is closed *and* empty; a failing or panicking handler never
/// ends the loop.
pub(super) struct Worker<T> {
    pub id: usize,
    pub queue: Queue<T>,
    pub handler: Arc<dyn Handler<T>>,
    pub reporter: Arc<dyn ErrorReporter>,
    pub task_timeout: Duration,
}

impl<T> Worker<T>
where
    T: Send + 'static,
{
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        debug!(worker = self.id, "worker started");
        while let Some(job) = self.next().await {
            self.handle(job).await;
        }
        debug!(worker = self.id, "queue closed and drained; worker stopped");
    }

    /// Next job in FIFO order; the lock is held only while waiting.
    async fn next(&self) -> Option<Job<T>> {
        self.queue.lock().await.recv().await
    }

    async fn handle(&self, job: Job<T>) {
        let Job { id, ctx, item } = job;
        let span = debug_span!("task", id = %id, worker = self.id);

        async {
            let task_ctx = ctx.with_timeout(self.task_timeout);
            let _cancel = task_ctx.cancel_on_drop();

            let handler = Arc::clone(&self.handler);
            let body_ctx = task_ctx.clone();
            run_once(&task_ctx, self.reporter.as_ref(), async move {
                handler.handle(body_ctx, item).await
            })
            .await;
        }
        .instrument(span)
        .await
    }
}
