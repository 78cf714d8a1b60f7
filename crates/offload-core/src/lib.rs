//! # offload-core
//!
//! Bounded-concurrency background execution for async services.
//!
//! Two front ends share one set of building blocks:
//! - [`Launcher::run_async`]: fire-and-forget, one tokio task per submission, at most
//!   `max_concurrent` running at once.
//! - [`Pool::dispatch`]: a bounded FIFO queue consumed by a fixed set of workers running one
//!   [`Handler`].
//!
//! Neither returns results to the caller. Failures, panics and admission timeouts go to an
//! [`ErrorReporter`] together with the task's context.
//!
//! ## Architecture
//! ```text
//!   caller ctx ──► Isolator (propagation rules) ──► fresh Context + TaskId
//!                                                        │
//!          ┌─────────────────────────────────────────────┴───────────────┐
//!          ▼                                                             ▼
//!   Launcher::run_async                                          Pool::dispatch
//!     SlotPool::acquire(acquire_timeout)                      send_timeout(enqueue_timeout)
//!          │                                                             │
//!          ▼                                                             ▼
//!     tokio::spawn                                            bounded queue ──► workers
//!          │                                                             │
//!          └──────────────► with_timeout(task_timeout) ◄─────────────────┘
//!                                    │
//!                                    ▼
//!                        panic guard ──► ErrorReporter
//! ```
//!
//! ## Context isolation
//! A task never sees the caller's context directly. It gets a new [`Context`] holding only
//! the values copied by the registered [`Propagate`] rules, with its own cancellation and
//! deadline. Cancelling the caller after submission does not affect the task.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use offload_core::prelude::*;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let launcher = Launcher::builder(LaunchConfig::default())
//!         .with_propagator(CopyKeys::new(["request_id"]))
//!         .with_reporter(|ctx: &Context, err: AsyncError| {
//!             eprintln!("{:?}: {err}", ctx.task_id());
//!         })
//!         .build();
//!
//!     let ctx = Context::background().with_value("request_id", "r-42");
//!     launcher
//!         .run_async(&ctx, |ctx: Context| async move {
//!             assert_eq!(ctx.get("request_id"), Some("r-42"));
//!             Ok(())
//!         })
//!         .await;
//!
//!     launcher.shutdown(Duration::from_secs(1)).await.unwrap();
//! }
//! ```

mod config;
mod context;
mod error;
mod launcher;
mod pool;
mod report;
mod runner;
mod slot;

pub mod guard;

pub use config::{
    DEFAULT_MAX_CONCURRENT, DEFAULT_QUEUE_CAPACITY, DEFAULT_TIMEOUT_MS, DEFAULT_WORKERS,
    LaunchConfig, PoolConfig,
};
pub use context::{Carrier, Context, CopyKeys, Isolator, Propagate, TaskId, Values};
pub use error::{
    AdmissionError, AsyncError, ContextError, ErrorKind, PanicError, ShutdownError,
};
pub use launcher::{Launcher, LauncherBuilder};
pub use pool::{Handler, Pool, PoolBuilder};
pub use report::{ErrorReporter, NoopReporter};
pub use slot::{Slot, SlotPool};

pub mod prelude {
    pub use crate::{
        AsyncError, Context, CopyKeys, ErrorKind, ErrorReporter, Handler, LaunchConfig,
        Launcher, Pool, PoolConfig, Propagate,
    };
}
