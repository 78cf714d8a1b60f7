//! # Launcher and pool configuration.
//!
//! Plain structs with public fields and defaults; both deserialize with `serde` so they can
//! be embedded in an application's own config file. Durations are stored in milliseconds.
//!
//! ## Sentinel values
//! - `task_timeout_ms = 0` → no per-task deadline.
//! - `acquire_timeout_ms = 0` / `enqueue_timeout_ms = 0` → try once, never wait.
//! - capacities and worker counts of `0` are clamped to `1`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_CONCURRENT: usize = 100;
pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Settings for [`Launcher`](crate::Launcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LaunchConfig {
    /// Maximum number of tasks running at the same time.
    pub max_concurrent: usize,
    /// How long `run_async` waits for a free slot before reporting a timeout.
    pub acquire_timeout_ms: u64,
    /// Deadline applied to each task's context.
    pub task_timeout_ms: u64,
}

impl LaunchConfig {
    #[inline]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.max(1)
    }

    #[inline]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    #[inline]
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }
}

impl Default for LaunchConfig {
    /// - `max_concurrent = 100`
    /// - `acquire_timeout = 5s`
    /// - `task_timeout = 5s`
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            acquire_timeout_ms: DEFAULT_TIMEOUT_MS,
            task_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Settings for [`Pool`](crate::Pool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PoolConfig {
    /// Number of persistent workers.
    pub workers: usize,
    /// Capacity of the bounded queue between `dispatch` and the workers.
    pub queue_capacity: usize,
    /// Deadline applied to each handler invocation.
    pub task_timeout_ms: u64,
    /// How long `dispatch` waits for queue space before dropping the item.
    pub enqueue_timeout_ms: u64,
}

impl PoolConfig {
    #[inline]
    pub fn workers(&self) -> usize {
        self.workers.max(1)
    }

    #[inline]
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }

    #[inline]
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    #[inline]
    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }
}

impl Default for PoolConfig {
    /// - `workers = 10`
    /// - `queue_capacity = 100`
    /// - `task_timeout = 5s`
    /// - `enqueue_timeout = 5s`
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            task_timeout_ms: DEFAULT_TIMEOUT_MS,
            enqueue_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}
