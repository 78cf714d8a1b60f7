use std::future::Future;

use async_trait::async_trait;

use crate::context::Context;

/// Consumer of the items dispatched to a [`Pool`](crate::Pool).
///
/// Called once per item, on one of the pool workers, with the item's isolated context
/// (propagated values plus the per-task deadline). Errors and panics are reported, never
/// returned to the dispatcher.
///
/// Closures `Fn(Context, T) -> impl Future<Output = anyhow::Result<()>>` implement this trait.
#[async_trait]
pub trait Handler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle(&self, ctx: Context, item: T) -> anyhow::Result<()>;
}

#[async_trait]
impl<T, F, Fut> Handler<T> for F
where
    T: Send + 'static,
    F: Fn(Context, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, ctx: Context, item: T) -> anyhow::Result<()> {
        (self)(ctx, item).await
    }
}
