//! Work function interface
//!
//! Both the scheduler and the batch executor invoke caller-supplied work
//! through this trait. What the work does (HTTP calls, model inference,
//! parsing) is opaque to the pool; it only observes the outcome.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

/// A caller-supplied unit of work
///
/// Implementations must be safe to invoke concurrently across different
/// inputs. Cancellation is cooperative: when a timeout fires the pool stops
/// waiting for the returned future, it does not interrupt work already in
/// flight behind it.
#[async_trait]
pub trait WorkFn: Send + Sync {
    async fn call(&self, input: Value) -> eyre::Result<Value>;
}

struct FnWork<F>(F);

#[async_trait]
impl<F, Fut> WorkFn for FnWork<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = eyre::Result<Value>> + Send + 'static,
{
    async fn call(&self, input: Value) -> eyre::Result<Value> {
        (self.0)(input).await
    }
}

/// Wrap an async closure as a shareable [`WorkFn`]
pub fn work_fn<F, Fut>(f: F) -> Arc<dyn WorkFn>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = eyre::Result<Value>> + Send + 'static,
{
    Arc::new(FnWork(f))
}
