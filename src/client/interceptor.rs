//! Ordered interceptor chains.
//!
//! An [`InterceptorChain`] is an append-only list of slots. Registering an
//! interceptor returns an [`InterceptorHandle`] (its slot index); ejecting
//! it tombstones the slot instead of removing it, so handles never shift.
//!
//! # Folding
//!
//! [`InterceptorChain::apply`] threads a `Result<T>` through every live slot
//! in registration order, like a series of `then(fulfilled, rejected)`
//! calls:
//!
//! - `Ok(value)` goes to `on_fulfilled`
//! - `Err(error)` goes to `on_rejected`, which may return `Ok` to recover
//!
//! The slot count is read once when a fold starts, so interceptors added
//! later do not join a fold already running. Each slot is re-read right
//! before it runs, so an interceptor ejected while a fold is in progress is
//! skipped if the fold has not reached it yet.
//!
//! # Examples
//!
//! ```
//! use xhr_pipeline::client::InterceptorChain;
//!
//! # tokio_test::block_on(async {
//! let chain = InterceptorChain::<u32>::new();
//! chain.use_fn(|n| async move { Ok(n + 1) });
//! let doubled = chain.use_fn(|n| async move { Ok(n * 2) });
//! chain.use_fn(|n| async move { Ok(n + 10) });
//!
//! assert_eq!(chain.apply(Ok(1)).await.unwrap(), 14);
//! chain.eject(doubled);
//! assert_eq!(chain.apply(Ok(1)).await.unwrap(), 12);
//! # });
//! ```

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;

use crate::error::{HttpError, Result};
use crate::types::{RequestConfig, Response};

/// One stage of an interceptor chain.
#[async_trait]
pub trait Interceptor<T: Send + 'static>: Send + Sync {
    /// Transform a value coming from the previous stage.
    async fn on_fulfilled(&self, value: T) -> Result<T>;

    /// Handle an error coming from the previous stage. Returning `Ok`
    /// recovers the chain. The default passes the error on.
    async fn on_rejected(&self, error: HttpError) -> Result<T> {
        Err(error)
    }
}

type FulfilledFn<T> = Box<dyn Fn(T) -> BoxFuture<'static, Result<T>> + Send + Sync>;
type RejectedFn<T> = Box<dyn Fn(HttpError) -> BoxFuture<'static, Result<T>> + Send + Sync>;

struct FnInterceptor<T> {
    fulfilled: FulfilledFn<T>,
    rejected: Option<RejectedFn<T>>,
}

#[async_trait]
impl<T: Send + 'static> Interceptor<T> for FnInterceptor<T> {
    async fn on_fulfilled(&self, value: T) -> Result<T> {
        (self.fulfilled)(value).await
    }

    async fn on_rejected(&self, error: HttpError) -> Result<T> {
        match &self.rejected {
            Some(rejected) => rejected(error).await,
            None => Err(error),
        }
    }
}

/// Identifies a registered interceptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterceptorHandle(usize);

impl InterceptorHandle {
    /// Slot index of the interceptor.
    pub fn index(self) -> usize {
        self.0
    }
}

type Slot<T> = Option<Arc<dyn Interceptor<T>>>;

/// Ordered, shareable list of interceptors. Clones share the same slots.
pub struct InterceptorChain<T> {
    slots: Arc<RwLock<Vec<Slot<T>>>>,
}

impl<T> Clone for InterceptorChain<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<T: Send + 'static> Default for InterceptorChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> InterceptorChain<T> {
    /// Empty chain.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Append `interceptor`.
    pub fn use_interceptor<I>(&self, interceptor: I) -> InterceptorHandle
    where
        I: Interceptor<T> + 'static,
    {
        let mut slots = self.slots.write();
        slots.push(Some(Arc::new(interceptor)));
        InterceptorHandle(slots.len() - 1)
    }

    /// Append a stage that only transforms fulfilled values. Errors pass
    /// through it untouched.
    pub fn use_fn<F, Fut>(&self, fulfilled: F) -> InterceptorHandle
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.use_interceptor(FnInterceptor {
            fulfilled: Box::new(move |value| fulfilled(value).boxed()),
            rejected: None,
        })
    }

    /// Append a stage with both a fulfilled and a rejected handler.
    pub fn use_fns<F, Fut, R, RFut>(&self, fulfilled: F, rejected: R) -> InterceptorHandle
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        R: Fn(HttpError) -> RFut + Send + Sync + 'static,
        RFut: Future<Output = Result<T>> + Send + 'static,
    {
        self.use_interceptor(FnInterceptor {
            fulfilled: Box::new(move |value| fulfilled(value).boxed()),
            rejected: Some(Box::new(move |error| rejected(error).boxed())),
        })
    }

    /// Tombstone the slot behind `handle`. Returns `false` if it was
    /// already ejected or never existed.
    pub fn eject(&self, handle: InterceptorHandle) -> bool {
        let mut slots = self.slots.write();
        match slots.get_mut(handle.0) {
            Some(slot) => slot.take().is_some(),
            None => false,
        }
    }

    /// Number of slots, ejected ones included.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Whether no interceptor was ever registered.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Number of live interceptors.
    pub fn active(&self) -> usize {
        self.slots.read().iter().filter(|s| s.is_some()).count()
    }

    /// Fold `initial` through every live interceptor in order.
    pub async fn apply(&self, initial: Result<T>) -> Result<T> {
        let len = self.len();
        let mut state = initial;

        for index in 0..len {
            let slot = self.slots.read().get(index).cloned().flatten();
            let Some(interceptor) = slot else {
                tracing::trace!(index, "skipping ejected interceptor");
                continue;
            };

            state = match state {
                Ok(value) => interceptor.on_fulfilled(value).await,
                Err(error) => interceptor.on_rejected(error).await,
            };
        }

        state
    }
}

/// The request and response chains owned by a client.
#[derive(Clone, Default)]
pub struct Interceptors {
    /// Applied to the merged request config before it is sent.
    pub request: InterceptorChain<RequestConfig>,
    /// Applied to the response, or the error, after the transport settles.
    pub response: InterceptorChain<Response>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Notify;

    fn push(chain: &InterceptorChain<Vec<&'static str>>, name: &'static str) -> InterceptorHandle {
        chain.use_fn(move |mut seen| async move {
            seen.push(name);
            Ok(seen)
        })
    }

    #[tokio::test]
    async fn test_runs_in_registration_order() {
        let chain = InterceptorChain::new();
        push(&chain, "A");
        push(&chain, "B");
        push(&chain, "C");
        assert_eq!(chain.apply(Ok(Vec::new())).await.unwrap(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_ejected_slot_is_skipped() {
        let chain = InterceptorChain::new();
        push(&chain, "A");
        let b = push(&chain, "B");
        push(&chain, "C");

        assert!(chain.eject(b));
        assert!(!chain.eject(b));
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.active(), 2);
        assert_eq!(chain.apply(Ok(Vec::new())).await.unwrap(), vec!["A", "C"]);

        let d = push(&chain, "D");
        assert_eq!(d.index(), 3);
        assert_eq!(chain.apply(Ok(Vec::new())).await.unwrap(), vec!["A", "C", "D"]);
    }

    #[tokio::test]
    async fn test_eject_during_inflight_fold() {
        let chain = InterceptorChain::new();
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        {
            let entered = Arc::clone(&entered);
            let release = Arc::clone(&release);
            chain.use_fn(move |mut seen: Vec<&'static str>| {
                let entered = Arc::clone(&entered);
                let release = Arc::clone(&release);
                async move {
                    entered.notify_one();
                    release.notified().await;
                    seen.push("A");
                    Ok(seen)
                }
            });
        }
        let b = push(&chain, "B");
        push(&chain, "C");

        let running = tokio::spawn({
            let chain = chain.clone();
            async move { chain.apply(Ok(Vec::new())).await }
        });

        entered.notified().await;
        assert!(chain.eject(b));
        push(&chain, "late");
        release.notify_one();

        assert_eq!(running.await.unwrap().unwrap(), vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_rejection_recovers_from_last_value() {
        let chain = InterceptorChain::<String>::new();
        chain.use_fn(|s| async move { Ok(format!("{s}-a")) });
        chain.use_fn(|_| async move { Err(HttpError::interceptor("boom")) });
        chain.use_fn(|s| async move { Ok(format!("{s}-skipped")) });
        chain.use_fns(
            |s| async move { Ok(format!("{s}-unreached")) },
            |e| async move { Ok(format!("recovered({e})")) },
        );
        chain.use_fn(|s| async move { Ok(format!("{s}-c")) });

        let out = chain.apply(Ok("start".to_string())).await.unwrap();
        assert_eq!(out, "recovered(interceptor rejected: boom)-c");
    }

    #[tokio::test]
    async fn test_initial_error_reaches_rejected_handler() {
        let chain = InterceptorChain::<u32>::new();
        chain.use_fn(|n| async move { Ok(n + 1) });
        let out = chain.apply(Err(HttpError::Aborted)).await;
        assert!(matches!(out, Err(HttpError::Aborted)));

        chain.use_fns(|n| async move { Ok(n) }, |_| async move { Ok(0) });
        assert_eq!(chain.apply(Err(HttpError::Aborted)).await.unwrap(), 0);
    }

    struct Tag(&'static str);

    #[async_trait]
    impl Interceptor<String> for Tag {
        async fn on_fulfilled(&self, value: String) -> Result<String> {
            Ok(format!("{value}{}", self.0))
        }
    }

    #[test]
    fn test_trait_interceptor() {
        let chain = InterceptorChain::new();
        chain.use_interceptor(Tag("!"));
        chain.use_interceptor(Tag("?"));
        let out = tokio_test::block_on(chain.apply(Ok("hi".to_string()))).unwrap();
        assert_eq!(out, "hi!?");
    }
}
