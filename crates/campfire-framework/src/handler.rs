//! Handler services.
//!
//! A route's handler is an async function over `Arc<MessageContext>` that
//! returns a [`HandlerResult`]. It is wrapped in a [`HandlerService`], which
//! implements `tower::Service`, and type-erased into a [`BoxedHandler`] so
//! that middleware can be stacked on top as ordinary tower layers.
//!
//! ```text
//! async fn(Arc<MessageContext>) -> HandlerResult
//!     └── HandlerService<F>          (tower::Service)
//!         └── BoxedHandler           (BoxCloneSyncService)
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;
use tower::util::BoxCloneSyncService;

use campfire_core::{BoxError, MessageContext};

/// A boxed, pinned future that is `Send`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Result of a handler or middleware invocation.
pub type HandlerResult = Result<(), BoxError>;

/// Type-erased handler service stored by routes and produced by middleware.
pub type BoxedHandler = BoxCloneSyncService<Arc<MessageContext>, (), BoxError>;

/// A tower [`Service`] that calls an async handler function.
pub struct HandlerService<F> {
    handler: F,
}

impl<F: Clone> Clone for HandlerService<F> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
        }
    }
}

impl<F, Fut> HandlerService<F>
where
    F: Fn(Arc<MessageContext>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    /// Wraps `handler` in a service.
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F, Fut> Service<Arc<MessageContext>> for HandlerService<F>
where
    F: Fn(Arc<MessageContext>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    type Response = ();
    type Error = BoxError;
    type Future = BoxFuture<'static, HandlerResult>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, ctx: Arc<MessageContext>) -> Self::Future {
        Box::pin((self.handler)(ctx))
    }
}

/// Converts an async handler function into a [`BoxedHandler`].
pub fn into_handler<F, Fut>(handler: F) -> BoxedHandler
where
    F: Fn(Arc<MessageContext>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    BoxCloneSyncService::new(HandlerService::new(handler))
}
