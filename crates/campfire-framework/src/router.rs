//! The router: ordered routes plus global middleware.
//!
//! For every message, the router walks its routes in registration order.
//! Each route whose matchers all accept the context runs with the chain
//! `global middleware ∘ route middleware ∘ handler`. One route failing does
//! not stop the rest; its error goes to the router's error handler.
//!
//! ```text
//! handle(ctx)
//!   ├── route "ping"   matchers ✗  skip
//!   ├── route "echo"   matchers ✓  G1(G2(R1(handler)))
//!   └── route "audit"  matchers ✓  G1(G2(handler))  → Err → error handler
//! ```

use std::sync::Arc;

use parking_lot::RwLock;
use tower::ServiceExt;
use tracing::{debug, error, trace};

use campfire_core::{BoxError, MessageContext};

use crate::middleware::Middleware;
use crate::route::Route;

/// Sink for route errors: `(route name, error, context)`.
pub type ErrorHandler = Arc<dyn Fn(&str, &BoxError, &MessageContext) + Send + Sync>;

#[derive(Default)]
struct RouterInner {
    routes: Vec<Arc<Route>>,
    middlewares: Vec<Middleware>,
}

/// Ordered collection of routes and global middleware.
pub struct Router {
    inner: RwLock<RouterInner>,
    error_handler: RwLock<ErrorHandler>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Creates an empty router whose error handler logs at error level.
    pub fn new() -> Self {
        let error_handler: ErrorHandler = Arc::new(log_route_error);
        Self {
            inner: RwLock::new(RouterInner::default()),
            error_handler: RwLock::new(error_handler),
        }
    }

    /// Appends a global middleware.
    pub fn use_middleware(&self, middleware: Middleware) {
        self.inner.write().middlewares.push(middleware);
    }

    /// Appends a route.
    pub fn add_route(&self, route: Route) {
        debug!(
            route = route.name(),
            pattern = route.get_pattern().unwrap_or(""),
            "Route registered"
        );
        self.inner.write().routes.push(Arc::new(route));
    }

    /// Replaces the error handler.
    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(&str, &BoxError, &MessageContext) + Send + Sync + 'static,
    {
        let handler: ErrorHandler = Arc::new(handler);
        *self.error_handler.write() = handler;
    }

    /// Returns a snapshot of the registered routes.
    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.inner.read().routes.clone()
    }

    pub fn route_count(&self) -> usize {
        self.inner.read().routes.len()
    }

    pub fn middleware_count(&self) -> usize {
        self.inner.read().middlewares.len()
    }

    /// Runs every matching route for `ctx`, in registration order.
    ///
    /// The route list and global middleware are snapshotted first, so
    /// registrations made while handling take effect on the next message.
    /// Returns the number of routes that matched.
    pub async fn handle(&self, ctx: Arc<MessageContext>) -> usize {
        let (routes, middlewares) = {
            let inner = self.inner.read();
            (inner.routes.clone(), inner.middlewares.clone())
        };
        let error_handler = Arc::clone(&self.error_handler.read());

        let mut matched = 0;
        for route in &routes {
            if !route.matches(&ctx) {
                trace!(route = route.name(), "Route did not match");
                continue;
            }
            matched += 1;

            let service = route.compose(&middlewares);
            if let Err(e) = service.oneshot(Arc::clone(&ctx)).await {
                error_handler(route.name(), &e, &ctx);
            }
        }

        trace!(matched, total = routes.len(), "Routing finished");
        matched
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Router")
            .field("routes", &inner.routes.len())
            .field("middlewares", &inner.middlewares.len())
            .finish_non_exhaustive()
    }
}

fn log_route_error(route: &str, err: &BoxError, ctx: &MessageContext) {
    error!(
        route,
        kind = ctx.message().kind_name(),
        user_id = ctx.message().actor_id(),
        error = %err,
        "Route handler failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher;
    use crate::middleware::Next;
    use crate::test_support::{RecordingTransport, group_ctx, private_ctx};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_route(name: &str, hits: &Arc<AtomicUsize>) -> Route {
        let hits = Arc::clone(hits);
        Route::new(name, move |_ctx: Arc<MessageContext>| {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn runs_every_matching_route_in_order() {
        let router = Router::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for name in ["a", "b", "c"] {
            let order = Arc::clone(&order);
            router.add_route(
                Route::new(name, move |_ctx: Arc<MessageContext>| {
                    let order = Arc::clone(&order);
                    async move {
                        order.lock().push(name);
                        Ok(())
                    }
                })
                .matcher(move |_| name != "b"),
            );
        }

        let t = Arc::new(RecordingTransport::default());
        assert_eq!(router.handle(private_ctx(&t, 1, "x")).await, 2);
        assert_eq!(*order.lock(), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn failing_route_does_not_stop_the_rest() {
        let router = Router::new();
        let errors = Arc::new(Mutex::new(Vec::new()));
        {
            let errors = Arc::clone(&errors);
            router.set_error_handler(move |route, err, _ctx| {
                errors.lock().push(format!("{route}: {err}"));
            });
        }

        router.add_route(Route::new("broken", |_ctx: Arc<MessageContext>| async {
            Err::<(), BoxError>("boom".into())
        }));
        let hits = Arc::new(AtomicUsize::new(0));
        router.add_route(counting_route("after", &hits));

        let t = Arc::new(RecordingTransport::default());
        assert_eq!(router.handle(private_ctx(&t, 1, "x")).await, 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(*errors.lock(), vec!["broken: boom".to_string()]);
    }

    #[tokio::test]
    async fn global_middleware_applies_to_every_route() {
        let router = Router::new();
        let wrapped = Arc::new(AtomicUsize::new(0));
        {
            let wrapped = Arc::clone(&wrapped);
            router.use_middleware(Middleware::from_fn(move |ctx, next: Next| {
                wrapped.fetch_add(1, Ordering::SeqCst);
                next.run(ctx)
            }));
        }
        let hits = Arc::new(AtomicUsize::new(0));
        router.add_route(counting_route("one", &hits));
        router.add_route(counting_route("two", &hits).match_with(matcher::is_group()));

        let t = Arc::new(RecordingTransport::default());
        router.handle(group_ctx(&t, 10, 1, "x")).await;
        router.handle(private_ctx(&t, 1, "x")).await;

        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(wrapped.load(Ordering::SeqCst), 3);
        assert_eq!(router.middleware_count(), 1);
    }

    #[tokio::test]
    async fn routes_added_during_handling_apply_to_next_message() {
        let router = Arc::new(Router::new());
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let router_ref = Arc::downgrade(&router);
            let hits = Arc::clone(&hits);
            router.add_route(Route::new("adder", move |_ctx: Arc<MessageContext>| {
                let router_ref = router_ref.clone();
                let hits = Arc::clone(&hits);
                async move {
                    if let Some(router) = router_ref.upgrade()
                        && router.route_count() == 1
                    {
                        router.add_route(counting_route("late", &hits));
                    }
                    Ok(())
                }
            }));
        }

        let t = Arc::new(RecordingTransport::default());
        assert_eq!(router.handle(private_ctx(&t, 1, "x")).await, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(router.handle(private_ctx(&t, 1, "x")).await, 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
