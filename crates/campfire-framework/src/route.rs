//! Routes.
//!
//! A [`Route`] bundles a handler with its own middleware chain and a list of
//! matchers. It is configured with builder methods and frozen once it is
//! added to a [`Router`](crate::Router).
//!
//! # Example
//!
//! ```rust,ignore
//! let route = Route::new("save", save_handler)
//!     .pattern("/保存")
//!     .middleware(auth(admins))
//!     .matcher(matcher::command("/", "保存"));
//! ```

use std::future::Future;
use std::sync::Arc;

use tower::ServiceExt;
use tracing::{debug, trace};

use campfire_core::MessageContext;

use crate::handler::{BoxedHandler, HandlerResult, into_handler};
use crate::matcher::MatchFn;
use crate::middleware::{Middleware, compose};

#[derive(Clone)]
struct RouteInner {
    name: String,
    pattern: Option<String>,
    handler: BoxedHandler,
    middlewares: Vec<Middleware>,
    matchers: Vec<MatchFn>,
}

/// A handler with its own middleware and matchers.
///
/// Cloning is cheap; configuration is copy-on-write.
#[derive(Clone)]
pub struct Route {
    inner: Arc<RouteInner>,
}

impl Route {
    /// Creates a route around an async handler function.
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<MessageContext>) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::from_service(name, into_handler(handler))
    }

    /// Creates a route around an already boxed handler.
    pub fn from_service(name: impl Into<String>, handler: BoxedHandler) -> Self {
        Self {
            inner: Arc::new(RouteInner {
                name: name.into(),
                pattern: None,
                handler,
                middlewares: Vec::new(),
                matchers: Vec::new(),
            }),
        }
    }

    fn inner_mut(&mut self) -> &mut RouteInner {
        Arc::make_mut(&mut self.inner)
    }

    /// Sets a descriptive pattern, used only in logs.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.inner_mut().pattern = Some(pattern.into());
        self
    }

    /// Appends a route-level middleware.
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.inner_mut().middlewares.push(middleware);
        self
    }

    /// Appends a matcher built from a closure.
    pub fn matcher<F>(self, f: F) -> Self
    where
        F: Fn(&MessageContext) -> bool + Send + Sync + 'static,
    {
        self.match_with(Arc::new(f))
    }

    /// Appends a prebuilt matcher.
    pub fn match_with(mut self, matcher: MatchFn) -> Self {
        self.inner_mut().matchers.push(matcher);
        self
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn get_pattern(&self) -> Option<&str> {
        self.inner.pattern.as_deref()
    }

    pub fn middleware_count(&self) -> usize {
        self.inner.middlewares.len()
    }

    pub fn matcher_count(&self) -> usize {
        self.inner.matchers.len()
    }

    /// Returns `true` if every matcher accepts `ctx`.
    ///
    /// Evaluation stops at the first rejecting matcher. A route without
    /// matchers accepts everything.
    pub fn matches(&self, ctx: &MessageContext) -> bool {
        self.inner.matchers.iter().all(|m| m(ctx))
    }

    /// Builds the full chain: `global` around this route's middleware around
    /// the handler.
    pub fn compose(&self, global: &[Middleware]) -> BoxedHandler {
        let chain = global.iter().chain(self.inner.middlewares.iter());
        compose(self.inner.handler.clone(), chain)
    }

    /// Runs the route's own chain if every matcher accepts `ctx`.
    ///
    /// A rejected context is not an error.
    pub async fn execute(&self, ctx: Arc<MessageContext>) -> HandlerResult {
        self.execute_with(&[], ctx).await
    }

    /// Like [`execute`](Self::execute), with `global` wrapped around the
    /// route's own middleware.
    pub async fn execute_with(
        &self,
        global: &[Middleware],
        ctx: Arc<MessageContext>,
    ) -> HandlerResult {
        if !self.matches(&ctx) {
            trace!(route = %self.inner.name, "Route did not match, skipping");
            return Ok(());
        }
        trace!(
            route = %self.inner.name,
            pattern = self.inner.pattern.as_deref().unwrap_or(""),
            "Executing route"
        );
        let result = self.compose(global).oneshot(ctx).await;
        if result.is_ok() {
            debug!(route = %self.inner.name, "Route completed");
        }
        result
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.inner.name)
            .field("pattern", &self.inner.pattern)
            .field("middlewares", &self.inner.middlewares.len())
            .field("matchers", &self.inner.matchers.len())
            .finish()
    }
}
