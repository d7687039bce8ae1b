//! Dispatch entry point and route registration helpers.
//!
//! [`LogicManager`] owns the [`Router`] and the [`EventBus`]. For every
//! inbound unit it:
//!
//! 1. wraps the message in a [`MessageContext`] whose work context is a child
//!    of the manager's shutdown token,
//! 2. publishes [`Event::MessageReceived`] (this is what prompt waiters
//!    observe),
//! 3. hands the context to [`Router::handle`].
//!
//! Adapters call it through the [`Dispatcher`] trait, which runs each unit on
//! its own task via [`spawn_dispatch`](LogicManager::spawn_dispatch).
//!
//! # Example
//!
//! ```rust,ignore
//! let manager = LogicManager::new();
//! manager.handle_command("/", "ping", ping, []);
//! manager.handle_command("/", "保存", save, [auth(admins)]);
//! manager.handle_group_message(forward_to_queue);
//! ```

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, error, info};

use campfire_core::{BoxedTransport, ChatMessage, Dispatcher, Event, EventBus, MessageContext};

use crate::handler::HandlerResult;
use crate::matcher;
use crate::middleware::{Middleware, track_command};
use crate::prompt::Prompt;
use crate::route::Route;
use crate::router::Router;

/// Owner of the router and event bus; entry point for inbound units.
///
/// Cloning is cheap and clones share all state.
#[derive(Clone)]
pub struct LogicManager {
    router: Arc<Router>,
    bus: Arc<EventBus>,
    shutdown: CancellationToken,
}

impl Default for LogicManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LogicManager {
    pub fn new() -> Self {
        Self::with_parts(Arc::new(Router::new()), Arc::new(EventBus::new()))
    }

    /// Builds a manager around an existing router and bus.
    pub fn with_parts(router: Arc<Router>, bus: Arc<EventBus>) -> Self {
        Self {
            router,
            bus,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Returns a prompt bound to this manager's bus.
    pub fn prompt(&self) -> Prompt {
        Prompt::new(Arc::clone(&self.bus))
    }

    /// Cancels the work context of every in-flight and future dispatch.
    pub fn shutdown(&self) {
        info!("Logic manager shutting down");
        self.shutdown.cancel();
    }

    // ─── Registration ────────────────────────────────────────────────────────

    /// Registers a command route for `prefix` + `name`.
    ///
    /// `middlewares` run outside the command tagging, so a command rejected
    /// by e.g. [`auth`](crate::middleware::auth) is never reported as
    /// executed.
    pub fn handle_command<F, Fut>(
        &self,
        prefix: &str,
        name: &str,
        handler: F,
        middlewares: impl IntoIterator<Item = Middleware>,
    ) where
        F: Fn(Arc<MessageContext>) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let token = format!("{prefix}{name}");
        let mut route = Route::new(format!("command:{name}"), handler)
            .pattern(token.clone())
            .match_with(matcher::command(prefix, name));
        for middleware in middlewares {
            route = route.middleware(middleware);
        }
        route = route.middleware(track_command(Arc::clone(&self.bus), token, name));
        self.router.add_route(route);
    }

    /// Registers a handler for every group message.
    pub fn handle_group_message<F, Fut>(&self, handler: F)
    where
        F: Fn(Arc<MessageContext>) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.router
            .add_route(Route::new("group_message", handler).match_with(matcher::is_group()));
    }

    /// Registers a handler for every private message.
    pub fn handle_private_message<F, Fut>(&self, handler: F)
    where
        F: Fn(Arc<MessageContext>) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.router
            .add_route(Route::new("private_message", handler).match_with(matcher::is_private()));
    }

    /// Registers a handler for friend requests.
    pub fn handle_friend_request<F, Fut>(&self, handler: F)
    where
        F: Fn(Arc<MessageContext>) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.router.add_route(
            Route::new("friend_request", handler).match_with(matcher::is_friend_request()),
        );
    }

    // ─── Dispatch ────────────────────────────────────────────────────────────

    /// Processes one inbound unit to completion on the current task.
    ///
    /// Returns the number of routes that matched.
    pub async fn dispatch(&self, message: ChatMessage, transport: BoxedTransport) -> usize {
        let span = debug_span!(
            "dispatch",
            kind = message.kind_name(),
            actor = message.actor_id()
        );

        async move {
            let ctx = Arc::new(
                MessageContext::new(message, transport).with_cancellation(&self.shutdown),
            );
            self.bus.publish(&Event::MessageReceived(Arc::clone(&ctx)));
            let matched = self.router.handle(ctx).await;
            debug!(matched, "Dispatch finished");
            matched
        }
        .instrument(span)
        .await
    }

    /// Processes one inbound unit on a new task.
    ///
    /// A panicking handler is logged and does not take the task's caller
    /// down with it.
    pub fn spawn_dispatch(
        &self,
        message: ChatMessage,
        transport: BoxedTransport,
    ) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let kind = message.kind_name();
            let result = AssertUnwindSafe(manager.dispatch(message, transport))
                .catch_unwind()
                .await;
            if let Err(panic) = result {
                error!(kind, panic = %panic_message(&*panic), "Handler panicked during dispatch");
            }
        })
    }
}

#[async_trait]
impl Dispatcher for LogicManager {
    async fn dispatch(&self, message: ChatMessage, transport: BoxedTransport) {
        self.spawn_dispatch(message, transport);
    }
}

impl std::fmt::Debug for LogicManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicManager")
            .field("router", &self.router)
            .field("bus", &self.bus)
            .field("shut_down", &self.shutdown.is_cancelled())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
