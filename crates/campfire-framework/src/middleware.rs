//! Middleware: functions from handler to handler.
//!
//! A [`Middleware`] receives the next [`BoxedHandler`] in the chain and
//! returns a new one that may run code before or after it, or not call it at
//! all. Composition order is fixed: router-global middleware wrap route
//! middleware, and within each list the first registered is the outermost.
//!
//! Three ways to build one:
//!
//! - [`Middleware::new`] for a raw `BoxedHandler -> BoxedHandler` function,
//! - [`Middleware::from_fn`] for an async closure that receives [`Next`],
//! - [`Middleware::from_layer`] for any `tower::Layer`.
//!
//! # Example
//!
//! ```rust,ignore
//! let logging = Middleware::from_fn(|ctx, next| async move {
//!     info!(text = %ctx.plain_text(), "Handling");
//!     next.run(ctx).await
//! });
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tower::util::BoxCloneSyncService;
use tower::{Layer, Service, ServiceExt};
use tracing::{debug, warn};

use campfire_core::{BoxError, Event, EventBus, MessageContext};

use crate::handler::{BoxedHandler, HandlerResult, HandlerService};

/// Metadata key holding the command name of the running command route.
pub const COMMAND_KEY: &str = "command";
/// Metadata key holding the text following the command token.
pub const ARGS_KEY: &str = "args";
/// Metadata key set after a command route completed successfully.
pub const EXECUTED_COMMAND_KEY: &str = "executed_command";

/// Reply sent when [`auth`] rejects the sender.
pub const PERMISSION_DENIED_REPLY: &str = "你没有权限执行该命令";

type WrapFn = dyn Fn(BoxedHandler) -> BoxedHandler + Send + Sync;

/// A handler-to-handler transformer.
#[derive(Clone)]
pub struct Middleware {
    wrap: Arc<WrapFn>,
}

impl Middleware {
    /// Creates a middleware from a wrapping function.
    pub fn new<F>(wrap: F) -> Self
    where
        F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
    {
        Self {
            wrap: Arc::new(wrap),
        }
    }

    /// Creates a middleware from an async function of the context and the
    /// rest of the chain.
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Arc<MessageContext>, Next) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::new(move |inner: BoxedHandler| {
            let f = f.clone();
            BoxCloneSyncService::new(HandlerService::new(move |ctx: Arc<MessageContext>| {
                f(ctx, Next::new(inner.clone()))
            }))
        })
    }

    /// Adapts a tower [`Layer`] into a middleware.
    pub fn from_layer<L>(layer: L) -> Self
    where
        L: Layer<BoxedHandler> + Send + Sync + 'static,
        L::Service: Service<Arc<MessageContext>, Response = (), Error = BoxError>
            + Clone
            + Send
            + Sync
            + 'static,
        <L::Service as Service<Arc<MessageContext>>>::Future: Send + 'static,
    {
        Self::new(move |inner| BoxCloneSyncService::new(layer.layer(inner)))
    }

    /// Wraps `inner` with this middleware.
    pub fn apply(&self, inner: BoxedHandler) -> BoxedHandler {
        (self.wrap)(inner)
    }
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Middleware").finish_non_exhaustive()
    }
}

/// The remainder of a middleware chain.
pub struct Next {
    inner: BoxedHandler,
}

impl Next {
    fn new(inner: BoxedHandler) -> Self {
        Self { inner }
    }

    /// Runs the rest of the chain.
    pub async fn run(self, ctx: Arc<MessageContext>) -> HandlerResult {
        self.inner.oneshot(ctx).await
    }
}

/// Wraps `handler` so that `chain[0]` is outermost.
pub fn compose<'a>(
    handler: BoxedHandler,
    chain: impl DoubleEndedIterator<Item = &'a Middleware>,
) -> BoxedHandler {
    chain.rev().fold(handler, |inner, mw| mw.apply(inner))
}

// ─── Built-in middleware ─────────────────────────────────────────────────────

/// Lets the chain run only for senders in `allowed_ids`.
///
/// Other senders get [`PERMISSION_DENIED_REPLY`]; the chain is not run and
/// the route reports success. An empty list denies everyone.
pub fn auth(allowed_ids: impl IntoIterator<Item = i64>) -> Middleware {
    let allowed: Arc<HashSet<i64>> = Arc::new(allowed_ids.into_iter().collect());
    Middleware::from_fn(move |ctx: Arc<MessageContext>, next: Next| {
        let allowed = Arc::clone(&allowed);
        async move {
            let actor = ctx.message().actor_id();
            if allowed.contains(&actor) {
                return next.run(ctx).await;
            }
            warn!(user_id = actor, "Permission denied");
            ctx.reply_text(PERMISSION_DENIED_REPLY).await?;
            Ok(())
        }
    })
}

/// Drops group messages from groups not in `group_ids`.
///
/// Private messages and requests pass through. An empty list allows every
/// group.
pub fn group_allowlist(group_ids: impl IntoIterator<Item = i64>) -> Middleware {
    let groups: Arc<HashSet<i64>> = Arc::new(group_ids.into_iter().collect());
    Middleware::from_fn(move |ctx: Arc<MessageContext>, next: Next| {
        let groups = Arc::clone(&groups);
        async move {
            if let Some(group) = ctx.as_group()
                && !groups.is_empty()
                && !groups.contains(&group.group_id)
            {
                debug!(group_id = group.group_id, "Group not allowed, skipping");
                return Ok(());
            }
            next.run(ctx).await
        }
    })
}

/// Tags command executions.
///
/// Before the chain runs, stores the command name under [`COMMAND_KEY`] and
/// the argument text under [`ARGS_KEY`]. After the chain succeeds, stores the
/// name under [`EXECUTED_COMMAND_KEY`] and publishes
/// [`Event::CommandExecuted`].
pub fn track_command(
    bus: Arc<EventBus>,
    token: impl Into<String>,
    name: impl Into<String>,
) -> Middleware {
    let token: Arc<str> = token.into().into();
    let name: Arc<str> = name.into().into();
    Middleware::from_fn(move |ctx: Arc<MessageContext>, next: Next| {
        let bus = Arc::clone(&bus);
        let token = Arc::clone(&token);
        let name = Arc::clone(&name);
        async move {
            let text = ctx.plain_text();
            let args = text
                .trim_start()
                .strip_prefix(&*token)
                .unwrap_or_default()
                .trim()
                .to_string();
            ctx.set(COMMAND_KEY, name.to_string());
            ctx.set(ARGS_KEY, args);

            next.run(Arc::clone(&ctx)).await?;

            ctx.set(EXECUTED_COMMAND_KEY, name.to_string());
            bus.publish(&Event::CommandExecuted(ctx));
            Ok(())
        }
    })
}
