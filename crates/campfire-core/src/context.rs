//! Per-dispatch context.
//!
//! A [`MessageContext`] is created once per inbound [`ChatMessage`] at the
//! transport boundary and shared as `Arc<MessageContext>` by every matcher,
//! middleware and handler the router runs for that message. Besides the
//! immutable message it carries:
//!
//! - a metadata bag for passing values between middleware and handlers,
//! - an advisory [`CancellationToken`] (the work context),
//! - the transport used by [`reply`](MessageContext::reply).
//!
//! # Example
//!
//! ```rust,ignore
//! async fn handle(ctx: Arc<MessageContext>) -> HandlerResult {
//!     ctx.set("command", "echo".to_string());
//!     ctx.reply_text(format!("你说了: {}", ctx.plain_text())).await?;
//!     Ok(())
//! }
//! ```

use std::any::Any;
use std::collections::HashMap;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::error::TransportResult;
use crate::message::{ChatMessage, FriendRequest, GroupMessage, PrivateMessage, Segment};
use crate::transport::BoxedTransport;

type Metadata = HashMap<String, Box<dyn Any + Send + Sync>>;

/// Envelope around one inbound unit of work.
pub struct MessageContext {
    message: ChatMessage,
    transport: BoxedTransport,
    metadata: Mutex<Metadata>,
    cancellation: CancellationToken,
}

impl MessageContext {
    /// Creates a context with an empty metadata bag and a fresh root token.
    pub fn new(message: impl Into<ChatMessage>, transport: BoxedTransport) -> Self {
        Self {
            message: message.into(),
            transport,
            metadata: Mutex::new(HashMap::new()),
            cancellation: CancellationToken::new(),
        }
    }

    /// Replaces the work context with a child of `parent`.
    ///
    /// Cancelling `parent` is then observable through
    /// [`cancellation`](Self::cancellation), while cancelling the child does
    /// not affect the parent.
    pub fn with_cancellation(mut self, parent: &CancellationToken) -> Self {
        self.cancellation = parent.child_token();
        self
    }

    /// Returns the work context.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns `true` once the work context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    // ─── Message access ──────────────────────────────────────────────────────

    /// Returns the wrapped message.
    pub fn message(&self) -> &ChatMessage {
        &self.message
    }

    /// Returns the private message, if that is what this context wraps.
    pub fn as_private(&self) -> Option<&PrivateMessage> {
        match &self.message {
            ChatMessage::Private(msg) => Some(msg),
            _ => None,
        }
    }

    /// Returns the group message, if that is what this context wraps.
    pub fn as_group(&self) -> Option<&GroupMessage> {
        match &self.message {
            ChatMessage::Group(msg) => Some(msg),
            _ => None,
        }
    }

    /// Returns the friend request, if that is what this context wraps.
    pub fn as_friend_request(&self) -> Option<&FriendRequest> {
        match &self.message {
            ChatMessage::FriendRequest(req) => Some(req),
            _ => None,
        }
    }

    /// Returns the plain text of the message (empty for requests).
    pub fn plain_text(&self) -> String {
        self.message.plain_text()
    }

    /// Returns the transport this context replies through.
    pub fn transport(&self) -> &BoxedTransport {
        &self.transport
    }

    // ─── Metadata ────────────────────────────────────────────────────────────

    /// Stores a value under `key`, replacing any previous value.
    pub fn set<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        self.metadata.lock().insert(key.into(), Box::new(value));
    }

    /// Returns a clone of the value under `key` if it exists and has type `T`.
    pub fn get<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        self.metadata
            .lock()
            .get(key)
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    /// Returns the string stored under `key`, or an empty string.
    pub fn get_string(&self, key: &str) -> String {
        self.get::<String>(key).unwrap_or_default()
    }

    /// Returns `true` if any value is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.metadata.lock().contains_key(key)
    }

    /// Removes and returns the value under `key` if it has type `T`.
    ///
    /// A value of another type is left in place.
    pub fn take<T: 'static>(&self, key: &str) -> Option<T> {
        let mut metadata = self.metadata.lock();
        if !metadata.get(key).is_some_and(|v| v.is::<T>()) {
            return None;
        }
        metadata
            .remove(key)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    // ─── Replies ─────────────────────────────────────────────────────────────

    /// Sends `segments` back to the conversation this message came from.
    ///
    /// Friend requests have no conversation; replying to one does nothing.
    pub async fn reply(&self, segments: Vec<Segment>) -> TransportResult<()> {
        match &self.message {
            ChatMessage::Private(msg) => self.transport.send_private(msg.sender.id, segments).await,
            ChatMessage::Group(msg) => self.transport.send_group(msg.group_id, segments).await,
            ChatMessage::FriendRequest(req) => {
                trace!(user_id = req.user_id, "Reply to a friend request ignored");
                Ok(())
            }
        }
    }

    /// Sends a plain text reply.
    pub async fn reply_text(&self, text: impl Into<String>) -> TransportResult<()> {
        self.reply(vec![Segment::text(text)]).await
    }
}

impl std::fmt::Debug for MessageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageContext")
            .field("message", &self.message)
            .field("metadata_keys", &self.metadata.lock().len())
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}
