//! # Campfire Framework
//!
//! Higher-level building blocks on top of `campfire-core`:
//!
//! - [`Route`] / [`Router`]: ordered routes with matchers and middleware
//! - [`Middleware`]: handler-to-handler transformers, tower layers included
//! - [`Prompt`]: confirm/cancel/timeout waits for destructive commands
//! - [`LogicManager`]: the dispatch entry point adapters talk to
//!
//! Handlers are plain async functions:
//!
//! ```rust,ignore
//! async fn ping(ctx: Arc<MessageContext>) -> HandlerResult {
//!     ctx.reply_text("pong").await?;
//!     Ok(())
//! }
//!
//! let manager = LogicManager::new();
//! manager.handle_command("/", "ping", ping, []);
//! ```

pub mod handler;
pub mod manager;
pub mod matcher;
pub mod middleware;
pub mod prompt;
pub mod route;
pub mod router;

pub use handler::{BoxFuture, BoxedHandler, HandlerResult, HandlerService, into_handler};
pub use manager::LogicManager;
pub use matcher::MatchFn;
pub use middleware::{Middleware, Next, auth, group_allowlist, track_command};
pub use prompt::{DEFAULT_PROMPT_TIMEOUT, Prompt, PromptOutcome, format_duration};
pub use route::Route;
pub use router::{ErrorHandler, Router};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use campfire_core::{
        ChatMessage, ChatTransport, FriendRequest, GroupMessage, MessageContext, PrivateMessage,
        Segment, Sender, TransportResult, extract_plain_text,
    };

    #[derive(Default)]
    pub struct RecordingTransport {
        pub sent: Mutex<Vec<(i64, String)>>,
    }

    impl RecordingTransport {
        pub fn texts(&self) -> Vec<String> {
            self.sent.lock().iter().map(|(_, text)| text.clone()).collect()
        }
    }

    #[async_trait]
    impl ChatTransport for RecordingTransport {
        async fn send_private(&self, user_id: i64, segments: Vec<Segment>) -> TransportResult<()> {
            self.sent.lock().push((user_id, extract_plain_text(&segments)));
            Ok(())
        }

        async fn send_group(&self, group_id: i64, segments: Vec<Segment>) -> TransportResult<()> {
            self.sent.lock().push((group_id, extract_plain_text(&segments)));
            Ok(())
        }
    }

    fn sender(id: i64) -> Sender {
        Sender {
            id,
            name: format!("user{id}"),
            nickname: None,
        }
    }

    pub fn private_message(user_id: i64, text: &str) -> ChatMessage {
        PrivateMessage {
            sender: sender(user_id),
            segments: vec![Segment::text(text)],
        }
        .into()
    }

    pub fn group_message(group_id: i64, user_id: i64, text: &str) -> ChatMessage {
        GroupMessage {
            group_id,
            group_name: format!("group{group_id}"),
            sender: sender(user_id),
            segments: vec![Segment::text(text)],
        }
        .into()
    }

    pub fn private_ctx(t: &Arc<RecordingTransport>, user_id: i64, text: &str) -> Arc<MessageContext> {
        Arc::new(MessageContext::new(private_message(user_id, text), t.clone()))
    }

    pub fn group_ctx(
        t: &Arc<RecordingTransport>,
        group_id: i64,
        user_id: i64,
        text: &str,
    ) -> Arc<MessageContext> {
        Arc::new(MessageContext::new(group_message(group_id, user_id, text), t.clone()))
    }

    pub fn friend_request_ctx(t: &Arc<RecordingTransport>, user_id: i64) -> Arc<MessageContext> {
        let request = FriendRequest {
            user_id,
            comment: String::new(),
            flag: format!("flag-{user_id}"),
        };
        Arc::new(MessageContext::new(request, t.clone()))
    }
}
