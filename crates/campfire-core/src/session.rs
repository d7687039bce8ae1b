//! Conversation identity.

use crate::context::MessageContext;
use crate::message::ConversationKind;

/// Decides whether a message belongs to the same conversation and actor as
/// an earlier one.
///
/// Two messages match when the conversation kind, the source id (group id,
/// or peer id for private chats) and the sender id are all equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionMatcher {
    kind: ConversationKind,
    source_id: i64,
    actor_id: i64,
}

impl SessionMatcher {
    /// Creates a matcher for an explicit triple.
    pub fn new(kind: ConversationKind, source_id: i64, actor_id: i64) -> Self {
        Self {
            kind,
            source_id,
            actor_id,
        }
    }

    /// Captures the conversation of `ctx`.
    ///
    /// Returns `None` for units that are not part of a conversation
    /// (friend requests).
    pub fn from_context(ctx: &MessageContext) -> Option<Self> {
        let message = ctx.message();
        message
            .conversation()
            .map(|(kind, source_id)| Self::new(kind, source_id, message.actor_id()))
    }

    /// Returns `true` if `ctx` comes from the same conversation and actor.
    pub fn matches(&self, ctx: &MessageContext) -> bool {
        Self::from_context(ctx).is_some_and(|other| other == *self)
    }

    pub fn kind(&self) -> ConversationKind {
        self.kind
    }

    pub fn source_id(&self) -> i64 {
        self.source_id
    }

    pub fn actor_id(&self) -> i64 {
        self.actor_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportResult;
    use crate::message::{FriendRequest, GroupMessage, PrivateMessage, Segment, Sender};
    use crate::transport::ChatTransport;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NullTransport;

    #[async_trait]
    impl ChatTransport for NullTransport {
        async fn send_private(&self, _: i64, _: Vec<Segment>) -> TransportResult<()> {
            Ok(())
        }

        async fn send_group(&self, _: i64, _: Vec<Segment>) -> TransportResult<()> {
            Ok(())
        }
    }

    fn sender(id: i64) -> Sender {
        Sender {
            id,
            ..Default::default()
        }
    }

    fn group(group_id: i64, actor: i64) -> MessageContext {
        MessageContext::new(
            GroupMessage {
                group_id,
                group_name: String::new(),
                sender: sender(actor),
                segments: vec![],
            },
            Arc::new(NullTransport),
        )
    }

    fn private(actor: i64) -> MessageContext {
        MessageContext::new(
            PrivateMessage {
                sender: sender(actor),
                segments: vec![],
            },
            Arc::new(NullTransport),
        )
    }

    #[test]
    fn same_group_same_actor_matches() {
        let sm = SessionMatcher::from_context(&group(100, 1)).unwrap();
        assert_eq!(sm, SessionMatcher::new(ConversationKind::Group, 100, 1));
        assert!(sm.matches(&group(100, 1)));
    }

    #[test]
    fn different_actor_group_or_kind_does_not_match() {
        let sm = SessionMatcher::from_context(&group(100, 1)).unwrap();
        assert!(!sm.matches(&group(100, 2)));
        assert!(!sm.matches(&group(200, 1)));
        // A private chat with the same peer is a different conversation.
        assert!(!sm.matches(&private(1)));
    }

    #[test]
    fn private_source_is_the_peer() {
        let sm = SessionMatcher::from_context(&private(5)).unwrap();
        assert_eq!(sm.source_id(), 5);
        assert_eq!(sm.actor_id(), 5);
        assert!(sm.matches(&private(5)));
        assert!(!sm.matches(&private(6)));
    }

    #[test]
    fn friend_request_has_no_session() {
        let ctx = MessageContext::new(
            FriendRequest {
                user_id: 5,
                comment: String::new(),
                flag: String::new(),
            },
            Arc::new(NullTransport),
        );
        assert!(SessionMatcher::from_context(&ctx).is_none());
        assert!(!SessionMatcher::new(ConversationKind::Private, 5, 5).matches(&ctx));
    }
}
