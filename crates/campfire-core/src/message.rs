//! Chat message model.
//!
//! Every inbound unit of work is one [`ChatMessage`]: a private message, a
//! group message, or a friend request. The enum is matched exhaustively at
//! the few places that need to branch on it (reply target, text extraction,
//! conversation identity) instead of probing for concrete types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Segments
// ============================================================================

/// One element of a chat message.
///
/// Only plain text is interpreted by the core. Everything else (images,
/// mentions, faces, ...) travels as an opaque [`Segment::Raw`] payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Segment {
    /// Plain text.
    Text(String),
    /// Any non-text element, kept verbatim.
    Raw {
        /// Platform element kind, e.g. `image` or `at`.
        kind: String,
        /// Platform payload.
        data: Value,
    },
}

impl Segment {
    /// Creates a text segment.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Returns the text content if this is a text segment.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Raw { .. } => None,
        }
    }
}

/// Builds a single-element text message, the common reply shape.
pub fn text_segments(content: impl Into<String>) -> Vec<Segment> {
    vec![Segment::text(content)]
}

/// Concatenates the text segments, ignoring everything else.
pub fn extract_plain_text(segments: &[Segment]) -> String {
    segments.iter().filter_map(Segment::as_text).collect()
}

/// Renders segments for display: text verbatim, other elements as `[kind]`.
pub fn render_segments(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Raw { kind, .. } => {
                out.push('[');
                out.push_str(kind);
                out.push(']');
            }
        }
    }
    out
}

// ============================================================================
// Message variants
// ============================================================================

/// The author of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// Platform user id.
    pub id: i64,
    /// Display name (group card when present, otherwise the nickname).
    pub name: String,
    /// Account nickname.
    #[serde(default)]
    pub nickname: Option<String>,
}

/// A message received in a one-to-one chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateMessage {
    pub sender: Sender,
    pub segments: Vec<Segment>,
}

/// A message received in a group chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMessage {
    pub group_id: i64,
    #[serde(default)]
    pub group_name: String,
    pub sender: Sender,
    pub segments: Vec<Segment>,
}

/// An incoming friend request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendRequest {
    pub user_id: i64,
    #[serde(default)]
    pub comment: String,
    /// Opaque token used by the platform to answer the request.
    #[serde(default)]
    pub flag: String,
}

/// Conversation kind for messages that belong to a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    Private,
    Group,
}

/// One inbound unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatMessage {
    Private(PrivateMessage),
    Group(GroupMessage),
    FriendRequest(FriendRequest),
}

impl ChatMessage {
    /// Returns the message segments; friend requests have none.
    pub fn segments(&self) -> &[Segment] {
        match self {
            Self::Private(msg) => &msg.segments,
            Self::Group(msg) => &msg.segments,
            Self::FriendRequest(_) => &[],
        }
    }

    /// Returns the concatenated plain text of the message.
    pub fn plain_text(&self) -> String {
        extract_plain_text(self.segments())
    }

    /// Returns the id of whoever produced this unit.
    pub fn actor_id(&self) -> i64 {
        match self {
            Self::Private(msg) => msg.sender.id,
            Self::Group(msg) => msg.sender.id,
            Self::FriendRequest(req) => req.user_id,
        }
    }

    /// Returns `(kind, source id)` for messages that belong to a conversation.
    ///
    /// The source id of a private chat is the peer's id.
    pub fn conversation(&self) -> Option<(ConversationKind, i64)> {
        match self {
            Self::Private(msg) => Some((ConversationKind::Private, msg.sender.id)),
            Self::Group(msg) => Some((ConversationKind::Group, msg.group_id)),
            Self::FriendRequest(_) => None,
        }
    }

    /// Short label used in logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Private(_) => "private",
            Self::Group(_) => "group",
            Self::FriendRequest(_) => "friend_request",
        }
    }
}

impl From<PrivateMessage> for ChatMessage {
    fn from(msg: PrivateMessage) -> Self {
        Self::Private(msg)
    }
}

impl From<GroupMessage> for ChatMessage {
    fn from(msg: GroupMessage) -> Self {
        Self::Group(msg)
    }
}

impl From<FriendRequest> for ChatMessage {
    fn from(req: FriendRequest) -> Self {
        Self::FriendRequest(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn group(segments: Vec<Segment>) -> ChatMessage {
        ChatMessage::Group(GroupMessage {
            group_id: 42,
            group_name: "camp".into(),
            sender: Sender {
                id: 7,
                name: "wilson".into(),
                nickname: None,
            },
            segments,
        })
    }

    #[test]
    fn plain_text_skips_raw_segments() {
        let msg = group(vec![
            Segment::text("/ban "),
            Segment::Raw {
                kind: "image".into(),
                data: json!({"file": "a.png"}),
            },
            Segment::text("KU_1"),
        ]);
        assert_eq!(msg.plain_text(), "/ban KU_1");
        assert_eq!(render_segments(msg.segments()), "/ban [image]KU_1");
    }

    #[test]
    fn conversation_identity() {
        let msg = group(vec![]);
        assert_eq!(msg.conversation(), Some((ConversationKind::Group, 42)));
        assert_eq!(msg.actor_id(), 7);

        let req = ChatMessage::from(FriendRequest {
            user_id: 9,
            comment: String::new(),
            flag: "f".into(),
        });
        assert_eq!(req.conversation(), None);
        assert!(req.plain_text().is_empty());
    }
}
