//! Inbound event posts.
//!
//! The adapter looks at `post_type` (and `message_type` / `request_type`)
//! and only deserializes what it turns into a [`ChatMessage`]:
//!
//! | `post_type` | sub-kind            | Result                          |
//! |-------------|---------------------|---------------------------------|
//! | `message`   | `private`           | [`ChatMessage::Private`]        |
//! | `message`   | `group`             | [`ChatMessage::Group`]          |
//! | `request`   | `friend`            | [`ChatMessage::FriendRequest`]  |
//! | anything else (`notice`, `meta_event`, `message_sent`, ...) | ignored |

use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

use campfire_core::{ChatMessage, FriendRequest, GroupMessage, PrivateMessage, Sender};

use super::segment::from_wire;

/// `sender` object of a message event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireSender {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub nickname: Option<String>,
    /// Group card.
    #[serde(default)]
    pub card: Option<String>,
}

/// A `post_type = "message"` event.
///
/// Only the fields that end up in a [`ChatMessage`] are read; `time`,
/// `message_id`, `raw_message` and the like are skipped.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    pub message_type: String,
    pub user_id: i64,
    #[serde(default)]
    pub group_id: Option<i64>,
    /// Not part of v11, but sent by several implementations.
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub message: Value,
    #[serde(default)]
    pub sender: WireSender,
}

impl MessageEvent {
    fn sender(&self) -> Sender {
        let nickname = self.sender.nickname.clone().filter(|n| !n.is_empty());
        let name = self
            .sender
            .card
            .clone()
            .filter(|c| !c.is_empty())
            .or_else(|| nickname.clone())
            .unwrap_or_default();
        Sender {
            id: self.sender.user_id.unwrap_or(self.user_id),
            name,
            nickname,
        }
    }

    /// Converts the event, or `None` for unsupported message types.
    pub fn into_chat_message(self) -> Option<ChatMessage> {
        let sender = self.sender();
        match (self.message_type.as_str(), self.group_id) {
            ("private", _) => Some(
                PrivateMessage {
                    sender,
                    segments: from_wire(self.message),
                }
                .into(),
            ),
            ("group", Some(group_id)) => Some(
                GroupMessage {
                    group_id,
                    group_name: self.group_name.unwrap_or_default(),
                    sender,
                    segments: from_wire(self.message),
                }
                .into(),
            ),
            _ => None,
        }
    }
}

/// A `post_type = "request"`, `request_type = "friend"` event.
#[derive(Debug, Clone, Deserialize)]
pub struct FriendRequestEvent {
    pub user_id: i64,
    #[serde(default)]
    pub comment: String,
    pub flag: String,
}

impl From<FriendRequestEvent> for ChatMessage {
    fn from(event: FriendRequestEvent) -> Self {
        FriendRequest {
            user_id: event.user_id,
            comment: event.comment,
            flag: event.flag,
        }
        .into()
    }
}

/// Parses one event post.
///
/// Returns `Ok(None)` for well-formed events that carry no chat unit.
pub fn parse_event(raw: &[u8]) -> Result<Option<ChatMessage>, serde_json::Error> {
    let v: Value = serde_json::from_slice(raw)?;
    let field = |name: &str| v.get(name).and_then(Value::as_str).unwrap_or("").to_string();
    let post_type = field("post_type");

    match post_type.as_str() {
        "message" => {
            let event: MessageEvent = serde_json::from_value(v)?;
            let message_type = event.message_type.clone();
            let message = event.into_chat_message();
            if message.is_none() {
                trace!(message_type = %message_type, "Ignoring message event");
            }
            Ok(message)
        }
        "request" if field("request_type") == "friend" => {
            let event: FriendRequestEvent = serde_json::from_value(v)?;
            Ok(Some(event.into()))
        }
        other => {
            trace!(post_type = %other, "Ignoring event");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campfire_core::Segment;
    use serde_json::json;

    fn parse(v: Value) -> Option<ChatMessage> {
        parse_event(v.to_string().as_bytes()).unwrap()
    }

    #[test]
    fn bookkeeping_fields_are_optional() {
        let message = parse(json!({
            "post_type": "message",
            "message_type": "private",
            "user_id": 7,
            "message": "hi",
            "sender": { "nickname": "路人" }
        }));
        let Some(ChatMessage::Private(private)) = message else {
            panic!("expected a private message");
        };
        assert_eq!(private.sender.id, 7);
        assert_eq!(private.segments, vec![Segment::text("hi")]);
    }

    #[test]
    fn group_message_uses_card_as_name() {
        let message = parse(json!({
            "time": 1700000000,
            "self_id": 1,
            "post_type": "message",
            "message_type": "group",
            "sub_type": "normal",
            "message_id": 55,
            "group_id": 900,
            "group_name": "饥荒群",
            "user_id": 42,
            "message": [{ "type": "text", "data": { "text": "/回档 3" } }],
            "raw_message": "/回档 3",
            "font": 0,
            "sender": { "user_id": 42, "nickname": "阿呆", "card": "管理员" }
        }));

        let Some(ChatMessage::Group(group)) = message else {
            panic!("expected a group message, got {message:?}");
        };
        assert_eq!(group.group_id, 900);
        assert_eq!(group.group_name, "饥荒群");
        assert_eq!(group.sender.id, 42);
        assert_eq!(group.sender.name, "管理员");
        assert_eq!(group.sender.nickname.as_deref(), Some("阿呆"));
        assert_eq!(group.segments, vec![Segment::text("/回档 3")]);
    }

    #[test]
    fn private_message_falls_back_to_nickname() {
        let message = parse(json!({
            "post_type": "message",
            "message_type": "private",
            "user_id": 7,
            "message": "确认",
            "sender": { "nickname": "小明", "card": "" }
        }));

        let Some(ChatMessage::Private(private)) = message else {
            panic!("expected a private message");
        };
        assert_eq!(private.sender.id, 7);
        assert_eq!(private.sender.name, "小明");
        assert_eq!(private.segments, vec![Segment::text("确认")]);
    }

    #[test]
    fn friend_request_is_converted() {
        let message = parse(json!({
            "post_type": "request",
            "request_type": "friend",
            "user_id": 8,
            "comment": "加个好友",
            "flag": "abc"
        }));
        assert_eq!(
            message,
            Some(ChatMessage::FriendRequest(FriendRequest {
                user_id: 8,
                comment: "加个好友".into(),
                flag: "abc".into(),
            }))
        );
    }

    #[test]
    fn other_events_are_ignored() {
        assert_eq!(parse(json!({ "post_type": "meta_event", "meta_event_type": "heartbeat" })), None);
        assert_eq!(parse(json!({ "post_type": "notice", "notice_type": "group_increase" })), None);
        assert_eq!(
            parse(json!({ "post_type": "request", "request_type": "group", "user_id": 1 })),
            None
        );
        assert_eq!(
            parse(json!({ "post_type": "message", "message_type": "guild", "user_id": 1 })),
            None
        );
    }

    #[test]
    fn malformed_events_are_errors() {
        assert!(parse_event(b"not json").is_err());
        assert!(parse_event(br#"{"post_type":"message","message_type":"private"}"#).is_err());
    }
}
