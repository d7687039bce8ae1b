//! Bounded hand-off queue between the chat and the game server.
//!
//! Handlers push [`Message`]s; the game server polls the HTTP bridge, which
//! drains everything queued so far. When the game server stops polling, the
//! oldest entries are evicted so the queue never grows past its capacity.
//!
//! Wire format of one entry:
//!
//! ```json
//! {
//!   "type": 1,
//!   "data": {
//!     "source": { "id": 123456, "name": "群名" },
//!     "sender": { "id": 10001, "name": "群名片", "nick": "昵称" },
//!     "head": "rollback",
//!     "content": 3
//!   }
//! }
//! ```
//!
//! `type` is `0` for forwarded chat text and `1` for commands; `head` is
//! present only on commands.

use std::collections::VecDeque;
use std::mem;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use campfire_core::{GroupMessage, PrivateMessage, render_segments};

/// Capacity used when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 5;

/// Kind of a queued entry. Serialized as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MsgType {
    /// Chat text forwarded to the game.
    Text,
    /// A command for the game server.
    Cmd,
}

impl From<MsgType> for u8 {
    fn from(kind: MsgType) -> Self {
        match kind {
            MsgType::Text => 0,
            MsgType::Cmd => 1,
        }
    }
}

impl TryFrom<u8> for MsgType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Text),
            1 => Ok(Self::Cmd),
            other => Err(format!("unknown message type {other}")),
        }
    }
}

/// Where a queued entry came from: the group, or the peer for private chats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub name: String,
}

/// Who sent a queued entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: i64,
    /// Display name (group card when available).
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
}

impl From<&campfire_core::Sender> for Sender {
    fn from(sender: &campfire_core::Sender) -> Self {
        Self {
            id: sender.id,
            name: sender.name.clone(),
            nick: sender.nickname.clone().filter(|n| !n.is_empty()),
        }
    }
}

/// Payload of a queued entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data {
    pub source: Source,
    pub sender: Sender,
    /// Command kind, e.g. `save`. Absent for text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    /// Text for [`MsgType::Text`]; command argument (or `null`) for
    /// [`MsgType::Cmd`].
    pub content: Value,
}

/// One queued entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MsgType,
    pub data: Data,
}

/// FIFO of [`Message`]s holding at most `max_size` entries.
#[derive(Debug)]
pub struct MsgQueue {
    messages: Mutex<VecDeque<Message>>,
    max_size: usize,
}

impl Default for MsgQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl MsgQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            messages: Mutex::new(VecDeque::with_capacity(max_size)),
            max_size,
        }
    }

    /// Appends `msg`, evicting the oldest entries beyond capacity.
    pub fn enqueue(&self, msg: Message) {
        debug!(kind = ?msg.kind, head = ?msg.data.head, "Enqueue message");
        let mut messages = self.messages.lock();
        messages.push_back(msg);
        while messages.len() > self.max_size {
            messages.pop_front();
        }
    }

    /// Takes every queued entry, oldest first.
    pub fn drain(&self) -> Vec<Message> {
        let drained: Vec<Message> = mem::take(&mut *self.messages.lock()).into();
        debug!(count = drained.len(), "Drained queue");
        drained
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Queues the rendered text of a group message.
    pub fn enqueue_group_message(&self, msg: &GroupMessage) {
        self.enqueue(Message {
            kind: MsgType::Text,
            data: Data {
                source: group_source(msg),
                sender: Sender::from(&msg.sender),
                head: None,
                content: Value::String(render_segments(&msg.segments)),
            },
        });
    }

    /// Queues a command issued from a group.
    pub fn enqueue_cmd_by_group(&self, head: &str, content: Value, msg: &GroupMessage) {
        self.enqueue(Message {
            kind: MsgType::Cmd,
            data: Data {
                source: group_source(msg),
                sender: Sender::from(&msg.sender),
                head: Some(head.to_string()),
                content,
            },
        });
    }

    /// Queues a command issued in a private chat. The source is the peer.
    pub fn enqueue_cmd_by_private(&self, head: &str, content: Value, msg: &PrivateMessage) {
        self.enqueue(Message {
            kind: MsgType::Cmd,
            data: Data {
                source: Source {
                    id: msg.sender.id,
                    name: msg.sender.name.clone(),
                },
                sender: Sender::from(&msg.sender),
                head: Some(head.to_string()),
                content,
            },
        });
    }
}

fn group_source(msg: &GroupMessage) -> Source {
    Source {
        id: msg.group_id,
        name: msg.group_name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campfire_core::Segment;
    use serde_json::json;

    fn text(n: usize) -> Message {
        Message {
            kind: MsgType::Text,
            data: Data {
                source: Source {
                    id: 1,
                    name: "g".into(),
                },
                sender: Sender {
                    id: 2,
                    name: "s".into(),
                    nick: None,
                },
                head: None,
                content: json!(format!("m{n}")),
            },
        }
    }

    fn contents(msgs: &[Message]) -> Vec<String> {
        msgs.iter()
            .map(|m| m.data.content.as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn keeps_only_the_newest_entries() {
        let queue = MsgQueue::new(3);
        for n in 0..7 {
            queue.enqueue(text(n));
            assert!(queue.len() <= 3);
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(contents(&queue.drain()), vec!["m4", "m5", "m6"]);
    }

    #[test]
    fn below_capacity_keeps_everything() {
        let queue = MsgQueue::default();
        queue.enqueue(text(0));
        queue.enqueue(text(1));
        assert_eq!(contents(&queue.drain()), vec!["m0", "m1"]);
    }

    #[test]
    fn drain_empties_the_queue() {
        let queue = MsgQueue::default();
        assert!(queue.drain().is_empty());

        queue.enqueue(text(0));
        assert_eq!(queue.drain().len(), 1);
        assert!(queue.drain().is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn concurrent_enqueue_and_drain_lose_nothing() {
        use std::collections::HashSet;
        use std::sync::atomic::{AtomicBool, Ordering};

        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 5_000;

        let queue = MsgQueue::new(PRODUCERS * PER_PRODUCER);
        let done = AtomicBool::new(false);

        let mut seen: Vec<String> = std::thread::scope(|scope| {
            let drainer = scope.spawn(|| {
                let mut seen = Vec::new();
                while !done.load(Ordering::Acquire) {
                    seen.extend(contents(&queue.drain()));
                    std::thread::yield_now();
                }
                seen
            });

            let producers: Vec<_> = (0..PRODUCERS)
                .map(|p| {
                    let queue = &queue;
                    scope.spawn(move || {
                        for i in 0..PER_PRODUCER {
                            queue.enqueue(text(p * PER_PRODUCER + i));
                        }
                    })
                })
                .collect();
            for producer in producers {
                producer.join().unwrap();
            }
            done.store(true, Ordering::Release);
            drainer.join().unwrap()
        });
        seen.extend(contents(&queue.drain()));

        let unique: HashSet<&String> = seen.iter().collect();
        assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
        assert_eq!(unique.len(), seen.len());
    }

    #[test]
    fn text_entries_serialize_without_head() {
        let queue = MsgQueue::default();
        queue.enqueue_group_message(&GroupMessage {
            group_id: 123,
            group_name: "饥荒群".into(),
            sender: campfire_core::Sender {
                id: 10001,
                name: "名片".into(),
                nickname: Some("昵称".into()),
            },
            segments: vec![Segment::text("大家好")],
        });

        let json = serde_json::to_value(queue.drain()).unwrap();
        assert_eq!(
            json,
            json!([{
                "type": 0,
                "data": {
                    "source": { "id": 123, "name": "饥荒群" },
                    "sender": { "id": 10001, "name": "名片", "nick": "昵称" },
                    "content": "大家好"
                }
            }])
        );
    }

    #[test]
    fn private_commands_use_the_peer_as_source() {
        let queue = MsgQueue::default();
        queue.enqueue_cmd_by_private(
            "rollback",
            json!(3),
            &PrivateMessage {
                sender: campfire_core::Sender {
                    id: 42,
                    name: "admin".into(),
                    nickname: None,
                },
                segments: vec![],
            },
        );

        let json = serde_json::to_value(queue.drain()).unwrap();
        assert_eq!(
            json,
            json!([{
                "type": 1,
                "data": {
                    "source": { "id": 42, "name": "admin" },
                    "sender": { "id": 42, "name": "admin" },
                    "head": "rollback",
                    "content": 3
                }
            }])
        );
    }

    #[test]
    fn message_type_rejects_unknown_codes() {
        let parsed: Result<MsgType, _> = serde_json::from_value(json!(7));
        assert!(parsed.is_err());
        let parsed: MsgType = serde_json::from_value(json!(1)).unwrap();
        assert_eq!(parsed, MsgType::Cmd);
    }
}
