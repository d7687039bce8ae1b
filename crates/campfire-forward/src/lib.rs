//! # Campfire Forward
//!
//! Connects a chat to a Don't Starve Together server.
//!
//! ```text
//!  chat ──▶ commands / group route ──▶ MsgQueue ──▶ GET /get_msg  ──▶ game
//!  chat ◀───────── ChatTransport ◀──────────────── POST /send_msg ◀── game
//! ```
//!
//! - [`commands`]: `/保存`, `/回档`, `/重置世界`, `/ban` and friends
//! - [`queue`]: the bounded hand-off queue and its wire format
//! - [`server`]: the HTTP bridge the game server polls

pub mod commands;
pub mod error;
pub mod queue;
pub mod server;

pub use commands::{ForwardCommands, ForwardSettings, register};
pub use error::{ForwardError, ForwardResult};
pub use queue::{DEFAULT_QUEUE_CAPACITY, Message, MsgQueue, MsgType};
pub use server::{BridgeState, GameMessage, IpAllowList, router, serve};

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use parking_lot::Mutex;

    use campfire_core::{
        ChatMessage, ChatTransport, GroupMessage, PrivateMessage, Segment, Sender,
        TransportResult, extract_plain_text,
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
}
