//! # Campfire Core
//!
//! Fundamental building blocks shared by every Campfire crate:
//!
//! - **Message model**: the [`ChatMessage`] sum type and its [`Segment`]s
//! - **Context**: [`MessageContext`], one per inbound unit of work
//! - **Event bus**: [`EventBus`] with synchronous, ordered delivery
//! - **Sessions**: [`SessionMatcher`] for "same conversation, same actor"
//! - **Transport**: the [`ChatTransport`] trait adapters implement
//!
//! ```text
//! ┌───────────┐  ChatMessage  ┌────────────────┐  publish   ┌──────────┐
//! │  Adapter  │──────────────▶│ MessageContext │───────────▶│ EventBus │
//! └───────────┘               └────────────────┘            └──────────┘
//!       ▲                             │ reply
//!       └─────── ChatTransport ◀──────┘
//! ```

pub mod context;
pub mod error;
pub mod event;
pub mod message;
pub mod session;
pub mod transport;

pub use context::MessageContext;
pub use error::{BoxError, TransportError, TransportResult};
pub use event::{Event, EventBus, EventListener, EventType, ListenerResult, listener};
pub use message::{
    ChatMessage, ConversationKind, FriendRequest, GroupMessage, PrivateMessage, Segment, Sender,
    extract_plain_text, render_segments, text_segments,
};
pub use session::SessionMatcher;
pub use transport::{BoxedDispatcher, BoxedTransport, ChatTransport, Dispatcher};
