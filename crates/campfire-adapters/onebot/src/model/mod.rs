//! OneBot v11 wire types.
//!
//! - [`event`]: inbound event posts and their conversion to [`ChatMessage`](campfire_core::ChatMessage)
//! - [`segment`]: the `{type, data}` message element format
//! - [`api`]: request parameters and the response envelope

pub mod api;
pub mod event;
pub mod segment;

pub use api::{ApiResponse, SendGroupMsg, SendPrivateMsg};
pub use event::{FriendRequestEvent, MessageEvent, WireSender, parse_event};
pub use segment::{WireSegment, from_wire, to_wire};
