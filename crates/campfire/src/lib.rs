//! # Campfire
//!
//! Bridges a OneBot v11 group chat and a Don't Starve Together server.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐ events ┌──────────────┐     ┌────────────────────┐     ┌──────────┐
//! │  OneBot  │───────▶│   Receiver   │────▶│    LogicManager    │────▶│ MsgQueue │◀── GET /get_msg
//! │  (chat)  │◀───────│ HttpApiCaller│◀──┐ │ (routes, prompts)  │     └──────────┘
//! └──────────┘  API   └──────────────┘   │ └────────────────────┘
//!                                        └──────────────────────── POST /send_msg ◀── game
//! ```
//!
//! - **Core**: message model, contexts, event bus, transport traits
//! - **Framework**: router, routes, middleware, confirmation prompts
//! - **Forward**: game commands, message queue and the HTTP bridge
//! - **Runtime**: configuration, logging and server lifecycle
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use campfire::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = CampfireRuntime::builder().build()?;
//!     runtime
//!         .manager()
//!         .handle_command("/", "hello", |ctx: Arc<MessageContext>| async move {
//!             ctx.reply_text("hi").await?;
//!             Ok(())
//!         }, []);
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub use campfire_adapter_onebot as onebot;
pub use campfire_core as core;
pub use campfire_forward as forward;
pub use campfire_framework as framework;
pub use campfire_runtime as runtime;

/// Commonly used types for building on top of Campfire.
pub mod prelude {
    pub use std::sync::Arc;

    pub use campfire_runtime::{CampfireConfig, CampfireRuntime, ConfigLoader};

    pub use campfire_framework::{HandlerResult, LogicManager, Middleware, Route, auth};

    pub use campfire_core::{ChatMessage, ChatTransport, MessageContext, Segment};

    pub use campfire_forward::{Message, MsgQueue, MsgType};
}
