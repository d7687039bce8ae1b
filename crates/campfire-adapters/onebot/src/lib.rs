//! # Campfire OneBot Adapter
//!
//! Connects Campfire to a OneBot v11 implementation over HTTP:
//!
//! ```text
//!            POST <path> (events)              POST <api_url>/<action>
//! OneBot ───────────────────────▶ receiver ──▶ Dispatcher ──▶ HttpApiCaller ──▶ OneBot
//! ```
//!
//! - [`receiver`]: axum endpoint that parses event posts and dispatches them
//! - [`api_caller`]: [`ChatTransport`](campfire_core::ChatTransport) over the HTTP API
//! - [`model`]: wire types

pub mod api_caller;
pub mod error;
pub mod model;
pub mod receiver;

use std::sync::Arc;

use axum::Router;
use tracing::info;

use campfire_core::{BoxedDispatcher, BoxedTransport};

pub use api_caller::{ApiSettings, DEFAULT_API_TIMEOUT, HttpApiCaller};
pub use error::{OneBotError, OneBotResult};
pub use receiver::{DEFAULT_EVENT_PATH, ReceiverState};

/// The OneBot transport together with its event route.
#[derive(Debug, Clone)]
pub struct OneBotAdapter {
    caller: Arc<HttpApiCaller>,
    event_path: String,
}

impl OneBotAdapter {
    pub fn new(settings: &ApiSettings, event_path: impl Into<String>) -> OneBotResult<Self> {
        let caller = Arc::new(HttpApiCaller::new(settings)?);
        let event_path = event_path.into();
        info!(api_url = %settings.api_url, event_path = %event_path, "OneBot adapter created");
        Ok(Self { caller, event_path })
    }

    /// The outbound transport, shared by every context and the bridge.
    pub fn transport(&self) -> BoxedTransport {
        self.caller.clone()
    }

    /// The event receiver route, dispatching into `dispatcher`.
    pub fn router(&self, dispatcher: BoxedDispatcher) -> Router {
        receiver::router(
            &self.event_path,
            ReceiverState::new(dispatcher, self.transport()),
        )
    }
}
