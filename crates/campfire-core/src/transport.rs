//! The seams between adapters and the core.
//!
//! The core never owns the platform session. It only needs a way to send a
//! message to a peer or a group, which adapters provide by implementing
//! [`ChatTransport`]. In the other direction, adapters hand every inbound
//! unit to a [`Dispatcher`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportResult;
use crate::message::{ChatMessage, Segment};

/// Send operations exposed by a chat platform adapter.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Sends a message to a private peer.
    async fn send_private(&self, user_id: i64, segments: Vec<Segment>) -> TransportResult<()>;

    /// Sends a message to a group.
    async fn send_group(&self, group_id: i64, segments: Vec<Segment>) -> TransportResult<()>;
}

/// Shared handle to a transport.
pub type BoxedTransport = Arc<dyn ChatTransport>;

/// Receives inbound units from an adapter.
///
/// Returns once the unit has been accepted; handling may continue on
/// another task.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, message: ChatMessage, transport: BoxedTransport);
}

/// Shared handle to a dispatcher.
pub type BoxedDispatcher = Arc<dyn Dispatcher>;
