//! Publish/subscribe event bus.
//!
//! The [`EventBus`] decouples the dispatch loop (which publishes
//! [`Event::MessageReceived`] for every inbound message) from consumers such
//! as prompt waiters and audit listeners.
//!
//! Delivery rules:
//!
//! - Listeners of one event type run synchronously, in registration order,
//!   on the publisher's task.
//! - A listener error is logged and the remaining listeners still run.
//! - The listener list is snapshotted before delivery, so a listener may
//!   subscribe or unsubscribe while it is being invoked.
//!
//! # Example
//!
//! ```rust,ignore
//! let bus = EventBus::new();
//! let audit = listener(|event| {
//!     info!(command = %event.context().get_string("executed_command"), "Command executed");
//!     Ok(())
//! });
//! bus.subscribe(EventType::CommandExecuted, audit.clone());
//! // ...
//! bus.unsubscribe(EventType::CommandExecuted, &audit);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{error, trace};

use crate::context::MessageContext;
use crate::error::BoxError;

/// Event type keys for subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// An inbound chat message entered the system.
    MessageReceived,
    /// A command route finished successfully.
    CommandExecuted,
}

impl EventType {
    /// Returns the name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MessageReceived => "message_received",
            Self::CommandExecuted => "command_executed",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event published on the bus.
#[derive(Debug, Clone)]
pub enum Event {
    MessageReceived(Arc<MessageContext>),
    CommandExecuted(Arc<MessageContext>),
}

impl Event {
    /// Returns the subscription key of this event.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::MessageReceived(_) => EventType::MessageReceived,
            Self::CommandExecuted(_) => EventType::CommandExecuted,
        }
    }

    /// Returns the message context the event refers to.
    pub fn context(&self) -> &Arc<MessageContext> {
        match self {
            Self::MessageReceived(ctx) | Self::CommandExecuted(ctx) => ctx,
        }
    }
}

/// Result returned by listeners.
pub type ListenerResult = Result<(), BoxError>;

/// A subscribed listener. Identity is the `Arc` allocation.
pub type EventListener = Arc<dyn Fn(&Event) -> ListenerResult + Send + Sync>;

/// Wraps a closure into an [`EventListener`].
pub fn listener<F>(f: F) -> EventListener
where
    F: Fn(&Event) -> ListenerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Registry of listeners keyed by [`EventType`].
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<EventType, Vec<EventListener>>>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `event_type`.
    ///
    /// Registering the same listener twice makes it fire twice.
    pub fn subscribe(&self, event_type: EventType, listener: EventListener) {
        self.listeners
            .write()
            .entry(event_type)
            .or_default()
            .push(listener);
        trace!(event_type = %event_type, "Listener subscribed");
    }

    /// Removes every registration of `listener` for `event_type`.
    ///
    /// Unknown listeners are ignored.
    pub fn unsubscribe(&self, event_type: EventType, listener: &EventListener) {
        let mut listeners = self.listeners.write();
        if let Some(list) = listeners.get_mut(&event_type) {
            list.retain(|l| !Arc::ptr_eq(l, listener));
            if list.is_empty() {
                listeners.remove(&event_type);
            }
        }
        trace!(event_type = %event_type, "Listener unsubscribed");
    }

    /// Delivers `event` to every listener of its type.
    ///
    /// Returns the number of listeners invoked.
    pub fn publish(&self, event: &Event) -> usize {
        let event_type = event.event_type();
        let snapshot: Vec<EventListener> = self
            .listeners
            .read()
            .get(&event_type)
            .cloned()
            .unwrap_or_default();

        for (index, listener) in snapshot.iter().enumerate() {
            if let Err(e) = listener(event) {
                error!(
                    event_type = %event_type,
                    listener_index = index,
                    error = %e,
                    "Event listener failed"
                );
            }
        }

        snapshot.len()
    }

    /// Returns the number of registrations for `event_type`.
    pub fn listener_count(&self, event_type: EventType) -> usize {
        self.listeners
            .read()
            .get(&event_type)
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.read();
        f.debug_struct("EventBus")
            .field("event_types", &listeners.len())
            .field(
                "listeners",
                &listeners.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}
