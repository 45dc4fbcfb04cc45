//! State-change notifications published by the protocol engines.
//!
//! Engines publish on an [`EventBus`]; anything that wants to react (the
//! watchers in `issuer-flow`) subscribes through [`NotificationSource`].

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use issuer_core::{
    ConnectionRecord, CredentialExchangeRecord, CredentialExchangeState, DidExchangeState,
};

/// Notifications emitted by the agent.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    ConnectionStateChanged(ConnectionStateChanged),
    CredentialStateChanged(CredentialStateChanged),
}

/// A connection record moved to a new state.
#[derive(Debug, Clone)]
pub struct ConnectionStateChanged {
    /// Snapshot of the record after the change.
    pub connection_record: ConnectionRecord,
    /// `None` when the record was just created.
    pub previous_state: Option<DidExchangeState>,
}

/// A credential exchange record moved to a new state.
#[derive(Debug, Clone)]
pub struct CredentialStateChanged {
    /// Snapshot of the record after the change.
    pub credential_record: CredentialExchangeRecord,
    /// `None` when the record was just created.
    pub previous_state: Option<CredentialExchangeState>,
}

/// Something that hands out independent receivers of agent events.
///
/// Every receiver sees every event published after it subscribed, in
/// publication order. The receiver yields `None` once the source is gone.
pub trait NotificationSource: Send + Sync {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<AgentEvent>;
}

/// Fan-out shared by every engine of one agent.
///
/// Each subscriber owns an unbounded queue, so a slow subscriber delays only
/// itself and never loses events.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<AgentEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event. Returns how many subscribers will see it; having
    /// none is not an error.
    pub fn emit(&self, event: AgentEvent) -> usize {
        // Held across the fan-out so all subscribers observe one global order.
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

impl NotificationSource for EventBus {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<AgentEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }
}
