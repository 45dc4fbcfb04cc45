//! Long-lived listeners over the agent's state-change notifications.
//!
//! Each watcher subscribes when `watch` is called, then runs in its own task
//! until the bus closes or the returned [`WatchHandle`] is unsubscribed.
//! Callbacks run on that task and must not block; anything slow should be
//! spawned.

use std::collections::HashSet;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use issuer_agent::{AgentEvent, NotificationSource};
use issuer_core::{
    ConnectionRecord, CredentialExchangeId, CredentialExchangeRecord, CredentialExchangeState,
    OutOfBandId,
};

/// Owns a running watch.
///
/// Dropping the handle does not stop the watch.
#[derive(Debug)]
pub struct WatchHandle {
    name: &'static str,
    task: JoinHandle<()>,
}

impl WatchHandle {
    fn new(name: &'static str, task: JoinHandle<()>) -> Self {
        Self { name, task }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the listener task has ended (bus closed or aborted).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop listening.
    pub fn unsubscribe(self) {
        tracing::debug!(watcher = self.name, "unsubscribing");
        self.task.abort();
    }
}

/// Drive `rx` until it closes, handing every event to `on_event`.
fn spawn_listener<F>(
    name: &'static str,
    mut rx: mpsc::UnboundedReceiver<AgentEvent>,
    mut on_event: F,
) -> WatchHandle
where
    F: FnMut(AgentEvent) + Send + 'static,
{
    let task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            on_event(event);
        }
        tracing::debug!(watcher = name, "event bus closed");
    });
    WatchHandle::new(name, task)
}

/// Fires when a connection created from one particular invitation becomes
/// usable.
///
/// Both `completed` and `response-sent` count as usable, so the callback can
/// fire more than once for the same connection. Callers that act on it must
/// make their reaction idempotent.
#[derive(Debug, Clone)]
pub struct ConnectionWatcher {
    out_of_band_id: OutOfBandId,
}

impl ConnectionWatcher {
    pub fn new(out_of_band_id: OutOfBandId) -> Self {
        Self { out_of_band_id }
    }

    pub fn out_of_band_id(&self) -> &OutOfBandId {
        &self.out_of_band_id
    }

    /// Whether `record` belongs to our invitation and is ready for use.
    pub fn matches(&self, record: &ConnectionRecord) -> bool {
        record.out_of_band_id.as_ref() == Some(&self.out_of_band_id) && record.state.is_ready()
    }

    pub fn watch<F>(self, source: &dyn NotificationSource, mut on_ready: F) -> WatchHandle
    where
        F: FnMut(ConnectionRecord) + Send + 'static,
    {
        let rx = source.subscribe();
        tracing::debug!(out_of_band_id = %self.out_of_band_id, "watching connections");
        spawn_listener("connection", rx, move |event| {
            if let AgentEvent::ConnectionStateChanged(changed) = event {
                if self.matches(&changed.connection_record) {
                    on_ready(changed.connection_record);
                }
            }
        })
    }
}

/// Fires once per credential exchange that reaches `credential-issued`.
///
/// Watches every exchange on the agent; callers that run several exchanges
/// filter by exchange id themselves.
#[derive(Debug, Clone, Default)]
pub struct CredentialWatcher;

impl CredentialWatcher {
    pub fn new() -> Self {
        Self
    }

    pub fn is_issued(record: &CredentialExchangeRecord) -> bool {
        record.state == CredentialExchangeState::CredentialIssued
    }

    pub fn watch<F>(self, source: &dyn NotificationSource, mut on_issued: F) -> WatchHandle
    where
        F: FnMut(CredentialExchangeRecord) + Send + 'static,
    {
        let rx = source.subscribe();
        // Grows by one id per issued exchange for the life of the watch.
        let mut seen: HashSet<CredentialExchangeId> = HashSet::new();
        spawn_listener("credential", rx, move |event| {
            if let AgentEvent::CredentialStateChanged(changed) = event {
                let record = changed.credential_record;
                if Self::is_issued(&record) && seen.insert(record.id.clone()) {
                    on_issued(record);
                }
            }
        })
    }
}
