//! Issuance orchestration: offer a credential to every connection made from
//! the invitation, and report each credential that gets issued.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

use issuer_agent::{CredentialEngine, NotificationSource};
use issuer_core::{
    ConnectionId, ConnectionRecord, CredentialAttribute, CredentialDefinitionId,
    CredentialExchangeId, CredentialExchangeRecord, CredentialOffer, OutOfBandId,
    ProtocolVersion,
};

use crate::error::FlowError;
use crate::watcher::{ConnectionWatcher, CredentialWatcher, WatchHandle};

/// What to offer once a connection is ready.
#[derive(Debug, Clone)]
pub struct IssuanceSettings {
    pub credential_definition_id: CredentialDefinitionId,
    pub attributes: Vec<CredentialAttribute>,
    pub protocol_version: ProtocolVersion,
    /// When set, offers carry the legacy Indy form of the credential
    /// definition id, built with this unqualified issuer DID.
    pub legacy_issuer: Option<String>,
}

impl IssuanceSettings {
    pub fn new(
        credential_definition_id: CredentialDefinitionId,
        attributes: Vec<CredentialAttribute>,
    ) -> Self {
        Self {
            credential_definition_id,
            attributes,
            protocol_version: ProtocolVersion::default(),
            legacy_issuer: None,
        }
    }

    /// The credential definition id to put in offers.
    pub fn offered_credential_definition_id(&self) -> Result<CredentialDefinitionId, FlowError> {
        match &self.legacy_issuer {
            Some(legacy) => Ok(self.credential_definition_id.to_legacy(legacy)?),
            None => Ok(self.credential_definition_id.clone()),
        }
    }
}

/// Where the offer for one connection stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferStatus {
    /// Reserved; submission in flight.
    Submitting,
    Offered(CredentialExchangeId),
    /// Submission was rejected. Not retried.
    Failed(String),
}

/// Signalled once per issued credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceCompleted {
    pub exchange_id: CredentialExchangeId,
    pub connection_id: ConnectionId,
    pub credential_definition_id: CredentialDefinitionId,
}

/// The watches an orchestrator has started.
#[derive(Debug, Default)]
pub struct ObserverRegistry {
    handles: Mutex<Vec<WatchHandle>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the handle list, recovering it if a holder panicked.
    fn handles(&self) -> MutexGuard<'_, Vec<WatchHandle>> {
        self.handles.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("observer registry lock poisoned; recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    pub fn register(&self, handle: WatchHandle) {
        self.handles().push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unsubscribe every registered watch.
    pub fn shutdown(&self) {
        let handles = std::mem::take(&mut *self.handles());
        let count = handles.len();
        for handle in handles {
            handle.unsubscribe();
        }
        tracing::debug!(count, "observers shut down");
    }
}

pub struct IssuanceOrchestrator {
    credentials: Arc<dyn CredentialEngine>,
    source: Arc<dyn NotificationSource>,
    credential_definition_id: CredentialDefinitionId,
    attributes: Arc<Vec<CredentialAttribute>>,
    protocol_version: ProtocolVersion,
    offers: Arc<DashMap<ConnectionId, OfferStatus>>,
    observers: ObserverRegistry,
    completed_tx: mpsc::UnboundedSender<IssuanceCompleted>,
}

impl IssuanceOrchestrator {
    /// Returns the orchestrator and the receiving end of its completion
    /// signal. No watch runs until [`IssuanceOrchestrator::start`].
    pub fn new(
        credentials: Arc<dyn CredentialEngine>,
        source: Arc<dyn NotificationSource>,
        settings: IssuanceSettings,
    ) -> Result<(Self, mpsc::UnboundedReceiver<IssuanceCompleted>), FlowError> {
        let credential_definition_id = settings.offered_credential_definition_id()?;
        let (completed_tx, completed_rx) = mpsc::unbounded_channel();
        let orchestrator = Self {
            credentials,
            source,
            credential_definition_id,
            attributes: Arc::new(settings.attributes),
            protocol_version: settings.protocol_version,
            offers: Arc::new(DashMap::new()),
            observers: ObserverRegistry::new(),
            completed_tx,
        };
        Ok((orchestrator, completed_rx))
    }

    /// Watch connections made from `out_of_band_id` and all credential
    /// exchanges.
    pub fn start(&self, out_of_band_id: &OutOfBandId) {
        self.watch_invitation(out_of_band_id);
        self.watch_credentials();
    }

    /// Offer a credential to each connection from `out_of_band_id` the first
    /// time it becomes ready.
    pub fn watch_invitation(&self, out_of_band_id: &OutOfBandId) {
        let credentials = self.credentials.clone();
        let offers = self.offers.clone();
        let attributes = self.attributes.clone();
        let credential_definition_id = self.credential_definition_id.clone();
        let protocol_version = self.protocol_version;

        let handle = ConnectionWatcher::new(out_of_band_id.clone()).watch(
            self.source.as_ref(),
            move |record: ConnectionRecord| {
                if !reserve(&offers, &record.id) {
                    tracing::debug!(
                        connection_id = %record.id,
                        state = %record.state,
                        "offer already submitted for connection"
                    );
                    return;
                }

                tracing::info!(
                    connection_id = %record.id,
                    out_of_band_id = ?record.out_of_band_id,
                    "connection completed"
                );

                let offer = CredentialOffer {
                    connection_id: record.id,
                    credential_definition_id: credential_definition_id.clone(),
                    protocol_version,
                    attributes: attributes.as_ref().clone(),
                };
                tokio::spawn(submit_offer(credentials.clone(), offers.clone(), offer));
            },
        );
        self.observers.register(handle);
    }

    /// Signal completion for each exchange that reaches `credential-issued`.
    pub fn watch_credentials(&self) {
        let completed_tx = self.completed_tx.clone();
        let handle = CredentialWatcher::new().watch(
            self.source.as_ref(),
            move |record: CredentialExchangeRecord| {
                tracing::info!(
                    exchange_id = %record.id,
                    connection_id = %record.connection_id,
                    "credential issued"
                );
                let completed = IssuanceCompleted {
                    exchange_id: record.id,
                    connection_id: record.connection_id,
                    credential_definition_id: record.credential_definition_id,
                };
                if completed_tx.send(completed).is_err() {
                    tracing::debug!("completion receiver dropped");
                }
            },
        );
        self.observers.register(handle);
    }

    pub fn offer_status(&self, connection_id: &ConnectionId) -> Option<OfferStatus> {
        self.offers.get(connection_id).map(|e| e.clone())
    }

    pub fn offer_count(&self) -> usize {
        self.offers.len()
    }

    pub fn credential_definition_id(&self) -> &CredentialDefinitionId {
        &self.credential_definition_id
    }

    pub fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }

    /// Stop every watch this orchestrator started.
    pub fn shutdown(&self) {
        self.observers.shutdown();
    }
}

/// Claim the offer slot for a connection. Only the first caller wins.
fn reserve(offers: &DashMap<ConnectionId, OfferStatus>, connection_id: &ConnectionId) -> bool {
    match offers.entry(connection_id.clone()) {
        Entry::Occupied(_) => false,
        Entry::Vacant(slot) => {
            slot.insert(OfferStatus::Submitting);
            true
        }
    }
}

async fn submit_offer(
    credentials: Arc<dyn CredentialEngine>,
    offers: Arc<DashMap<ConnectionId, OfferStatus>>,
    offer: CredentialOffer,
) {
    let connection_id = offer.connection_id.clone();
    let credential_definition_id = offer.credential_definition_id.clone();
    match credentials.offer_credential(offer).await {
        Ok(exchange_id) => {
            tracing::info!(
                %connection_id,
                %exchange_id,
                %credential_definition_id,
                "credential offered"
            );
            offers.insert(connection_id, OfferStatus::Offered(exchange_id));
        }
        Err(e) => {
            tracing::error!(%connection_id, error = %e, "credential offer failed");
            offers.insert(connection_id, OfferStatus::Failed(e.to_string()));
        }
    }
}
