//! Credential exchange (issuer side): offer, request, issue, ack.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

use issuer_core::{
    AutoAcceptCredential, CredentialDefinitionRecord, CredentialExchangeEvent,
    CredentialExchangeId, CredentialExchangeRecord, CredentialExchangeState,
    CredentialExchangeStateMachine, CredentialOffer,
};

use crate::connection::ConnectionEngine;
use crate::error::EngineError;
use crate::events::{AgentEvent, CredentialStateChanged, EventBus};
use crate::registry::InMemoryRegistry;
use crate::wallet::Wallet;

/// Credential protocol interface used by the orchestration layer.
#[async_trait]
pub trait CredentialEngine: Send + Sync {
    /// Send a credential offer over an existing connection.
    async fn offer_credential(
        &self,
        offer: CredentialOffer,
    ) -> Result<CredentialExchangeId, EngineError>;

    /// Current snapshot of an exchange.
    async fn exchange(
        &self,
        id: &CredentialExchangeId,
    ) -> Result<CredentialExchangeRecord, EngineError>;
}

/// A credential the engine has signed and sent.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub exchange_id: CredentialExchangeId,
    /// Hex-encoded Ed25519 signature over the credential values.
    pub signature: String,
}

/// Credential engine backed by the in-memory wallet and registry.
pub struct InMemoryCredentialEngine {
    wallet: Arc<dyn Wallet>,
    registry: Arc<InMemoryRegistry>,
    connections: Arc<dyn ConnectionEngine>,
    auto_accept: AutoAcceptCredential,
    events: EventBus,
    exchanges: DashMap<CredentialExchangeId, CredentialExchangeRecord>,
    issued: DashMap<CredentialExchangeId, IssuedCredential>,
}

impl InMemoryCredentialEngine {
    pub fn new(
        wallet: Arc<dyn Wallet>,
        registry: Arc<InMemoryRegistry>,
        connections: Arc<dyn ConnectionEngine>,
        auto_accept: AutoAcceptCredential,
        events: EventBus,
    ) -> Self {
        Self {
            wallet,
            registry,
            connections,
            auto_accept,
            events,
            exchanges: DashMap::new(),
            issued: DashMap::new(),
        }
    }

    /// The holder answered an offer with a credential request.
    pub async fn receive_request(
        &self,
        id: &CredentialExchangeId,
    ) -> Result<CredentialExchangeRecord, EngineError> {
        let record = self.apply(id, CredentialExchangeEvent::ReceiveRequest)?;
        match self.auto_accept {
            AutoAcceptCredential::Always | AutoAcceptCredential::ContentApproved => {
                self.accept_request(id).await
            }
            AutoAcceptCredential::Never => Ok(record),
        }
    }

    /// Sign and send the credential for a received request.
    pub async fn accept_request(
        &self,
        id: &CredentialExchangeId,
    ) -> Result<CredentialExchangeRecord, EngineError> {
        let record = self.get(id)?;
        if record.state != CredentialExchangeState::RequestReceived {
            return Err(EngineError::UnexpectedExchangeState {
                id: id.clone(),
                state: record.state,
            });
        }

        let definition = self.finished_definition(&record)?;
        let payload = serde_json::json!({
            "credential_definition_id": definition.credential_definition_id,
            "schema_id": definition.schema_id,
            "values": record.attributes,
        });
        let bytes = serde_json::to_vec(&payload).map_err(issuer_core::CoreError::from)?;
        let signature = self.wallet.sign(&definition.issuer_id, &bytes).await?;

        self.issued.insert(
            id.clone(),
            IssuedCredential {
                exchange_id: id.clone(),
                signature: hex::encode(signature),
            },
        );
        self.apply(id, CredentialExchangeEvent::Issue)
    }

    /// The holder acknowledged receipt.
    pub fn receive_ack(
        &self,
        id: &CredentialExchangeId,
    ) -> Result<CredentialExchangeRecord, EngineError> {
        self.apply(id, CredentialExchangeEvent::ReceiveAck)
    }

    /// The holder declined the offer.
    pub fn receive_decline(
        &self,
        id: &CredentialExchangeId,
    ) -> Result<CredentialExchangeRecord, EngineError> {
        self.apply(id, CredentialExchangeEvent::Decline)
    }

    /// The holder reported a problem.
    pub fn receive_problem_report(
        &self,
        id: &CredentialExchangeId,
        description: &str,
    ) -> Result<CredentialExchangeRecord, EngineError> {
        tracing::warn!(exchange_id = %id, description, "problem report received");
        self.apply(id, CredentialExchangeEvent::Abandon)
    }

    pub fn issued_credential(&self, id: &CredentialExchangeId) -> Option<IssuedCredential> {
        self.issued.get(id).map(|e| e.clone())
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.len()
    }

    fn get(&self, id: &CredentialExchangeId) -> Result<CredentialExchangeRecord, EngineError> {
        self.exchanges
            .get(id)
            .map(|e| e.clone())
            .ok_or_else(|| EngineError::ExchangeNotFound(id.clone()))
    }

    fn finished_definition(
        &self,
        record: &CredentialExchangeRecord,
    ) -> Result<CredentialDefinitionRecord, EngineError> {
        self.registry
            .credential_definition(&record.credential_definition_id)
            .filter(|d| d.is_finished())
            .ok_or_else(|| {
                EngineError::UnknownCredentialDefinition(
                    record.credential_definition_id.to_string(),
                )
            })
    }

    fn apply(
        &self,
        id: &CredentialExchangeId,
        event: CredentialExchangeEvent,
    ) -> Result<CredentialExchangeRecord, EngineError> {
        let (record, previous) = {
            let mut entry = self
                .exchanges
                .get_mut(id)
                .ok_or_else(|| EngineError::ExchangeNotFound(id.clone()))?;
            let previous = entry.state;
            entry.state = CredentialExchangeStateMachine::transition(previous, event)?;
            entry.updated_at = Utc::now();
            (entry.clone(), previous)
        };
        self.publish(record.clone(), Some(previous));
        Ok(record)
    }

    fn publish(
        &self,
        record: CredentialExchangeRecord,
        previous_state: Option<CredentialExchangeState>,
    ) {
        self.events
            .emit(AgentEvent::CredentialStateChanged(CredentialStateChanged {
                credential_record: record,
                previous_state,
            }));
    }
}

#[async_trait]
impl CredentialEngine for InMemoryCredentialEngine {
    async fn offer_credential(
        &self,
        offer: CredentialOffer,
    ) -> Result<CredentialExchangeId, EngineError> {
        if offer.attributes.is_empty() {
            return Err(EngineError::EmptyOffer);
        }
        if !offer.credential_definition_id.is_well_formed() {
            return Err(EngineError::MalformedCredentialDefinitionId(
                offer.credential_definition_id.to_string(),
            ));
        }

        let connection = self.connections.connection(&offer.connection_id).await?;
        if !connection.state.is_ready() {
            return Err(EngineError::ConnectionNotReady {
                id: connection.id,
                state: connection.state,
            });
        }

        let now = Utc::now();
        let record = CredentialExchangeRecord {
            id: CredentialExchangeId::new(uuid::Uuid::now_v7().to_string()),
            connection_id: offer.connection_id,
            state: CredentialExchangeState::OfferSent,
            credential_definition_id: offer.credential_definition_id,
            attributes: offer.attributes,
            created_at: now,
            updated_at: now,
        };
        self.finished_definition(&record)?;

        let id = record.id.clone();
        self.exchanges.insert(id.clone(), record.clone());
        tracing::debug!(
            exchange_id = %id,
            connection_id = %record.connection_id,
            protocol_version = ?offer.protocol_version,
            "credential offer sent"
        );
        self.publish(record, None);
        Ok(id)
    }

    async fn exchange(
        &self,
        id: &CredentialExchangeId,
    ) -> Result<CredentialExchangeRecord, EngineError> {
        self.get(id)
    }
}
