//! Out-of-band invitations and the DID exchange handshake (responder side).

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

use issuer_core::{
    AgentConfig, ConnectionId, ConnectionRecord, DidExchangeState, OutOfBandId,
    OutOfBandInvitation, OutOfBandRecord,
};

use crate::error::EngineError;
use crate::events::{AgentEvent, ConnectionStateChanged, EventBus};

/// An invitation ready to hand to a peer, plus the record we keep for it.
#[derive(Debug, Clone)]
pub struct CreatedInvitation {
    pub invitation: OutOfBandInvitation,
    pub out_of_band_record: OutOfBandRecord,
}

/// Connection protocol interface used by the orchestration layer.
#[async_trait]
pub trait ConnectionEngine: Send + Sync {
    /// Create a new out-of-band invitation.
    async fn create_invitation(&self, multi_use: bool) -> Result<CreatedInvitation, EngineError>;

    /// Current snapshot of a connection.
    async fn connection(&self, id: &ConnectionId) -> Result<ConnectionRecord, EngineError>;
}

struct InvitationEntry {
    record: OutOfBandRecord,
    /// Secret half of the invitation's recipient key.
    _recipient_key: SigningKey,
    uses: usize,
}

/// Connection engine that keeps its records in memory and publishes every
/// state change on the agent's event bus.
pub struct InMemoryConnectionEngine {
    label: String,
    endpoint: Option<String>,
    auto_accept: bool,
    events: EventBus,
    invitations: DashMap<OutOfBandId, InvitationEntry>,
    connections: DashMap<ConnectionId, ConnectionRecord>,
}

impl InMemoryConnectionEngine {
    pub fn new(config: &AgentConfig, events: EventBus) -> Self {
        Self {
            label: config.label.clone(),
            endpoint: config.primary_endpoint().map(String::from),
            auto_accept: config.auto_accept_connections,
            events,
            invitations: DashMap::new(),
            connections: DashMap::new(),
        }
    }

    fn find_invitation(&self, invitation_id: &str) -> Option<OutOfBandId> {
        self.invitations
            .iter()
            .find(|e| e.record.invitation.id == invitation_id)
            .map(|e| e.key().clone())
    }

    /// A peer answered one of our invitations with a connection request.
    pub fn receive_request(
        &self,
        invitation_id: &str,
        their_label: Option<String>,
    ) -> Result<ConnectionRecord, EngineError> {
        let out_of_band_id = self
            .find_invitation(invitation_id)
            .ok_or_else(|| EngineError::UnknownInvitation(invitation_id.to_string()))?;

        {
            let mut entry = self
                .invitations
                .get_mut(&out_of_band_id)
                .ok_or_else(|| EngineError::UnknownInvitation(invitation_id.to_string()))?;
            if !entry.record.multi_use && entry.uses > 0 {
                return Err(EngineError::InvitationAlreadyUsed(out_of_band_id.to_string()));
            }
            entry.uses += 1;
        }

        let now = Utc::now();
        let record = ConnectionRecord {
            id: ConnectionId::new(uuid::Uuid::now_v7().to_string()),
            state: DidExchangeState::RequestReceived,
            out_of_band_id: Some(out_of_band_id.clone()),
            their_label,
            created_at: now,
            updated_at: now,
        };
        self.connections.insert(record.id.clone(), record.clone());

        tracing::debug!(
            connection_id = %record.id,
            %out_of_band_id,
            "connection request received"
        );
        self.publish(record.clone(), None);

        if self.auto_accept {
            return self.accept_request(&record.id);
        }
        Ok(record)
    }

    /// Answer a pending request with a response.
    pub fn accept_request(&self, id: &ConnectionId) -> Result<ConnectionRecord, EngineError> {
        self.transition(
            id,
            &[DidExchangeState::RequestReceived],
            DidExchangeState::ResponseSent,
        )
    }

    /// The peer acknowledged our response; the handshake is complete.
    pub fn receive_ack(&self, id: &ConnectionId) -> Result<ConnectionRecord, EngineError> {
        self.transition(
            id,
            &[DidExchangeState::ResponseSent],
            DidExchangeState::Completed,
        )
    }

    /// The peer gave up, or sent a problem report.
    pub fn abandon(&self, id: &ConnectionId) -> Result<ConnectionRecord, EngineError> {
        self.transition(
            id,
            &[
                DidExchangeState::RequestReceived,
                DidExchangeState::ResponseSent,
            ],
            DidExchangeState::Abandoned,
        )
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn transition(
        &self,
        id: &ConnectionId,
        allowed_from: &[DidExchangeState],
        to: DidExchangeState,
    ) -> Result<ConnectionRecord, EngineError> {
        let (record, previous) = {
            let mut entry = self
                .connections
                .get_mut(id)
                .ok_or_else(|| EngineError::ConnectionNotFound(id.clone()))?;
            let from = entry.state;
            if !allowed_from.contains(&from) {
                return Err(EngineError::InvalidConnectionTransition {
                    id: id.clone(),
                    from,
                    to,
                });
            }
            entry.state = to;
            entry.updated_at = Utc::now();
            (entry.clone(), from)
        };

        tracing::debug!(connection_id = %id, from = %previous, %to, "connection state changed");
        self.publish(record.clone(), Some(previous));
        Ok(record)
    }

    fn publish(&self, record: ConnectionRecord, previous_state: Option<DidExchangeState>) {
        self.events
            .emit(AgentEvent::ConnectionStateChanged(ConnectionStateChanged {
                connection_record: record,
                previous_state,
            }));
    }
}

#[async_trait]
impl ConnectionEngine for InMemoryConnectionEngine {
    async fn create_invitation(&self, multi_use: bool) -> Result<CreatedInvitation, EngineError> {
        let endpoint = self.endpoint.clone().ok_or(EngineError::NoEndpoint)?;

        let recipient_key = SigningKey::generate(&mut OsRng);
        let invitation = OutOfBandInvitation {
            id: uuid::Uuid::now_v7().to_string(),
            label: self.label.clone(),
            recipient_keys: vec![bs58::encode(recipient_key.verifying_key().as_bytes()).into_string()],
            service_endpoint: endpoint,
        };
        let record = OutOfBandRecord {
            id: OutOfBandId::new(uuid::Uuid::now_v7().to_string()),
            multi_use,
            invitation: invitation.clone(),
            created_at: Utc::now(),
        };

        self.invitations.insert(
            record.id.clone(),
            InvitationEntry {
                record: record.clone(),
                _recipient_key: recipient_key,
                uses: 0,
            },
        );

        tracing::debug!(out_of_band_id = %record.id, multi_use, "invitation created");
        Ok(CreatedInvitation {
            invitation,
            out_of_band_record: record,
        })
    }

    async fn connection(&self, id: &ConnectionId) -> Result<ConnectionRecord, EngineError> {
        self.connections
            .get(id)
            .map(|e| e.clone())
            .ok_or_else(|| EngineError::ConnectionNotFound(id.clone()))
    }
}
