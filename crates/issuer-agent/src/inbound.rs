//! Inbound messages from peers, routed to the protocol engines.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use issuer_core::{ConnectionId, CredentialExchangeId, CredentialExchangeState, DidExchangeState};

use crate::connection::InMemoryConnectionEngine;
use crate::credential::InMemoryCredentialEngine;
use crate::error::EngineError;

/// A peer message, already unpacked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    ConnectionRequest {
        invitation_id: String,
        #[serde(default)]
        label: Option<String>,
    },
    ConnectionAck {
        connection_id: ConnectionId,
    },
    CredentialRequest {
        exchange_id: CredentialExchangeId,
    },
    CredentialAck {
        exchange_id: CredentialExchangeId,
    },
    CredentialDecline {
        exchange_id: CredentialExchangeId,
    },
    ProblemReport {
        exchange_id: CredentialExchangeId,
        description: String,
    },
}

/// What handling an inbound message did.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum InboundOutcome {
    Connection {
        id: ConnectionId,
        state: DidExchangeState,
    },
    CredentialExchange {
        id: CredentialExchangeId,
        state: CredentialExchangeState,
    },
}

/// Routes inbound messages to the engine that owns the protocol.
#[derive(Clone)]
pub struct InboundDispatcher {
    connections: Arc<InMemoryConnectionEngine>,
    credentials: Arc<InMemoryCredentialEngine>,
}

impl InboundDispatcher {
    pub fn new(
        connections: Arc<InMemoryConnectionEngine>,
        credentials: Arc<InMemoryCredentialEngine>,
    ) -> Self {
        Self {
            connections,
            credentials,
        }
    }

    pub async fn dispatch(&self, message: InboundMessage) -> Result<InboundOutcome, EngineError> {
        tracing::trace!(?message, "inbound message");
        let outcome = match message {
            InboundMessage::ConnectionRequest {
                invitation_id,
                label,
            } => {
                let r = self.connections.receive_request(&invitation_id, label)?;
                InboundOutcome::Connection {
                    id: r.id,
                    state: r.state,
                }
            }
            InboundMessage::ConnectionAck { connection_id } => {
                let r = self.connections.receive_ack(&connection_id)?;
                InboundOutcome::Connection {
                    id: r.id,
                    state: r.state,
                }
            }
            InboundMessage::CredentialRequest { exchange_id } => {
                let r = self.credentials.receive_request(&exchange_id).await?;
                InboundOutcome::CredentialExchange {
                    id: r.id,
                    state: r.state,
                }
            }
            InboundMessage::CredentialAck { exchange_id } => {
                let r = self.credentials.receive_ack(&exchange_id)?;
                InboundOutcome::CredentialExchange {
                    id: r.id,
                    state: r.state,
                }
            }
            InboundMessage::CredentialDecline { exchange_id } => {
                let r = self.credentials.receive_decline(&exchange_id)?;
                InboundOutcome::CredentialExchange {
                    id: r.id,
                    state: r.state,
                }
            }
            InboundMessage::ProblemReport {
                exchange_id,
                description,
            } => {
                let r = self
                    .credentials
                    .receive_problem_report(&exchange_id, &description)?;
                InboundOutcome::CredentialExchange {
                    id: r.id,
                    state: r.state,
                }
            }
        };
        Ok(outcome)
    }
}
