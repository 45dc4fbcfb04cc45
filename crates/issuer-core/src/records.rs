//! Records the agent keeps about registry artifacts and protocol instances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::connection_state::DidExchangeState;
use crate::credential_state::CredentialExchangeState;
use crate::invitation::OutOfBandInvitation;
use crate::types::{
    ConnectionId, CredentialAttribute, CredentialDefinitionId, CredentialExchangeId, Did,
    OutOfBandId, SchemaId,
};

/// Outcome of a registry write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationState {
    /// Submitted but not yet committed.
    Pending,
    /// Committed; the artifact can be referenced.
    Finished,
    /// Rejected; see the accompanying reason.
    Failed,
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Finished => write!(f, "finished"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A schema as registered on the verifiable data registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRecord {
    pub schema_id: SchemaId,
    pub issuer_id: Did,
    pub name: String,
    pub version: String,
    /// Attribute names, in declaration order.
    pub attribute_names: Vec<String>,
    pub state: RegistrationState,
    /// Ledger sequence number assigned on commit.
    pub seq_no: Option<u64>,
}

impl SchemaRecord {
    pub fn is_finished(&self) -> bool {
        self.state == RegistrationState::Finished
    }
}

/// A credential definition bound to a schema and an issuer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDefinitionRecord {
    pub credential_definition_id: CredentialDefinitionId,
    pub schema_id: SchemaId,
    pub issuer_id: Did,
    pub tag: String,
    pub state: RegistrationState,
}

impl CredentialDefinitionRecord {
    pub fn is_finished(&self) -> bool {
        self.state == RegistrationState::Finished
    }
}

/// Local record of an out-of-band invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfBandRecord {
    pub id: OutOfBandId,
    pub multi_use: bool,
    pub invitation: OutOfBandInvitation,
    pub created_at: DateTime<Utc>,
}

/// One peer connection. Only the connection engine mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub id: ConnectionId,
    pub state: DidExchangeState,
    /// The invitation this connection was created from.
    pub out_of_band_id: Option<OutOfBandId>,
    pub their_label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One offer-to-issuance lifecycle. Only the credential engine mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialExchangeRecord {
    pub id: CredentialExchangeId,
    pub connection_id: ConnectionId,
    pub state: CredentialExchangeState,
    pub credential_definition_id: CredentialDefinitionId,
    pub attributes: Vec<CredentialAttribute>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_state_serde() {
        let json = serde_json::to_string(&RegistrationState::Finished).unwrap();
        assert_eq!(json, "\"finished\"");
        assert_eq!(format!("{}", RegistrationState::Pending), "pending");
    }

    #[test]
    fn test_schema_record_finished() {
        let mut record = SchemaRecord {
            schema_id: SchemaId::new("s1"),
            issuer_id: Did::new("did:indy:test:abc").unwrap(),
            name: "Name".into(),
            version: "1.0".into(),
            attribute_names: vec!["Name".into()],
            state: RegistrationState::Pending,
            seq_no: None,
        };
        assert!(!record.is_finished());
        record.state = RegistrationState::Finished;
        assert!(record.is_finished());
    }
}
