//! Issuer Core — domain types, protocol state sets and configuration for the
//! issuing agent.

pub mod config;
pub mod connection_state;
pub mod credential_state;
pub mod error;
pub mod invitation;
pub mod records;
pub mod types;

pub use config::{AgentConfig, AutoAcceptCredential, DidCommMimeType};
pub use connection_state::{DidExchangeState, Readiness};
pub use credential_state::{
    CredentialExchangeEvent, CredentialExchangeState, CredentialExchangeStateMachine,
};
pub use error::CoreError;
pub use invitation::OutOfBandInvitation;
pub use records::{
    ConnectionRecord, CredentialDefinitionRecord, CredentialExchangeRecord, OutOfBandRecord,
    RegistrationState, SchemaRecord,
};
pub use types::{
    AgentIdentity, ConnectionId, CredentialAttribute, CredentialDefinitionId,
    CredentialExchangeId, CredentialOffer, Did, KeyType, OutOfBandId, PrivateKeyMaterial,
    ProtocolVersion, SchemaId,
};
