//! Issuer Agent — in-process implementations of the services the issuance
//! flow talks to:
//! - key storage and signing ([`Wallet`])
//! - the verifiable data registry ([`Registry`])
//! - out-of-band invitations and the connection handshake ([`ConnectionEngine`])
//! - the issuer side of the credential exchange ([`CredentialEngine`])
//! - state-change notifications ([`EventBus`], [`NotificationSource`])

pub mod agent;
pub mod connection;
pub mod credential;
pub mod error;
pub mod events;
pub mod inbound;
pub mod registry;
pub mod wallet;

pub use agent::Agent;
pub use connection::{ConnectionEngine, CreatedInvitation, InMemoryConnectionEngine};
pub use credential::{CredentialEngine, InMemoryCredentialEngine, IssuedCredential};
pub use error::{EngineError, RegistryError, WalletError};
pub use events::{
    AgentEvent, ConnectionStateChanged, CredentialStateChanged, EventBus, NotificationSource,
};
pub use inbound::{InboundDispatcher, InboundMessage, InboundOutcome};
pub use registry::{
    CredentialDefinitionRegistration, CredentialDefinitionRegistrationResult, InMemoryRegistry,
    Registry, SchemaRegistration, SchemaRegistrationResult,
};
pub use wallet::{InMemoryWallet, Wallet};
