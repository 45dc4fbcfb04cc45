use issuer_core::{
    ConnectionId, CoreError, CredentialExchangeId, CredentialExchangeState, DidExchangeState,
};

/// Key storage errors.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("a key is already bound to {0}; import with overwrite to replace it")]
    DuplicateKey(String),

    #[error("no key bound to {0}")]
    KeyNotFound(String),

    #[error("wallet {0} cannot be opened without a wallet key")]
    MissingWalletKey(String),
}

/// Verifiable data registry transport errors.
///
/// A write the registry rejects is not an error: it comes back as a result
/// in the `failed` state. These cover the registry being unreachable.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Connection and credential protocol engine errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown invitation: {0}")]
    UnknownInvitation(String),

    #[error("single-use invitation {0} has already been used")]
    InvitationAlreadyUsed(String),

    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    #[error("connection {id} is not ready (state {state})")]
    ConnectionNotReady {
        id: ConnectionId,
        state: DidExchangeState,
    },

    #[error("connection {id} cannot move from {from} to {to}")]
    InvalidConnectionTransition {
        id: ConnectionId,
        from: DidExchangeState,
        to: DidExchangeState,
    },

    #[error("credential exchange not found: {0}")]
    ExchangeNotFound(CredentialExchangeId),

    #[error("credential exchange {id} is in state {state}")]
    UnexpectedExchangeState {
        id: CredentialExchangeId,
        state: CredentialExchangeState,
    },

    #[error("malformed credential definition id: {0}")]
    MalformedCredentialDefinitionId(String),

    #[error("unknown or unfinished credential definition: {0}")]
    UnknownCredentialDefinition(String),

    #[error("credential offer has no attributes")]
    EmptyOffer,

    #[error("agent has no endpoint configured")]
    NoEndpoint,

    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),
}
