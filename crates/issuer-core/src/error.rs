use crate::credential_state::CredentialExchangeState;

/// Core domain errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid credential exchange transition from {from} to {to}")]
    InvalidStateTransition {
        from: CredentialExchangeState,
        to: CredentialExchangeState,
    },

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("invalid DID format: {0}")]
    InvalidDid(String),

    #[error("invalid key material: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid credential definition id: {0}")]
    InvalidCredentialDefinitionId(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
