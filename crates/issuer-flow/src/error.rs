use issuer_agent::{EngineError, RegistryError, WalletError};
use issuer_core::CoreError;

/// Orchestration errors.
///
/// The first three are fatal at startup; nothing downstream runs once one
/// of them is returned.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("identity import failed: {0}")]
    IdentityImport(#[source] WalletError),

    #[error("schema registration failed: {0}")]
    SchemaRegistration(String),

    #[error("credential definition registration failed: {0}")]
    CredentialDefinitionRegistration(String),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}
