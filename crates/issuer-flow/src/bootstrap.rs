//! Binds the issuer identity to its key in the wallet.

use std::sync::Arc;

use issuer_agent::Wallet;
use issuer_core::{AgentIdentity, PrivateKeyMaterial};

use crate::error::FlowError;

/// An identity whose key is now held by the wallet.
#[derive(Debug, Clone)]
pub struct BootstrappedIdentity {
    pub identity: AgentIdentity,
    /// Base58 public key the wallet derived from the imported secret.
    pub verkey: String,
}

pub struct IdentityBootstrapper {
    wallet: Arc<dyn Wallet>,
}

impl IdentityBootstrapper {
    pub fn new(wallet: Arc<dyn Wallet>) -> Self {
        Self { wallet }
    }

    /// Import the key for `identity`, replacing any existing binding.
    pub async fn bootstrap(
        &self,
        identity: AgentIdentity,
        private_key: &PrivateKeyMaterial,
    ) -> Result<BootstrappedIdentity, FlowError> {
        let verkey = self
            .wallet
            .import_key(&identity.did, identity.key_type, private_key, true)
            .await
            .map_err(FlowError::IdentityImport)?;

        tracing::info!(did = %identity.did, %verkey, "identity imported");
        Ok(BootstrappedIdentity { identity, verkey })
    }
}
