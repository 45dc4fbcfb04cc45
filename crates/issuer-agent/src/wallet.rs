//! Key storage and signing.

use async_trait::async_trait;
use dashmap::DashMap;
use ed25519_dalek::{Signer, SigningKey};

use issuer_core::{Did, KeyType, PrivateKeyMaterial};

use crate::error::WalletError;

/// Binds DIDs to private keys and signs on their behalf.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Import a private key for `did`. Returns the base58 verification key.
    ///
    /// With `overwrite` an existing binding for the same DID is replaced;
    /// without it, importing over an existing binding fails.
    async fn import_key(
        &self,
        did: &Did,
        key_type: KeyType,
        private_key: &PrivateKeyMaterial,
        overwrite: bool,
    ) -> Result<String, WalletError>;

    /// Base58 verification key bound to `did`.
    async fn public_key(&self, did: &Did) -> Result<String, WalletError>;

    /// Sign `message` with the key bound to `did`.
    async fn sign(&self, did: &Did, message: &[u8]) -> Result<Vec<u8>, WalletError>;
}

/// Wallet that keeps Ed25519 keys in memory for the lifetime of the process.
pub struct InMemoryWallet {
    id: String,
    keys: DashMap<String, SigningKey>,
}

impl InMemoryWallet {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            keys: DashMap::new(),
        }
    }

    /// Open the wallet `id` with its key. The key may not be blank.
    pub fn open(id: impl Into<String>, key: &str) -> Result<Self, WalletError> {
        let id = id.into();
        if key.trim().is_empty() {
            return Err(WalletError::MissingWalletKey(id));
        }
        Ok(Self::new(id))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn contains(&self, did: &Did) -> bool {
        self.keys.contains_key(did.uri())
    }

    pub fn count(&self) -> usize {
        self.keys.len()
    }
}

#[async_trait]
impl Wallet for InMemoryWallet {
    async fn import_key(
        &self,
        did: &Did,
        key_type: KeyType,
        private_key: &PrivateKeyMaterial,
        overwrite: bool,
    ) -> Result<String, WalletError> {
        match key_type {
            KeyType::Ed25519 => {}
        }

        if !overwrite && self.keys.contains_key(did.uri()) {
            return Err(WalletError::DuplicateKey(did.to_string()));
        }

        let signing_key = SigningKey::from_bytes(private_key.as_bytes());
        let verkey = bs58::encode(signing_key.verifying_key().as_bytes()).into_string();
        self.keys.insert(did.uri().to_string(), signing_key);

        tracing::debug!(wallet = %self.id, %did, %verkey, "key imported");
        Ok(verkey)
    }

    async fn public_key(&self, did: &Did) -> Result<String, WalletError> {
        self.keys
            .get(did.uri())
            .map(|k| bs58::encode(k.verifying_key().as_bytes()).into_string())
            .ok_or_else(|| WalletError::KeyNotFound(did.to_string()))
    }

    async fn sign(&self, did: &Did, message: &[u8]) -> Result<Vec<u8>, WalletError> {
        let key = self
            .keys
            .get(did.uri())
            .ok_or_else(|| WalletError::KeyNotFound(did.to_string()))?;
        Ok(key.sign(message).to_bytes().to_vec())
    }
}
