use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CoreError;

/// Decentralized Identifier.
/// Format: `did:<method>:<method-specific-id>`, where the method-specific
/// part may itself contain `:` separated segments (`did:indy:bcovrin:test:...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Did(pub String);

impl Did {
    /// Create a new DID from a full URI string.
    pub fn new(uri: impl Into<String>) -> Result<Self, CoreError> {
        let uri = uri.into();
        if !uri.starts_with("did:") {
            return Err(CoreError::InvalidDid(format!(
                "DID must start with 'did:', got: {}",
                uri
            )));
        }
        let parts: Vec<&str> = uri.split(':').collect();
        if parts.len() < 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(CoreError::InvalidDid(format!(
                "DID must have format 'did:<method>:<identifier>', got: {}",
                uri
            )));
        }
        Ok(Self(uri))
    }

    /// Get the full DID URI.
    pub fn uri(&self) -> &str {
        &self.0
    }

    /// Extract the method (indy, sov, key, ...).
    pub fn method(&self) -> Option<&str> {
        self.0.split(':').nth(1)
    }

    /// Everything after `did:<method>:`.
    pub fn identifier(&self) -> Option<&str> {
        let parts: Vec<&str> = self.0.splitn(3, ':').collect();
        parts.get(2).copied()
    }

    /// The unqualified identifier used by legacy Indy identifiers: the last
    /// `:` separated segment.
    pub fn legacy_identifier(&self) -> &str {
        self.0.rsplit(':').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supported key types for imported identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    Ed25519,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519 => write!(f, "ed25519"),
        }
    }
}

/// The issuing agent's identity: a DID and the type of key bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub did: Did,
    pub key_type: KeyType,
}

impl AgentIdentity {
    pub fn ed25519(did: Did) -> Self {
        Self {
            did,
            key_type: KeyType::Ed25519,
        }
    }
}

/// Raw Ed25519 secret key bytes. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKeyMaterial([u8; 32]);

impl PrivateKeyMaterial {
    pub const LENGTH: usize = 32;

    /// Create from raw secret bytes (exactly 32).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::InvalidKeyLength {
                expected: Self::LENGTH,
                actual: bytes.len(),
            })?;
        Ok(Self(arr))
    }

    /// Use the UTF-8 bytes of a 32 character seed as the secret key.
    pub fn from_seed(seed: &str) -> Result<Self, CoreError> {
        Self::from_bytes(seed.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKeyMaterial(<redacted>)")
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// Registry-assigned schema identifier.
    SchemaId
);
string_id!(
    /// Registry-assigned credential definition identifier.
    CredentialDefinitionId
);
string_id!(
    /// Identifier of an out-of-band record; the correlation key for connections.
    OutOfBandId
);
string_id!(ConnectionId);
string_id!(CredentialExchangeId);

impl CredentialDefinitionId {
    /// Convert `<did>/anoncreds/v0/CLAIM_DEF/<schemaSeqNo>/<tag>` into the
    /// legacy Indy form `<legacyIssuer>:3:CL:<schemaSeqNo>:<tag>`.
    pub fn to_legacy(&self, legacy_issuer: &str) -> Result<CredentialDefinitionId, CoreError> {
        let parts: Vec<&str> = self.0.split('/').collect();
        match parts.as_slice() {
            [_did, "anoncreds", "v0", "CLAIM_DEF", seq_no, tag]
                if !seq_no.is_empty() && !tag.is_empty() =>
            {
                Ok(CredentialDefinitionId(format!(
                    "{}:3:CL:{}:{}",
                    legacy_issuer, seq_no, tag
                )))
            }
            _ => Err(CoreError::InvalidCredentialDefinitionId(self.0.clone())),
        }
    }

    /// Whether the id has either the qualified AnonCreds or the legacy shape.
    pub fn is_well_formed(&self) -> bool {
        let qualified = {
            let parts: Vec<&str> = self.0.split('/').collect();
            parts.len() == 6
                && parts[1] == "anoncreds"
                && parts[3] == "CLAIM_DEF"
                && parts.iter().all(|p| !p.is_empty())
        };
        let legacy = {
            let parts: Vec<&str> = self.0.split(':').collect();
            parts.len() == 5 && parts[1] == "3" && parts[2] == "CL"
        };
        qualified || legacy
    }
}

/// A single name/value pair in a credential offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialAttribute {
    pub name: String,
    pub value: String,
}

impl CredentialAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for CredentialAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Credential exchange protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    #[default]
    V1,
    V2,
}

/// What the issuer sends to a connection to start a credential exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialOffer {
    pub connection_id: ConnectionId,
    pub credential_definition_id: CredentialDefinitionId,
    pub protocol_version: ProtocolVersion,
    pub attributes: Vec<CredentialAttribute>,
}
