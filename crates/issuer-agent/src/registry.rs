//! Verifiable data registry: schemas and credential definitions.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use issuer_core::{
    CredentialDefinitionId, CredentialDefinitionRecord, Did, RegistrationState, SchemaId,
    SchemaRecord,
};

use crate::error::RegistryError;
use crate::wallet::Wallet;

/// A schema write request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRegistration {
    pub issuer_id: Did,
    pub name: String,
    pub version: String,
    pub attribute_names: Vec<String>,
}

/// A credential definition write request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialDefinitionRegistration {
    pub schema_id: SchemaId,
    pub issuer_id: Did,
    pub tag: String,
}

/// What the registry reports back for a schema write.
#[derive(Debug, Clone)]
pub struct SchemaRegistrationResult {
    pub state: RegistrationState,
    pub schema_id: Option<SchemaId>,
    pub schema: Option<SchemaRecord>,
    /// Why the write failed, when `state` is `Failed`.
    pub reason: Option<String>,
}

/// What the registry reports back for a credential definition write.
#[derive(Debug, Clone)]
pub struct CredentialDefinitionRegistrationResult {
    pub state: RegistrationState,
    pub credential_definition_id: Option<CredentialDefinitionId>,
    pub credential_definition: Option<CredentialDefinitionRecord>,
    pub reason: Option<String>,
}

impl SchemaRegistrationResult {
    fn failed(reason: impl Into<String>) -> Self {
        Self {
            state: RegistrationState::Failed,
            schema_id: None,
            schema: None,
            reason: Some(reason.into()),
        }
    }
}

impl CredentialDefinitionRegistrationResult {
    fn failed(reason: impl Into<String>) -> Self {
        Self {
            state: RegistrationState::Failed,
            credential_definition_id: None,
            credential_definition: None,
            reason: Some(reason.into()),
        }
    }
}

/// Registry client interface.
///
/// `Err` means the registry could not be reached; a rejected write is an
/// `Ok` result in the `Failed` state.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn register_schema(
        &self,
        registration: SchemaRegistration,
    ) -> Result<SchemaRegistrationResult, RegistryError>;

    async fn register_credential_definition(
        &self,
        registration: CredentialDefinitionRegistration,
    ) -> Result<CredentialDefinitionRegistrationResult, RegistryError>;
}

/// In-memory ledger. Writes are signed with the issuer's wallet key, so an
/// issuer without an imported key cannot register anything.
pub struct InMemoryRegistry {
    wallet: Arc<dyn Wallet>,
    schemas: DashMap<String, SchemaRecord>,
    credential_definitions: DashMap<String, CredentialDefinitionRecord>,
    next_seq_no: AtomicU64,
}

impl InMemoryRegistry {
    pub fn new(wallet: Arc<dyn Wallet>) -> Self {
        Self {
            wallet,
            schemas: DashMap::new(),
            credential_definitions: DashMap::new(),
            next_seq_no: AtomicU64::new(1),
        }
    }

    fn schema_id_for(registration: &SchemaRegistration) -> SchemaId {
        SchemaId::new(format!(
            "{}/anoncreds/v0/SCHEMA/{}/{}",
            registration.issuer_id, registration.name, registration.version
        ))
    }

    fn pending_schema(registration: SchemaRegistration) -> SchemaRecord {
        SchemaRecord {
            schema_id: Self::schema_id_for(&registration),
            issuer_id: registration.issuer_id,
            name: registration.name,
            version: registration.version,
            attribute_names: registration.attribute_names,
            state: RegistrationState::Pending,
            seq_no: None,
        }
    }

    /// Record a schema write that has been submitted but not committed.
    pub fn stage_schema(&self, registration: SchemaRegistration) -> SchemaRecord {
        let record = Self::pending_schema(registration);
        self.schemas
            .insert(record.schema_id.as_str().to_string(), record.clone());
        record
    }

    /// Stage a schema only if its id is free. Returns `false` when taken.
    fn claim_schema(&self, registration: SchemaRegistration) -> bool {
        let record = Self::pending_schema(registration);
        match self.schemas.entry(record.schema_id.as_str().to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    /// Commit a staged schema, assigning its ledger sequence number.
    pub fn commit_schema(&self, schema_id: &SchemaId) -> Option<SchemaRecord> {
        let mut entry = self.schemas.get_mut(schema_id.as_str())?;
        if entry.state == RegistrationState::Pending {
            entry.state = RegistrationState::Finished;
            entry.seq_no = Some(self.next_seq_no.fetch_add(1, Ordering::SeqCst));
        }
        Some(entry.clone())
    }

    pub fn schema(&self, schema_id: &SchemaId) -> Option<SchemaRecord> {
        self.schemas.get(schema_id.as_str()).map(|e| e.clone())
    }

    /// Look up a credential definition by its qualified id or its legacy form.
    pub fn credential_definition(
        &self,
        id: &CredentialDefinitionId,
    ) -> Option<CredentialDefinitionRecord> {
        if let Some(record) = self.credential_definitions.get(id.as_str()) {
            return Some(record.clone());
        }
        self.credential_definitions
            .iter()
            .find(|e| {
                e.credential_definition_id
                    .to_legacy(e.issuer_id.legacy_identifier())
                    .map(|legacy| &legacy == id)
                    .unwrap_or(false)
            })
            .map(|e| e.value().clone())
    }

    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    pub fn credential_definition_count(&self) -> usize {
        self.credential_definitions.len()
    }
}

#[async_trait]
impl Registry for InMemoryRegistry {
    async fn register_schema(
        &self,
        registration: SchemaRegistration,
    ) -> Result<SchemaRegistrationResult, RegistryError> {
        if registration.attribute_names.is_empty() {
            return Ok(SchemaRegistrationResult::failed(
                "schema must declare at least one attribute",
            ));
        }

        let payload = serde_json::to_vec(&registration)?;
        if let Err(e) = self.wallet.sign(&registration.issuer_id, &payload).await {
            return Ok(SchemaRegistrationResult::failed(format!(
                "cannot sign schema: {}",
                e
            )));
        }

        let schema_id = Self::schema_id_for(&registration);
        let (name, version) = (registration.name.clone(), registration.version.clone());
        if !self.claim_schema(registration) {
            return Ok(SchemaRegistrationResult::failed(format!(
                "schema {} version {} already exists",
                name, version
            )));
        }
        let record = self
            .commit_schema(&schema_id)
            .ok_or_else(|| RegistryError::Unavailable("schema vanished during commit".into()))?;

        tracing::info!(
            schema_id = %record.schema_id,
            seq_no = ?record.seq_no,
            "schema committed"
        );

        Ok(SchemaRegistrationResult {
            state: RegistrationState::Finished,
            schema_id: Some(schema_id),
            schema: Some(record),
            reason: None,
        })
    }

    async fn register_credential_definition(
        &self,
        registration: CredentialDefinitionRegistration,
    ) -> Result<CredentialDefinitionRegistrationResult, RegistryError> {
        let schema = match self.schema(&registration.schema_id) {
            Some(s) => s,
            None => {
                return Ok(CredentialDefinitionRegistrationResult::failed(format!(
                    "schema not found: {}",
                    registration.schema_id
                )))
            }
        };
        let seq_no = match (schema.state, schema.seq_no) {
            (RegistrationState::Finished, Some(n)) => n,
            _ => {
                return Ok(CredentialDefinitionRegistrationResult::failed(format!(
                    "schema {} is {}, not finished",
                    schema.schema_id, schema.state
                )))
            }
        };

        let id = CredentialDefinitionId::new(format!(
            "{}/anoncreds/v0/CLAIM_DEF/{}/{}",
            registration.issuer_id, seq_no, registration.tag
        ));
        let payload = serde_json::to_vec(&registration)?;
        if let Err(e) = self.wallet.sign(&registration.issuer_id, &payload).await {
            return Ok(CredentialDefinitionRegistrationResult::failed(format!(
                "cannot sign credential definition: {}",
                e
            )));
        }

        let record = CredentialDefinitionRecord {
            credential_definition_id: id.clone(),
            schema_id: registration.schema_id,
            issuer_id: registration.issuer_id,
            tag: registration.tag,
            state: RegistrationState::Finished,
        };
        match self.credential_definitions.entry(id.as_str().to_string()) {
            Entry::Occupied(_) => {
                return Ok(CredentialDefinitionRegistrationResult::failed(format!(
                    "credential definition with tag {} already exists for schema {}",
                    record.tag, record.schema_id
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
            }
        }

        tracing::info!(credential_definition_id = %id, "credential definition committed");

        Ok(CredentialDefinitionRegistrationResult {
            state: RegistrationState::Finished,
            credential_definition_id: Some(id),
            credential_definition: Some(record),
            reason: None,
        })
    }
}
