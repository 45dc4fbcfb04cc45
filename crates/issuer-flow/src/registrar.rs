//! Schema and credential definition registration.
//!
//! Both operations wait for the registry to answer and accept only a
//! `finished` result. Anything else is returned as a fatal error; there is
//! no retry.

use std::sync::Arc;

use issuer_agent::{CredentialDefinitionRegistration, Registry, SchemaRegistration};
use issuer_core::{
    AgentIdentity, CredentialDefinitionRecord, RegistrationState, SchemaId, SchemaRecord,
};

use crate::error::FlowError;

pub struct ArtifactRegistrar {
    registry: Arc<dyn Registry>,
}

impl ArtifactRegistrar {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }

    pub async fn register_schema(
        &self,
        identity: &AgentIdentity,
        name: &str,
        version: &str,
        attribute_names: Vec<String>,
    ) -> Result<SchemaRecord, FlowError> {
        let result = self
            .registry
            .register_schema(SchemaRegistration {
                issuer_id: identity.did.clone(),
                name: name.to_string(),
                version: version.to_string(),
                attribute_names,
            })
            .await?;

        match (result.state, result.schema) {
            (RegistrationState::Finished, Some(schema)) if !schema.schema_id.is_empty() => {
                tracing::info!(
                    schema_id = %schema.schema_id,
                    name,
                    version,
                    "schema registered"
                );
                Ok(schema)
            }
            (state, _) => Err(FlowError::SchemaRegistration(format!(
                "registry returned state {}: {}",
                state,
                result.reason.as_deref().unwrap_or("no reason given")
            ))),
        }
    }

    pub async fn register_credential_definition(
        &self,
        schema_id: &SchemaId,
        identity: &AgentIdentity,
        tag: &str,
    ) -> Result<CredentialDefinitionRecord, FlowError> {
        let result = self
            .registry
            .register_credential_definition(CredentialDefinitionRegistration {
                schema_id: schema_id.clone(),
                issuer_id: identity.did.clone(),
                tag: tag.to_string(),
            })
            .await?;

        match (result.state, result.credential_definition) {
            (RegistrationState::Finished, Some(definition))
                if !definition.credential_definition_id.is_empty() =>
            {
                tracing::info!(
                    credential_definition_id = %definition.credential_definition_id,
                    %schema_id,
                    tag,
                    "credential definition registered"
                );
                Ok(definition)
            }
            (state, _) => Err(FlowError::CredentialDefinitionRegistration(format!(
                "registry returned state {}: {}",
                state,
                result.reason.as_deref().unwrap_or("no reason given")
            ))),
        }
    }
}
