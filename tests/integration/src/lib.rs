//! Fixtures shared by the cross-crate issuance tests.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

use issuer_agent::{Agent, CredentialEngine, EngineError};
use issuer_core::{
    AgentConfig, AgentIdentity, CredentialAttribute, CredentialDefinitionRecord,
    CredentialExchangeId, CredentialExchangeRecord, CredentialOffer, Did, PrivateKeyMaterial,
    SchemaRecord,
};
use issuer_flow::{ArtifactRegistrar, IdentityBootstrapper};

pub const ISSUER_DID: &str = "did:indy:bcovrin:test:WUTE5T3VAPYS46ph5bLkUt";
pub const LEGACY_ISSUER: &str = "WUTE5T3VAPYS46ph5bLkUt";
pub const ISSUER_SEED: &str = "asdfasfasdfasdf00000000000000000";

/// An agent with the issuer identity imported and the `Name` schema and
/// `hello` credential definition registered.
pub struct RegisteredIssuer {
    pub agent: Agent,
    pub identity: AgentIdentity,
    pub schema: SchemaRecord,
    pub definition: CredentialDefinitionRecord,
}

pub async fn registered_issuer(config: AgentConfig) -> RegisteredIssuer {
    let agent = Agent::new(config).expect("open wallet");
    let identity = IdentityBootstrapper::new(agent.wallet().clone())
        .bootstrap(
            AgentIdentity::ed25519(Did::new(ISSUER_DID).expect("valid did")),
            &PrivateKeyMaterial::from_seed(ISSUER_SEED).expect("32 byte seed"),
        )
        .await
        .expect("bootstrap")
        .identity;

    let registrar = ArtifactRegistrar::new(agent.registry().clone());
    let schema = registrar
        .register_schema(&identity, "Name", "1.0", vec!["Name".into()])
        .await
        .expect("schema registration");
    let definition = registrar
        .register_credential_definition(&schema.schema_id, &identity, "hello")
        .await
        .expect("credential definition registration");

    RegisteredIssuer {
        agent,
        identity,
        schema,
        definition,
    }
}

pub fn offered_attributes() -> Vec<CredentialAttribute> {
    vec![CredentialAttribute::new("Name", "Berend Botje")]
}

/// Poll `condition` until it holds, panicking after two seconds.
pub async fn wait_until<F: Fn() -> bool>(what: &str, condition: F) {
    let result = tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    if result.is_err() {
        panic!("timed out waiting for {}", what);
    }
}

/// Credential engine that accepts every offer and keeps a copy.
#[derive(Default)]
pub struct RecordingEngine {
    offers: Mutex<Vec<CredentialOffer>>,
}

impl RecordingEngine {
    pub fn offers(&self) -> Vec<CredentialOffer> {
        self.offers.lock().expect("offers lock").clone()
    }
}

#[async_trait]
impl CredentialEngine for RecordingEngine {
    async fn offer_credential(
        &self,
        offer: CredentialOffer,
    ) -> Result<CredentialExchangeId, EngineError> {
        let mut offers = self.offers.lock().expect("offers lock");
        offers.push(offer);
        Ok(CredentialExchangeId::new(format!("exchange-{}", offers.len())))
    }

    async fn exchange(
        &self,
        id: &CredentialExchangeId,
    ) -> Result<CredentialExchangeRecord, EngineError> {
        Err(EngineError::ExchangeNotFound(id.clone()))
    }
}
