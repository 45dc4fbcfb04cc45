//! The issuer node: runs the startup sequence, then serves peers while the
//! orchestrator offers credentials.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;

use issuer_agent::Agent;
use issuer_core::{AgentIdentity, Did, PrivateKeyMaterial};
use issuer_flow::{
    ArtifactRegistrar, IdentityBootstrapper, InvitationHandle, InvitationIssuer,
    InvitationOptions, IssuanceOrchestrator, IssuanceSettings,
};

use crate::api::{self, NodeState};
use crate::config::IssuerConfig;

pub struct IssuerNode {
    config: IssuerConfig,
    agent: Agent,
    invitation: Option<InvitationHandle>,
    orchestrator: Option<IssuanceOrchestrator>,
}

impl IssuerNode {
    pub fn new(config: IssuerConfig) -> Result<Self> {
        let agent = Agent::new(config.agent_config()).context("opening wallet")?;
        Ok(Self {
            config,
            agent,
            invitation: None,
            orchestrator: None,
        })
    }

    /// Bootstrap, register, invite, then start watching and serving.
    ///
    /// Every step before the watchers is fatal on failure.
    pub async fn start(&mut self) -> Result<()> {
        let did = Did::new(self.config.issuer.did.as_str()).context("issuer DID")?;
        let key = PrivateKeyMaterial::from_seed(&self.config.issuer.seed).context("issuer seed")?;
        let identity = IdentityBootstrapper::new(self.agent.wallet().clone())
            .bootstrap(AgentIdentity::ed25519(did), &key)
            .await?
            .identity;

        let registrar = ArtifactRegistrar::new(self.agent.registry().clone());
        let schema = registrar
            .register_schema(
                &identity,
                &self.config.schema.name,
                &self.config.schema.version,
                self.config.schema.attributes.clone(),
            )
            .await?;
        let definition = registrar
            .register_credential_definition(&schema.schema_id, &identity, &self.config.credential.tag)
            .await?;

        let issuer = InvitationIssuer::new(
            self.agent.connections().clone(),
            InvitationOptions {
                domain: self.config.invitation.domain.clone(),
                use_did_sov_prefix: self.config.invitation.use_did_sov_prefix,
            },
        );
        let invitation = issuer
            .create_invitation(self.config.invitation.multi_use)
            .await?;

        let settings = IssuanceSettings {
            credential_definition_id: definition.credential_definition_id,
            attributes: self.config.credential.attributes.clone(),
            protocol_version: self.config.credential.protocol_version,
            legacy_issuer: self
                .config
                .credential
                .legacy_identifiers
                .then(|| identity.did.legacy_identifier().to_string()),
        };
        let (orchestrator, mut completed) = IssuanceOrchestrator::new(
            self.agent.credentials().clone(),
            Arc::new(self.agent.events().clone()),
            settings,
        )?;
        orchestrator.start(invitation.out_of_band_id());

        tokio::spawn(async move {
            while let Some(done) = completed.recv().await {
                tracing::info!(
                    exchange_id = %done.exchange_id,
                    connection_id = %done.connection_id,
                    "Done!"
                );
            }
        });

        let listen_addr = self.config.listen_socket_addr()?;
        let listener = TcpListener::bind(listen_addr)
            .await
            .with_context(|| format!("binding inbound endpoint on {}", listen_addr))?;
        let state = Arc::new(NodeState {
            inbound: self.agent.inbound().clone(),
        });
        tokio::spawn(async move {
            if let Err(e) = api::serve(listener, state).await {
                tracing::error!(error = %e, "inbound endpoint error");
            }
        });

        println!("Invitation URL:\n{}", invitation.url);

        self.orchestrator = Some(orchestrator);
        self.invitation = Some(invitation);
        Ok(())
    }

    pub fn invitation(&self) -> Option<&InvitationHandle> {
        self.invitation.as_ref()
    }

    pub fn shutdown(&self) {
        if let Some(orchestrator) = &self.orchestrator {
            orchestrator.shutdown();
        }
        tracing::info!("issuer node stopped");
    }
}
