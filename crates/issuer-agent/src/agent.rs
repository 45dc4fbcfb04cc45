//! The in-process agent: one wallet, one registry, the protocol engines and
//! the event bus they publish on.

use std::sync::Arc;

use issuer_core::AgentConfig;

use crate::connection::InMemoryConnectionEngine;
use crate::credential::InMemoryCredentialEngine;
use crate::error::WalletError;
use crate::events::EventBus;
use crate::inbound::InboundDispatcher;
use crate::registry::InMemoryRegistry;
use crate::wallet::InMemoryWallet;

pub struct Agent {
    config: AgentConfig,
    wallet: Arc<InMemoryWallet>,
    registry: Arc<InMemoryRegistry>,
    events: EventBus,
    connections: Arc<InMemoryConnectionEngine>,
    credentials: Arc<InMemoryCredentialEngine>,
    inbound: InboundDispatcher,
}

impl Agent {
    /// Fails only when the wallet cannot be opened.
    pub fn new(config: AgentConfig) -> Result<Self, WalletError> {
        let events = EventBus::new();
        let wallet = Arc::new(InMemoryWallet::open(
            config.wallet_id.clone(),
            &config.wallet_key,
        )?);
        let registry = Arc::new(InMemoryRegistry::new(wallet.clone()));
        let connections = Arc::new(InMemoryConnectionEngine::new(&config, events.clone()));
        let credentials = Arc::new(InMemoryCredentialEngine::new(
            wallet.clone(),
            registry.clone(),
            connections.clone(),
            config.auto_accept_credentials,
            events.clone(),
        ));
        let inbound = InboundDispatcher::new(connections.clone(), credentials.clone());

        tracing::info!(
            label = %config.label,
            wallet = %config.wallet_id,
            endpoints = ?config.endpoints,
            mime_type = config.did_comm_mime_type.as_str(),
            "agent initialized"
        );

        Ok(Self {
            config,
            wallet,
            registry,
            events,
            connections,
            credentials,
            inbound,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn wallet(&self) -> &Arc<InMemoryWallet> {
        &self.wallet
    }

    pub fn registry(&self) -> &Arc<InMemoryRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn connections(&self) -> &Arc<InMemoryConnectionEngine> {
        &self.connections
    }

    pub fn credentials(&self) -> &Arc<InMemoryCredentialEngine> {
        &self.credentials
    }

    pub fn inbound(&self) -> &InboundDispatcher {
        &self.inbound
    }
}
