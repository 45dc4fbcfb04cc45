use serde::{Deserialize, Serialize};

/// When the agent answers credential protocol messages without asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AutoAcceptCredential {
    /// Accept every step.
    Always,
    /// Accept a request only if it matches what we offered.
    #[default]
    ContentApproved,
    /// Never continue automatically.
    Never,
}

/// Media type used for packed DIDComm messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DidCommMimeType {
    /// `application/ssi-agent-wire`, understood by older agents.
    #[default]
    V0,
    /// `application/didcomm-envelope-enc`.
    V1,
}

impl DidCommMimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V0 => "application/ssi-agent-wire",
            Self::V1 => "application/didcomm-envelope-enc",
        }
    }
}

/// Runtime configuration for the in-process agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Label shown to peers in invitations.
    pub label: String,
    /// Public endpoints peers use to reach this agent.
    pub endpoints: Vec<String>,
    /// Wallet identifier.
    pub wallet_id: String,
    /// Wallet key.
    pub wallet_key: String,
    /// Accept incoming connection requests automatically.
    pub auto_accept_connections: bool,
    /// Credential exchange auto-accept policy.
    pub auto_accept_credentials: AutoAcceptCredential,
    pub did_comm_mime_type: DidCommMimeType,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            label: "demo-agent-bob".into(),
            endpoints: vec!["http://localhost:3001".into()],
            wallet_id: "mainBob".into(),
            wallet_key: "demoagentbob00000000000000000000".into(),
            auto_accept_connections: true,
            auto_accept_credentials: AutoAcceptCredential::ContentApproved,
            did_comm_mime_type: DidCommMimeType::V0,
        }
    }
}

impl AgentConfig {
    /// The endpoint advertised in invitations.
    pub fn primary_endpoint(&self) -> Option<&str> {
        self.endpoints.first().map(String::as_str)
    }
}
