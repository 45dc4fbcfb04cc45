//! Node configuration loading and management.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use issuer_core::{
    AgentConfig, AutoAcceptCredential, CredentialAttribute, DidCommMimeType, ProtocolVersion,
};

/// Full configuration for the issuer node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IssuerConfig {
    /// Agent identity and transport settings.
    #[serde(default)]
    pub agent: AgentSection,

    /// Wallet settings.
    #[serde(default)]
    pub wallet: WalletSection,

    /// The DID we issue as and the seed of its key.
    #[serde(default)]
    pub issuer: IssuerSection,

    /// Schema to register.
    #[serde(default)]
    pub schema: SchemaSection,

    /// Credential definition and offered values.
    #[serde(default)]
    pub credential: CredentialSection,

    /// Invitation settings.
    #[serde(default)]
    pub invitation: InvitationSection,

    /// Auto-accept policies.
    #[serde(default)]
    pub auto_accept: AutoAcceptSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSection {
    /// Label shown to peers.
    #[serde(default = "default_label")]
    pub label: String,
    /// Public URL peers reach us on, advertised as is. Unset means
    /// `http://localhost:<port>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Local address the inbound HTTP endpoint binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub did_comm_mime_type: DidCommMimeType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSection {
    #[serde(default = "default_wallet_id")]
    pub id: String,
    #[serde(default = "default_wallet_key")]
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerSection {
    /// Fully qualified issuer DID.
    #[serde(default = "default_issuer_did")]
    pub did: String,
    /// 32 character seed imported as the issuer's private key.
    #[serde(default = "default_issuer_seed")]
    pub seed: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSection {
    #[serde(default = "default_schema_name")]
    pub name: String,
    /// Must be new for every registration against the same registry.
    #[serde(default = "default_schema_version")]
    pub version: String,
    #[serde(default = "default_schema_attributes")]
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSection {
    #[serde(default = "default_tag")]
    pub tag: String,
    /// Offer the legacy Indy form of the credential definition id.
    #[serde(default)]
    pub legacy_identifiers: bool,
    #[serde(default)]
    pub protocol_version: ProtocolVersion,
    /// Values offered to every connection, in order.
    #[serde(default = "default_credential_attributes")]
    pub attributes: Vec<CredentialAttribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationSection {
    #[serde(default = "default_true")]
    pub multi_use: bool,
    /// Base of the rendered invitation URL.
    #[serde(default = "default_invitation_domain")]
    pub domain: String,
    #[serde(default = "default_true")]
    pub use_did_sov_prefix: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoAcceptSection {
    #[serde(default = "default_true")]
    pub connections: bool,
    #[serde(default)]
    pub credentials: AutoAcceptCredential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_label() -> String {
    "demo-agent-bob".into()
}
fn default_listen_addr() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    3001
}
fn default_wallet_id() -> String {
    "mainBob".into()
}
fn default_wallet_key() -> String {
    "demoagentbob00000000000000000000".into()
}
fn default_issuer_did() -> String {
    "did:indy:bcovrin:test:WUTE5T3VAPYS46ph5bLkUt".into()
}
fn default_issuer_seed() -> String {
    "asdfasfasdfasdf00000000000000000".into()
}
fn default_schema_name() -> String {
    "Name".into()
}
fn default_schema_version() -> String {
    "1.0".into()
}
fn default_schema_attributes() -> Vec<String> {
    vec!["Name".into()]
}
fn default_tag() -> String {
    "hello".into()
}
fn default_credential_attributes() -> Vec<CredentialAttribute> {
    vec![CredentialAttribute::new("Name", "Berend Botje")]
}
fn default_invitation_domain() -> String {
    "https://example.org".into()
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            label: default_label(),
            endpoint: None,
            listen_addr: default_listen_addr(),
            port: default_port(),
            did_comm_mime_type: DidCommMimeType::default(),
        }
    }
}

impl Default for WalletSection {
    fn default() -> Self {
        Self {
            id: default_wallet_id(),
            key: default_wallet_key(),
        }
    }
}

impl Default for IssuerSection {
    fn default() -> Self {
        Self {
            did: default_issuer_did(),
            seed: default_issuer_seed(),
        }
    }
}

impl Default for SchemaSection {
    fn default() -> Self {
        Self {
            name: default_schema_name(),
            version: default_schema_version(),
            attributes: default_schema_attributes(),
        }
    }
}

impl Default for CredentialSection {
    fn default() -> Self {
        Self {
            tag: default_tag(),
            legacy_identifiers: false,
            protocol_version: ProtocolVersion::default(),
            attributes: default_credential_attributes(),
        }
    }
}

impl Default for InvitationSection {
    fn default() -> Self {
        Self {
            multi_use: true,
            domain: default_invitation_domain(),
            use_did_sov_prefix: true,
        }
    }
}

impl Default for AutoAcceptSection {
    fn default() -> Self {
        Self {
            connections: true,
            credentials: AutoAcceptCredential::default(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl IssuerConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config: IssuerConfig = toml::from_str(&contents)
                .with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// The endpoint advertised in invitations.
    pub fn public_endpoint(&self) -> String {
        match &self.agent.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("http://localhost:{}", self.agent.port),
        }
    }

    /// Where the inbound HTTP endpoint listens.
    pub fn listen_socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.agent.listen_addr, self.agent.port)
            .parse()
            .with_context(|| format!("invalid listen address {}", self.agent.listen_addr))
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            label: self.agent.label.clone(),
            endpoints: vec![self.public_endpoint()],
            wallet_id: self.wallet.id.clone(),
            wallet_key: self.wallet.key.clone(),
            auto_accept_connections: self.auto_accept.connections,
            auto_accept_credentials: self.auto_accept.credentials,
            did_comm_mime_type: self.agent.did_comm_mime_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IssuerConfig::default();
        assert_eq!(config.agent.port, 3001);
        assert_eq!(config.agent.label, "demo-agent-bob");
        assert_eq!(config.wallet.id, "mainBob");
        assert_eq!(config.schema.attributes, vec!["Name".to_string()]);
        assert_eq!(config.credential.tag, "hello");
        assert!(config.invitation.multi_use);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_public_endpoint_defaults_to_local_port() {
        let mut config = IssuerConfig::default();
        assert_eq!(config.public_endpoint(), "http://localhost:3001");
        config.agent.port = 4000;
        assert_eq!(config.public_endpoint(), "http://localhost:4000");
    }

    #[test]
    fn test_configured_endpoint_advertised_unchanged() {
        let mut config = IssuerConfig::default();
        config.agent.endpoint = Some("https://x.ngrok.io".into());
        config.agent.port = 8443;
        assert_eq!(config.public_endpoint(), "https://x.ngrok.io");
        assert_eq!(
            config.agent_config().endpoints,
            vec!["https://x.ngrok.io".to_string()]
        );
        assert_eq!(
            config.listen_socket_addr().unwrap(),
            "0.0.0.0:8443".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_listen_socket_addr() {
        let mut config = IssuerConfig::default();
        assert_eq!(
            config.listen_socket_addr().unwrap(),
            "0.0.0.0:3001".parse::<SocketAddr>().unwrap()
        );
        config.agent.listen_addr = "not an address".into();
        assert!(config.listen_socket_addr().is_err());
    }

    #[test]
    fn test_agent_config_mapping() {
        let mut config = IssuerConfig::default();
        config.auto_accept.credentials = AutoAcceptCredential::Never;
        let agent = config.agent_config();
        assert_eq!(agent.endpoints, vec!["http://localhost:3001".to_string()]);
        assert_eq!(agent.auto_accept_credentials, AutoAcceptCredential::Never);
        assert!(agent.auto_accept_connections);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = IssuerConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let decoded: IssuerConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(decoded.agent.port, config.agent.port);
        assert_eq!(decoded.credential.attributes, config.credential.attributes);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let config = IssuerConfig::load(Path::new("/nonexistent/issuer.toml")).unwrap();
        assert_eq!(config.agent.port, 3001);
    }

    #[test]
    fn test_config_from_toml_partial() {
        let toml_str = r#"
[agent]
port = 4000
endpoint = "https://issuer.example"

[auto_accept]
credentials = "never"

[[credential.attributes]]
name = "Name"
value = "Alice"
"#;
        let config: IssuerConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.agent.port, 4000);
        assert_eq!(config.public_endpoint(), "https://issuer.example");
        assert_eq!(config.auto_accept.credentials, AutoAcceptCredential::Never);
        assert_eq!(
            config.credential.attributes,
            vec![CredentialAttribute::new("Name", "Alice")]
        );
        // Defaults for unspecified
        assert_eq!(config.credential.tag, "hello");
        assert_eq!(config.schema.version, "1.0");
    }
}
