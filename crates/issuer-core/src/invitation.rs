//! Legacy (connections/1.0) out-of-band invitation and its URL form.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Message type prefix used by current agents.
pub const DIDCOMM_PREFIX: &str = "https://didcomm.org/";
/// Message type prefix understood by older agents.
pub const DID_SOV_PREFIX: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/";

const INVITATION_TYPE: &str = "connections/1.0/invitation";

/// The portable part of an invitation: what the peer needs to reach us.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfBandInvitation {
    pub id: String,
    pub label: String,
    pub recipient_keys: Vec<String>,
    pub service_endpoint: String,
}

#[derive(Serialize, Deserialize)]
struct InvitationMessage {
    #[serde(rename = "@type")]
    message_type: String,
    #[serde(rename = "@id")]
    id: String,
    label: String,
    #[serde(rename = "recipientKeys")]
    recipient_keys: Vec<String>,
    #[serde(rename = "serviceEndpoint")]
    service_endpoint: String,
    #[serde(rename = "routingKeys")]
    routing_keys: Vec<String>,
}

impl OutOfBandInvitation {
    /// Render as `<domain>?c_i=<base64url(json)>`.
    pub fn to_url(&self, domain: &str, use_did_sov_prefix: bool) -> Result<String, CoreError> {
        let prefix = if use_did_sov_prefix {
            DID_SOV_PREFIX
        } else {
            DIDCOMM_PREFIX
        };
        let message = InvitationMessage {
            message_type: format!("{}{}", prefix, INVITATION_TYPE),
            id: self.id.clone(),
            label: self.label.clone(),
            recipient_keys: self.recipient_keys.clone(),
            service_endpoint: self.service_endpoint.clone(),
            routing_keys: Vec::new(),
        };
        let json = serde_json::to_vec(&message)?;
        Ok(format!("{}?c_i={}", domain, URL_SAFE_NO_PAD.encode(json)))
    }

    /// Parse an invitation URL produced by [`OutOfBandInvitation::to_url`].
    pub fn from_url(url: &str) -> Result<Self, CoreError> {
        let encoded = url
            .split_once("c_i=")
            .map(|(_, rest)| rest.split('&').next().unwrap_or(rest))
            .ok_or_else(|| CoreError::ValidationError("invitation url has no c_i parameter".into()))?;
        let json = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| CoreError::ValidationError(format!("invalid c_i encoding: {}", e)))?;
        let message: InvitationMessage = serde_json::from_slice(&json)?;
        if !message.message_type.ends_with(INVITATION_TYPE) {
            return Err(CoreError::ValidationError(format!(
                "unexpected message type: {}",
                message.message_type
            )));
        }
        Ok(Self {
            id: message.id,
            label: message.label,
            recipient_keys: message.recipient_keys,
            service_endpoint: message.service_endpoint,
        })
    }
}
