//! Out-of-band invitation creation and rendering.

use std::sync::Arc;

use issuer_agent::ConnectionEngine;
use issuer_core::{OutOfBandId, OutOfBandInvitation, OutOfBandRecord};

use crate::error::FlowError;

/// How invitation URLs are rendered. Only affects interoperability with
/// older agents.
#[derive(Debug, Clone)]
pub struct InvitationOptions {
    pub domain: String,
    pub use_did_sov_prefix: bool,
}

impl Default for InvitationOptions {
    fn default() -> Self {
        Self {
            domain: "https://example.org".into(),
            use_did_sov_prefix: true,
        }
    }
}

/// An invitation, the record that correlates connections to it, and its
/// shareable URL.
#[derive(Debug, Clone)]
pub struct InvitationHandle {
    pub invitation: OutOfBandInvitation,
    pub out_of_band_record: OutOfBandRecord,
    pub url: String,
}

impl InvitationHandle {
    pub fn out_of_band_id(&self) -> &OutOfBandId {
        &self.out_of_band_record.id
    }
}

pub struct InvitationIssuer {
    connections: Arc<dyn ConnectionEngine>,
    options: InvitationOptions,
}

impl InvitationIssuer {
    pub fn new(connections: Arc<dyn ConnectionEngine>, options: InvitationOptions) -> Self {
        Self {
            connections,
            options,
        }
    }

    pub async fn create_invitation(&self, multi_use: bool) -> Result<InvitationHandle, FlowError> {
        let created = self.connections.create_invitation(multi_use).await?;
        let url = created
            .invitation
            .to_url(&self.options.domain, self.options.use_did_sov_prefix)?;

        tracing::info!(
            out_of_band_id = %created.out_of_band_record.id,
            multi_use,
            "invitation created"
        );

        Ok(InvitationHandle {
            invitation: created.invitation,
            out_of_band_record: created.out_of_band_record,
            url,
        })
    }
}
