use std::fmt;

use crate::error::CoreError;

/// States of a credential exchange protocol instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialExchangeState {
    ProposalSent,
    ProposalReceived,
    OfferSent,
    OfferReceived,
    Declined,
    RequestSent,
    RequestReceived,
    CredentialIssued,
    CredentialReceived,
    Done,
    Abandoned,
}

impl CredentialExchangeState {
    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Done | Self::Declined | Self::Abandoned)
    }
}

impl fmt::Display for CredentialExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ProposalSent => "proposal-sent",
            Self::ProposalReceived => "proposal-received",
            Self::OfferSent => "offer-sent",
            Self::OfferReceived => "offer-received",
            Self::Declined => "declined",
            Self::RequestSent => "request-sent",
            Self::RequestReceived => "request-received",
            Self::CredentialIssued => "credential-issued",
            Self::CredentialReceived => "credential-received",
            Self::Done => "done",
            Self::Abandoned => "abandoned",
        };
        f.write_str(s)
    }
}

/// Events that move an issuer-side credential exchange forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialExchangeEvent {
    /// Holder answered the offer with a credential request.
    ReceiveRequest,
    /// Issuer signed and sent the credential.
    Issue,
    /// Holder acknowledged receipt.
    ReceiveAck,
    /// Holder declined the offer.
    Decline,
    /// Either side reported a problem.
    Abandon,
}

/// Issuer-side credential exchange transitions.
///
/// Valid transitions:
/// - OfferSent → RequestReceived (ReceiveRequest)
/// - OfferSent → Declined (Decline)
/// - RequestReceived → CredentialIssued (Issue)
/// - CredentialIssued → Done (ReceiveAck)
/// - any non-final state → Abandoned (Abandon)
pub struct CredentialExchangeStateMachine;

impl CredentialExchangeStateMachine {
    pub fn transition(
        current: CredentialExchangeState,
        event: CredentialExchangeEvent,
    ) -> Result<CredentialExchangeState, CoreError> {
        use CredentialExchangeEvent as E;
        use CredentialExchangeState as S;

        let new_state = match (current, event) {
            (S::OfferSent, E::ReceiveRequest) => S::RequestReceived,
            (S::OfferSent, E::Decline) => S::Declined,
            (S::RequestReceived, E::Issue) => S::CredentialIssued,
            (S::CredentialIssued, E::ReceiveAck) => S::Done,
            (s, E::Abandon) if !s.is_final() => S::Abandoned,
            _ => {
                let target = match event {
                    E::ReceiveRequest => S::RequestReceived,
                    E::Issue => S::CredentialIssued,
                    E::ReceiveAck => S::Done,
                    E::Decline => S::Declined,
                    E::Abandon => S::Abandoned,
                };
                return Err(CoreError::InvalidStateTransition {
                    from: current,
                    to: target,
                });
            }
        };

        tracing::debug!(
            from = %current,
            to = %new_state,
            event = ?event,
            "credential exchange state transition"
        );

        Ok(new_state)
    }

    pub fn can_transition(current: CredentialExchangeState, event: CredentialExchangeEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
