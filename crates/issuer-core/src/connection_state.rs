use std::fmt;

/// States of a DID exchange (connection) protocol instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DidExchangeState {
    Start,
    InvitationSent,
    InvitationReceived,
    RequestSent,
    RequestReceived,
    ResponseSent,
    ResponseReceived,
    Abandoned,
    Completed,
}

/// What a connection state means to code that wants to use the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Handshake still in progress.
    Pending,
    /// Usable for other protocols.
    Ready,
    /// Terminally failed; will never become ready.
    Failed,
}

impl DidExchangeState {
    /// Classify the state for consumers of the connection.
    ///
    /// `ResponseSent` counts as ready: the responder may start using the
    /// connection before the requester's ack arrives, so depending on the
    /// handshake role either it or `Completed` is the first usable state.
    pub fn readiness(&self) -> Readiness {
        match self {
            Self::Completed | Self::ResponseSent => Readiness::Ready,
            Self::Abandoned => Readiness::Failed,
            _ => Readiness::Pending,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.readiness() == Readiness::Ready
    }

    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }
}

impl fmt::Display for DidExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::InvitationSent => "invitation-sent",
            Self::InvitationReceived => "invitation-received",
            Self::RequestSent => "request-sent",
            Self::RequestReceived => "request-received",
            Self::ResponseSent => "response-sent",
            Self::ResponseReceived => "response-received",
            Self::Abandoned => "abandoned",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}
