//! Issuer Flow — the startup sequence and the event-driven core of the
//! issuer.
//!
//! Startup runs [`IdentityBootstrapper`], then [`ArtifactRegistrar`], then
//! [`InvitationIssuer`]; any failure there is fatal. After that the
//! [`IssuanceOrchestrator`] reacts to connection and credential
//! notifications through a [`ConnectionWatcher`] and a [`CredentialWatcher`].

pub mod bootstrap;
pub mod error;
pub mod invitation;
pub mod orchestrator;
pub mod registrar;
pub mod watcher;

pub use bootstrap::{BootstrappedIdentity, IdentityBootstrapper};
pub use error::FlowError;
pub use invitation::{InvitationHandle, InvitationIssuer, InvitationOptions};
pub use orchestrator::{
    IssuanceCompleted, IssuanceOrchestrator, IssuanceSettings, ObserverRegistry, OfferStatus,
};
pub use registrar::ArtifactRegistrar;
pub use watcher::{ConnectionWatcher, CredentialWatcher, WatchHandle};
