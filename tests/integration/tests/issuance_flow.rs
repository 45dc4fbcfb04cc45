//! Integration test: startup sequence, invitation, automatic offer and
//! completion across issuer-core, issuer-agent and issuer-flow.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use issuer_agent::{
    AgentEvent, ConnectionStateChanged, CredentialEngine, CredentialStateChanged, EngineError,
    EventBus, InboundMessage, InboundOutcome, SchemaRegistration,
};
use issuer_core::{
    AgentConfig, AutoAcceptCredential, ConnectionId, ConnectionRecord, CredentialAttribute,
    CredentialExchangeId, CredentialExchangeRecord, CredentialExchangeState, DidExchangeState,
    OutOfBandId,
};
use issuer_flow::{
    ArtifactRegistrar, FlowError, InvitationHandle, InvitationIssuer, InvitationOptions,
    IssuanceCompleted, IssuanceOrchestrator, IssuanceSettings, OfferStatus,
};
use issuer_integration_tests::{
    offered_attributes, registered_issuer, wait_until, RecordingEngine, RegisteredIssuer,
    LEGACY_ISSUER,
};
use tokio::sync::mpsc;

async fn invite(issuer: &RegisteredIssuer, multi_use: bool) -> InvitationHandle {
    InvitationIssuer::new(
        issuer.agent.connections().clone(),
        InvitationOptions::default(),
    )
    .create_invitation(multi_use)
    .await
    .expect("invitation")
}

fn settings(issuer: &RegisteredIssuer) -> IssuanceSettings {
    IssuanceSettings::new(
        issuer.definition.credential_definition_id.clone(),
        offered_attributes(),
    )
}

/// Orchestrator wired to the agent's own engines and bus.
fn orchestrate(
    issuer: &RegisteredIssuer,
    settings: IssuanceSettings,
) -> (IssuanceOrchestrator, mpsc::UnboundedReceiver<IssuanceCompleted>) {
    IssuanceOrchestrator::new(
        issuer.agent.credentials().clone(),
        Arc::new(issuer.agent.events().clone()),
        settings,
    )
    .expect("orchestrator")
}

async fn connect(issuer: &RegisteredIssuer, invitation: &InvitationHandle) -> ConnectionId {
    let outcome = issuer
        .agent
        .inbound()
        .dispatch(InboundMessage::ConnectionRequest {
            invitation_id: invitation.invitation.id.clone(),
            label: Some("alice".into()),
        })
        .await
        .expect("connection request");
    match outcome {
        InboundOutcome::Connection { id, state } => {
            assert_eq!(state, DidExchangeState::ResponseSent);
            id
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

async fn offered_exchange(
    orchestrator: &IssuanceOrchestrator,
    connection_id: &ConnectionId,
) -> CredentialExchangeId {
    wait_until("credential offer", || {
        matches!(
            orchestrator.offer_status(connection_id),
            Some(OfferStatus::Offered(_))
        )
    })
    .await;
    match orchestrator.offer_status(connection_id) {
        Some(OfferStatus::Offered(id)) => id,
        other => panic!("unexpected offer status: {:?}", other),
    }
}

async fn next_completion(
    completed: &mut mpsc::UnboundedReceiver<IssuanceCompleted>,
) -> IssuanceCompleted {
    tokio::time::timeout(Duration::from_secs(2), completed.recv())
        .await
        .expect("completion within timeout")
        .expect("completion channel open")
}

fn connection_event(id: &str, out_of_band_id: &OutOfBandId, state: DidExchangeState) -> AgentEvent {
    AgentEvent::ConnectionStateChanged(ConnectionStateChanged {
        connection_record: ConnectionRecord {
            id: ConnectionId::new(id),
            state,
            out_of_band_id: Some(out_of_band_id.clone()),
            their_label: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        },
        previous_state: None,
    })
}

fn credential_event(
    issuer: &RegisteredIssuer,
    id: &str,
    connection_id: &str,
    state: CredentialExchangeState,
) -> AgentEvent {
    AgentEvent::CredentialStateChanged(CredentialStateChanged {
        credential_record: CredentialExchangeRecord {
            id: CredentialExchangeId::new(id),
            connection_id: ConnectionId::new(connection_id),
            state,
            credential_definition_id: issuer.definition.credential_definition_id.clone(),
            attributes: offered_attributes(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        },
        previous_state: None,
    })
}

// =========================================================================
// Full flow against the in-memory agent
// =========================================================================

#[tokio::test]
async fn test_end_to_end_issuance() {
    let issuer = registered_issuer(AgentConfig::default()).await;
    assert!(issuer.schema.is_finished());
    assert!(!issuer.schema.schema_id.is_empty());
    assert!(issuer.definition.is_finished());
    assert!(!issuer.definition.credential_definition_id.is_empty());

    let invitation = invite(&issuer, true).await;
    assert!(!invitation.out_of_band_id().is_empty());

    let (orchestrator, mut completed) = orchestrate(&issuer, settings(&issuer));
    orchestrator.start(invitation.out_of_band_id());

    let connection_id = connect(&issuer, &invitation).await;
    let exchange_id = offered_exchange(&orchestrator, &connection_id).await;

    let exchange = issuer
        .agent
        .credentials()
        .exchange(&exchange_id)
        .await
        .unwrap();
    assert_eq!(exchange.state, CredentialExchangeState::OfferSent);
    assert_eq!(exchange.connection_id, connection_id);
    assert_eq!(
        exchange.credential_definition_id,
        issuer.definition.credential_definition_id
    );
    assert_eq!(
        exchange.attributes,
        vec![CredentialAttribute::new("Name", "Berend Botje")]
    );

    // The ack moves the connection to completed, which is ready again.
    issuer
        .agent
        .inbound()
        .dispatch(InboundMessage::ConnectionAck {
            connection_id: connection_id.clone(),
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(issuer.agent.credentials().exchange_count(), 1);
    assert_eq!(orchestrator.offer_count(), 1);

    let outcome = issuer
        .agent
        .inbound()
        .dispatch(InboundMessage::CredentialRequest {
            exchange_id: exchange_id.clone(),
        })
        .await
        .unwrap();
    assert_eq!(
        outcome,
        InboundOutcome::CredentialExchange {
            id: exchange_id.clone(),
            state: CredentialExchangeState::CredentialIssued,
        }
    );

    let done = next_completion(&mut completed).await;
    assert_eq!(done.exchange_id, exchange_id);
    assert_eq!(done.connection_id, connection_id);
    assert_eq!(
        done.credential_definition_id,
        issuer.definition.credential_definition_id
    );
    assert!(issuer
        .agent
        .credentials()
        .issued_credential(&exchange_id)
        .is_some());

    issuer
        .agent
        .inbound()
        .dispatch(InboundMessage::CredentialAck {
            exchange_id: exchange_id.clone(),
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(completed.try_recv().is_err());

    orchestrator.shutdown();
    assert!(orchestrator.observers().is_empty());
}

#[tokio::test]
async fn test_every_connection_on_multi_use_invitation_gets_one_offer() {
    let issuer = registered_issuer(AgentConfig::default()).await;
    let invitation = invite(&issuer, true).await;
    let (orchestrator, _completed) = orchestrate(&issuer, settings(&issuer));
    orchestrator.start(invitation.out_of_band_id());

    let first = connect(&issuer, &invitation).await;
    let second = connect(&issuer, &invitation).await;
    let a = offered_exchange(&orchestrator, &first).await;
    let b = offered_exchange(&orchestrator, &second).await;

    assert_ne!(a, b);
    assert_eq!(issuer.agent.credentials().exchange_count(), 2);
}

#[tokio::test]
async fn test_single_use_invitation_admits_one_connection() {
    let issuer = registered_issuer(AgentConfig::default()).await;
    let invitation = invite(&issuer, false).await;
    let (orchestrator, _completed) = orchestrate(&issuer, settings(&issuer));
    orchestrator.start(invitation.out_of_band_id());

    let connection_id = connect(&issuer, &invitation).await;
    offered_exchange(&orchestrator, &connection_id).await;

    let second = issuer
        .agent
        .inbound()
        .dispatch(InboundMessage::ConnectionRequest {
            invitation_id: invitation.invitation.id.clone(),
            label: None,
        })
        .await;
    assert!(matches!(second, Err(EngineError::InvitationAlreadyUsed(_))));
    assert_eq!(orchestrator.offer_count(), 1);
}

#[tokio::test]
async fn test_legacy_identifier_offer() {
    let issuer = registered_issuer(AgentConfig::default()).await;
    let invitation = invite(&issuer, true).await;
    let mut settings = settings(&issuer);
    settings.legacy_issuer = Some(LEGACY_ISSUER.to_string());
    let (orchestrator, mut completed) = orchestrate(&issuer, settings);
    orchestrator.start(invitation.out_of_band_id());

    let seq_no = issuer.schema.seq_no.expect("committed schema has a seq_no");
    let expected = format!("{}:3:CL:{}:hello", LEGACY_ISSUER, seq_no);
    assert_eq!(orchestrator.credential_definition_id().as_str(), expected);

    let connection_id = connect(&issuer, &invitation).await;
    let exchange_id = offered_exchange(&orchestrator, &connection_id).await;
    let exchange = issuer
        .agent
        .credentials()
        .exchange(&exchange_id)
        .await
        .unwrap();
    assert_eq!(exchange.credential_definition_id.as_str(), expected);

    issuer
        .agent
        .inbound()
        .dispatch(InboundMessage::CredentialRequest {
            exchange_id: exchange_id.clone(),
        })
        .await
        .unwrap();
    assert_eq!(next_completion(&mut completed).await.exchange_id, exchange_id);
}

#[tokio::test]
async fn test_manual_credential_acceptance() {
    let config = AgentConfig {
        auto_accept_credentials: AutoAcceptCredential::Never,
        ..Default::default()
    };
    let issuer = registered_issuer(config).await;
    let invitation = invite(&issuer, true).await;
    let (orchestrator, mut completed) = orchestrate(&issuer, settings(&issuer));
    orchestrator.start(invitation.out_of_band_id());

    let connection_id = connect(&issuer, &invitation).await;
    let exchange_id = offered_exchange(&orchestrator, &connection_id).await;

    issuer
        .agent
        .inbound()
        .dispatch(InboundMessage::CredentialRequest {
            exchange_id: exchange_id.clone(),
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(completed.try_recv().is_err());

    let record = issuer
        .agent
        .credentials()
        .accept_request(&exchange_id)
        .await
        .unwrap();
    assert_eq!(record.state, CredentialExchangeState::CredentialIssued);
    assert_eq!(next_completion(&mut completed).await.exchange_id, exchange_id);
}

#[tokio::test]
async fn test_declined_offer_never_completes() {
    let issuer = registered_issuer(AgentConfig::default()).await;
    let invitation = invite(&issuer, true).await;
    let (orchestrator, mut completed) = orchestrate(&issuer, settings(&issuer));
    orchestrator.start(invitation.out_of_band_id());

    let connection_id = connect(&issuer, &invitation).await;
    let exchange_id = offered_exchange(&orchestrator, &connection_id).await;

    let outcome = issuer
        .agent
        .inbound()
        .dispatch(InboundMessage::CredentialDecline {
            exchange_id: exchange_id.clone(),
        })
        .await
        .unwrap();
    assert_eq!(
        outcome,
        InboundOutcome::CredentialExchange {
            id: exchange_id,
            state: CredentialExchangeState::Declined,
        }
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(completed.try_recv().is_err());
}

// =========================================================================
// Orchestration against an injected notification source
// =========================================================================

#[tokio::test]
async fn test_simulated_notifications() {
    let issuer = registered_issuer(AgentConfig::default()).await;
    let invitation = invite(&issuer, true).await;

    let bus = EventBus::new();
    let engine = Arc::new(RecordingEngine::default());
    let (orchestrator, mut completed) =
        IssuanceOrchestrator::new(engine.clone(), Arc::new(bus.clone()), settings(&issuer))
            .unwrap();
    orchestrator.start(invitation.out_of_band_id());

    bus.emit(connection_event(
        "peer-1",
        invitation.out_of_band_id(),
        DidExchangeState::Completed,
    ));
    wait_until("credential offer", || engine.offers().len() == 1).await;

    let offer = engine.offers().remove(0);
    assert_eq!(offer.connection_id, ConnectionId::new("peer-1"));
    assert_eq!(
        offer.credential_definition_id,
        issuer.definition.credential_definition_id
    );
    assert_eq!(offer.attributes.len(), 1);
    assert_eq!(offer.attributes[0].name, "Name");
    assert_eq!(offer.attributes[0].value, "Berend Botje");

    bus.emit(credential_event(
        &issuer,
        "exchange-1",
        "peer-1",
        CredentialExchangeState::OfferSent,
    ));
    bus.emit(credential_event(
        &issuer,
        "exchange-1",
        "peer-1",
        CredentialExchangeState::RequestReceived,
    ));
    bus.emit(credential_event(
        &issuer,
        "exchange-1",
        "peer-1",
        CredentialExchangeState::CredentialIssued,
    ));

    let done = next_completion(&mut completed).await;
    assert_eq!(done.exchange_id, CredentialExchangeId::new("exchange-1"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(completed.try_recv().is_err());
}

#[tokio::test]
async fn test_notifications_for_other_invitation_ignored() {
    let issuer = registered_issuer(AgentConfig::default()).await;
    let watched = invite(&issuer, true).await;
    let other = invite(&issuer, true).await;

    let bus = EventBus::new();
    let engine = Arc::new(RecordingEngine::default());
    let (orchestrator, _completed) =
        IssuanceOrchestrator::new(engine.clone(), Arc::new(bus.clone()), settings(&issuer))
            .unwrap();
    orchestrator.start(watched.out_of_band_id());

    bus.emit(connection_event(
        "peer-a",
        watched.out_of_band_id(),
        DidExchangeState::Completed,
    ));
    bus.emit(connection_event(
        "peer-b",
        other.out_of_band_id(),
        DidExchangeState::Completed,
    ));
    wait_until("credential offer", || engine.offers().len() == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let offers = engine.offers();
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].connection_id, ConnectionId::new("peer-a"));
}

#[tokio::test]
async fn test_redelivered_ready_states_offer_once() {
    let issuer = registered_issuer(AgentConfig::default()).await;
    let invitation = invite(&issuer, true).await;

    let bus = EventBus::new();
    let engine = Arc::new(RecordingEngine::default());
    let (orchestrator, _completed) =
        IssuanceOrchestrator::new(engine.clone(), Arc::new(bus.clone()), settings(&issuer))
            .unwrap();
    orchestrator.start(invitation.out_of_band_id());

    for state in [
        DidExchangeState::ResponseSent,
        DidExchangeState::Completed,
        DidExchangeState::Completed,
    ] {
        bus.emit(connection_event("peer-1", invitation.out_of_band_id(), state));
    }
    wait_until("credential offer", || engine.offers().len() == 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.offers().len(), 1);
}

// =========================================================================
// Startup failures
// =========================================================================

#[tokio::test]
async fn test_definition_for_pending_schema_rejected() {
    let issuer = registered_issuer(AgentConfig::default()).await;
    let staged = issuer.agent.registry().stage_schema(SchemaRegistration {
        issuer_id: issuer.identity.did.clone(),
        name: "Name".into(),
        version: "2.0".into(),
        attribute_names: vec!["Name".into()],
    });

    let registrar = ArtifactRegistrar::new(issuer.agent.registry().clone());
    let err = registrar
        .register_credential_definition(&staged.schema_id, &issuer.identity, "hello")
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::CredentialDefinitionRegistration(_)));
}

#[tokio::test]
async fn test_reregistering_same_schema_version_fails() {
    let issuer = registered_issuer(AgentConfig::default()).await;
    let registrar = ArtifactRegistrar::new(issuer.agent.registry().clone());
    let err = registrar
        .register_schema(&issuer.identity, "Name", "1.0", vec!["Name".into()])
        .await
        .unwrap_err();
    assert!(matches!(err, FlowError::SchemaRegistration(_)));
}
