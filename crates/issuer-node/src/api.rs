//! HTTP inbound endpoint.
//!
//! Peers post unpacked protocol messages to `/`; `/health` is for probes.

use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;

use issuer_agent::{EngineError, InboundDispatcher, InboundMessage, InboundOutcome};

/// State shared with the HTTP handlers.
pub struct NodeState {
    pub inbound: InboundDispatcher,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// --- Handlers ---

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_inbound(
    State(state): State<Arc<NodeState>>,
    Json(message): Json<InboundMessage>,
) -> Result<Json<InboundOutcome>, (StatusCode, Json<ErrorResponse>)> {
    match state.inbound.dispatch(message).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            tracing::warn!(error = %e, "inbound message rejected");
            Err((
                status_for(&e),
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

fn status_for(error: &EngineError) -> StatusCode {
    match error {
        EngineError::UnknownInvitation(_)
        | EngineError::ConnectionNotFound(_)
        | EngineError::ExchangeNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvitationAlreadyUsed(_)
        | EngineError::InvalidConnectionTransition { .. }
        | EngineError::UnexpectedExchangeState { .. }
        | EngineError::Core(_) => StatusCode::CONFLICT,
        EngineError::Unavailable(_) | EngineError::Wallet(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

// --- Server ---

pub fn build_router(state: Arc<NodeState>) -> Router {
    Router::new()
        .route("/", post(handle_inbound))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Serve the inbound endpoint on an already bound listener.
pub async fn serve(listener: TcpListener, state: Arc<NodeState>) -> anyhow::Result<()> {
    let app = build_router(state);
    tracing::info!(listen_addr = %listener.local_addr()?, "inbound endpoint started");
    axum::serve(listener, app).await?;
    Ok(())
}
