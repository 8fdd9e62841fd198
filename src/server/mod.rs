//! HTTP surface: mascot conversation, contact mail, health

mod mail;
mod mascot;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Settings;
use crate::core::mail::MailRelay;
use crate::core::relay::ConversationRelay;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ConversationRelay>,
    pub mail: Arc<dyn MailRelay>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/mascot", post(mascot::send_message))
        .route("/api/mascot", post(mascot::send_message))
        .route(
            "/mascot/history",
            get(mascot::history).delete(mascot::clear_history),
        )
        .route("/send-email", post(mail::send_email))
        .route("/api/send-email", post(mail::send_email_form))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Serve on an already-bound listener until the process is stopped
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let app = router(state);
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn start_server(settings: &Settings, state: AppState) -> Result<()> {
    let address = format!("{}:{}", settings.server.host, settings.server.port);
    tracing::info!("Starting server on {}", address);

    let listener = TcpListener::bind(&address).await?;
    tracing::info!("Server running on port {}", settings.server.port);

    serve(listener, state).await
}
