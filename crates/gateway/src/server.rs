//! HTTP + WebSocket server assembly.

use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::{State, WebSocketUpgrade},
        response::{IntoResponse, Json},
        routing::get,
    },
    tokio::net::TcpListener,
    tower_http::cors::{Any, CorsLayer},
    tracing::info,
};

use intrachat_config::IntrachatConfig;

use crate::{state::GatewayState, ws::handle_connection};

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_upgrade_handler))
        .layer(cors)
        .with_state(state)
}

/// Start the gateway from config: build state, bind, serve until ctrl-c.
pub async fn start_gateway(config: &IntrachatConfig) -> anyhow::Result<()> {
    let state = GatewayState::new(config);
    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!(
        version = %state.version,
        addr = %listener.local_addr()?,
        seed = %config.seed.cpf,
        "intrachat gateway listening"
    );
    serve(listener, state).await
}

/// Serve on an already-bound listener (tests bind port 0 and call this).
pub async fn serve(listener: TcpListener, state: Arc<GatewayState>) -> anyhow::Result<()> {
    let app = build_gateway_app(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("received ctrl-c, shutting down");
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let count = state.client_count().await;
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
        "connections": count,
    }))
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}
