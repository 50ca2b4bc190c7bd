//! HTTP surface of the switchboard control plane.
//!
//! Builds the axum router over the core components, runs the wiring tasks
//! that pump supervisor and broker events into the fan-out, and owns the
//! graceful shutdown sequence.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use axum::routing::post;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use switchboard_core::Config;
use switchboard_core::notify_on_shutdown_signal;

mod conversations;
mod error;
mod mcp_config;
mod permissions;
mod state;
mod stream;
mod wiring;

pub use state::AppState;
pub use wiring::spawn_event_pump;
pub use wiring::spawn_permission_pump;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/conversations/start", post(conversations::start))
        .route(
            "/api/conversations/{streaming_id}/stop",
            post(conversations::stop),
        )
        .route("/api/conversations", get(conversations::list))
        .route("/api/conversations/{session_id}", get(conversations::details))
        .route("/api/stream/{streaming_id}", get(stream::subscribe))
        .route("/api/permissions/notify", post(permissions::notify))
        .route("/api/permissions", get(permissions::list))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until an interrupt or terminate signal, then wind down: stop
/// accepting connections, stop every active subprocess with bounded
/// concurrency, end all subscribers, and drop the generated MCP config.
pub async fn run_main(config: Config) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let (state, rx_event) = AppState::build(Arc::clone(&config));

    let generated_mcp_config = mcp_config::generate(&config)?;
    if let Some(generated) = &generated_mcp_config {
        state
            .supervisor
            .set_mcp_config_path(Some(generated.path().to_path_buf()));
    }

    spawn_event_pump(state.clone(), rx_event);
    spawn_permission_pump(state.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("switchboard listening on http://{}", config.bind_addr);

    // The teardown runs inside the shutdown future: subscribers' response
    // bodies must end before axum can drain its connections.
    let shutdown = notify_on_shutdown_signal();
    let teardown = state.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.notified().await;
            info!("shutting down: stopping active conversations");
            teardown.supervisor.shutdown().await;
            teardown.fanout.disconnect_all();
        })
        .await?;

    drop(generated_mcp_config);
    info!("shutdown complete");
    Ok(())
}
