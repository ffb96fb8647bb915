//! Server assembly: wires config, store, OAuth, archive, and the notifier
//! task into one router and runs it with graceful shutdown.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Router,
};
use rust_embed::RustEmbed;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::api::{self, AppState};
use crate::archive::ArchiveStore;
use crate::auth::DiscordOauth;
use crate::bot::{notifier_from_credentials, NotifierTask};
use crate::config::HubConfig;
use crate::db::SqliteTickets;
use crate::store::StoreHandle;

/// Dashboard assets compiled into the binary.
#[derive(RustEmbed)]
#[folder = "static/"]
struct Assets;

/// Build the full application router with API routes and static serving.
pub fn build_router(state: Arc<AppState>) -> Router {
    api::api_router().fallback(static_handler).with_state(state)
}

/// Serve embedded static files, falling back to index.html.
async fn static_handler(req: Request<Body>) -> impl IntoResponse {
    let path = req.uri().path().trim_start_matches('/');

    if !path.is_empty() {
        if let Some(content) = Assets::get(path) {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            return Response::builder()
                .header(header::CONTENT_TYPE, mime.as_ref())
                .body(Body::from(content.data.to_vec()))
                .unwrap()
                .into_response();
        }
    }

    match Assets::get("index.html") {
        Some(content) => Html(String::from_utf8_lossy(&content.data).to_string()).into_response(),
        None => (StatusCode::NOT_FOUND, "Dashboard assets missing from build").into_response(),
    }
}

/// Start the server and block until shutdown.
pub async fn start_server(config: HubConfig, dev_mode: bool) -> Result<()> {
    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
    }

    let db = SqliteTickets::new(&config.db_path)
        .with_context(|| format!("Failed to open ticket database {}", config.db_path.display()))?;

    let oauth = DiscordOauth::from_credentials(
        config.discord_client_id.clone(),
        config.discord_client_secret.clone(),
        config.discord_redirect_uri.clone(),
    );
    if oauth.is_none() {
        info!("Discord OAuth disabled: no client credentials configured");
    }

    let notifier_task = NotifierTask::spawn(notifier_from_credentials(
        config.discord_bot_token.clone(),
        config.discord_channel_id.clone(),
    ));

    let state = Arc::new(AppState {
        store: StoreHandle::new(db),
        oauth,
        archive: ArchiveStore::new(config.archive_dir.clone()),
        notifier: notifier_task.handle(),
    });

    let mut app = build_router(state);
    if dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let host = if dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!("PipeHub running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    notifier_task.shutdown().await;
    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
    }
}
