use std::{net::SocketAddr, sync::Arc};

#[cfg(feature = "web-ui")]
use axum::response::Html;
use {
    anyhow::Context,
    axum::{
        Router,
        extract::{DefaultBodyLimit, State},
        response::{IntoResponse, Json},
        routing::{delete, get, post},
    },
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::info,
};

use crate::{ebay, settings, state::GatewayState, uploads};

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_gateway_app(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = DefaultBodyLimit::max(state.config.server.max_upload_bytes);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/upload", post(uploads::upload_handler))
        .route("/uploads/{filename}", get(uploads::serve_handler))
        .route("/images", get(uploads::list_handler))
        .route("/delete/{filename}", delete(uploads::delete_handler))
        .route("/ebay/config", get(ebay::get_config).post(ebay::post_config))
        .route("/ebay/login", get(ebay::login))
        .route("/ebay/callback", get(ebay::callback))
        .route("/ebay/exchange-token", post(ebay::exchange_token))
        .route("/ebay/create-listing", post(ebay::create_listing))
        .route(
            "/settings/defaults",
            get(settings::get_defaults).post(settings::post_defaults),
        );

    #[cfg(feature = "web-ui")]
    let router = router
        .route("/", get(root_handler))
        .route("/settings", get(settings_page_handler));

    router
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the gateway until the process is stopped.
pub async fn start_gateway(state: Arc<GatewayState>) -> anyhow::Result<()> {
    let server = &state.config.server;
    let addr: SocketAddr = format!("{}:{}", server.bind, server.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", server.bind, server.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let record = state.credentials().load();
    let account = match (record.is_configured(), record.is_authenticated()) {
        (false, _) => "not configured".to_string(),
        (true, false) => format!("{}, not logged in", record.environment),
        (true, true) => format!("{}, logged in", record.environment),
    };

    // Startup banner.
    let lines = [
        format!("snaplist v{}", state.version),
        format!("listening on {addr}"),
        format!("open {} on your phone", state.image_host.base_url()),
        format!("uploads: {}", state.uploads.dir().display()),
        format!("ebay: {account}"),
    ];
    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 4;
    info!("┌{}┐", "─".repeat(width));
    for line in &lines {
        info!("│  {:<w$}│", line, w = width - 2);
    }
    info!("└{}┘", "─".repeat(width));

    let app = build_gateway_app(state);
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
    }))
}

#[cfg(feature = "web-ui")]
async fn root_handler() -> impl IntoResponse {
    Html(include_str!("assets/index.html"))
}

#[cfg(feature = "web-ui")]
async fn settings_page_handler() -> impl IntoResponse {
    Html(include_str!("assets/settings.html"))
}
