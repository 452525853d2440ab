//! # Eco Points Backend
//!
//! Tracks a points score and logged eco actions per user, and summarizes a
//! user's environmental impact through a chat completion model.
//!
//!
//!
//! # General Infrastructure
//! - React frontend on `localhost:3000`/`localhost:3001` talks to this server over JSON
//! - Profiles and actions live in a remote Supabase/PostgREST database
//! - Chat summaries go to an OpenAI-compatible completions endpoint
//! - Every client is built once at startup and shared through [`state::AppState`]
//!
//!
//!
//! # Routes
//!
//! | Method | Path | Body / Query | Returns |
//! |---|---|---|---|
//! | POST | `/initialize-score` | `user_id`, `points` | `message`, `data` |
//! | POST | `/add-score` | `user_id`, `points` | `message`, `old_points`, `new_points`, `data` |
//! | GET | `/get-score` | `?user_id=` | `user_id`, `points` |
//! | POST | `/log-action` | eco action fields | `message`, `action`, `new_total_points` |
//! | POST | `/chat` | `message`, optional `user_id` | `reply`, `totals` |
//! | POST | `/basic_chat` | `message` | `reply` |
//! | GET | `/ping` | | `status` |
//!
//! Errors come back as `{"detail": "..."}`: 404 for unknown users or users
//! without actions, 422 for malformed input, 500 for store or model failures.
//!
//!
//!
//! # Setup
//!
//! Environment, or a `.env` file next to the binary.
//! ```sh
//! SUPABASE_URL=https://<project>.supabase.co
//! SUPABASE_KEY=<service key>
//! OPENAI_API_KEY=<key>        # optional, /chat fails without it
//! RUST_PORT=8000
//! RUST_LOG=info,server=debug
//! ```
//!
//! Run against an in-memory store instead.
//! ```sh
//! STORE_BACKEND=memory MEMORY_PROFILES=alice,bob cargo run --bin eco
//! ```
use std::sync::Arc;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod completion;
pub mod config;
pub mod database;
pub mod error;
pub mod impact;
pub mod routes;
pub mod scoring;
pub mod state;
pub mod utils;

use config::Config;
use routes::{
    add_score_handler, basic_chat_handler, chat_handler, get_score_handler,
    initialize_score_handler, log_action_handler, ping_handler,
};
use state::AppState;

pub const ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:3001"];

pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(&config).await?;

    info!("Starting server...");
    let app = app(state);

    let address = format!("0.0.0.0:{}", config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/initialize-score", post(initialize_score_handler))
        .route("/add-score", post(add_score_handler))
        .route("/get-score", get(get_score_handler))
        .route("/log-action", post(log_action_handler))
        .route("/chat", post(chat_handler))
        .route("/basic_chat", post(basic_chat_handler))
        .route("/ping", get(ping_handler))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Credentials rule out `*`, so methods and headers mirror the preflight.
fn cors() -> CorsLayer {
    let origins = ALLOWED_ORIGINS.map(HeaderValue::from_static);

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
