use axum::{
    Router,
    routing::{get, post},
};

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

mod config;
mod db;
mod error;
mod framing;
mod migration;
mod state;

mod crypto {
    pub mod cbc;
    pub mod keypair;
    pub mod session;
}

mod models {
    pub mod flight;
}

mod repositories {
    pub mod flights;
}

mod services {
    pub mod ingest;
}

mod handlers {
    pub mod flights;
    pub mod handshake;
}

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config)?;
    tracing::info!("✅ AppState initialized");

    migration::run_migrations(&state.db).await?;

    let app = Router::new()
        .route("/api/handshake/public-key", get(handlers::handshake::public_key))
        .route("/api/handshake/session-key", post(handlers::handshake::set_session_key))
        .route("/api/flights/stream", post(handlers::flights::stream_flights))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .with_state(state.clone());

    tracing::info!("🚀 Server listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
