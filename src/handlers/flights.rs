use axum::{
    Json,
    body::Body,
    extract::State,
    http::HeaderMap,
};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    error::{IngestError, Result},
    services::ingest,
    state::AppState,
};

/// The final summary returned after an ingestion stream ends.
#[derive(Serialize)]
pub struct StreamSummary {
    pub success: bool,
    pub message: String,
}

/// Ingests one stream of encrypted flight packets.
///
/// The client presents its handshaken session via the `x-session-id` header
/// and streams framed packets in the request body. One response comes back
/// after the stream ends: either the import count, or the first error that
/// aborted (and rolled back) the whole stream.
pub async fn stream_flights(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<StreamSummary>> {
    let session_id = headers
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or(IngestError::NoSessionKey)?;
    let key = state.sessions.get(&session_id).await?;

    tracing::info!("📥 Flight stream started, session {}", session_id);
    let count = ingest::ingest_stream(
        &state.db,
        key,
        body.into_data_stream(),
        Duration::from_secs(state.config.stream_read_timeout_secs),
        state.config.max_frame_bytes,
    )
    .await?;

    Ok(Json(StreamSummary {
        success: true,
        message: format!("Imported {} flights", count),
    }))
}
