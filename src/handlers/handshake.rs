use axum::{Json, extract::State};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{IngestError, Result},
    state::AppState,
};

/// The response payload for a public key request.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    /// The service public key, SubjectPublicKeyInfo/DER, base64-encoded.
    pub public_key: String,
}

/// The request payload for establishing a session key.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SetSessionKeyRequest {
    /// The symmetric key encrypted under our public key (PKCS#1 v1.5),
    /// base64-encoded.
    pub wrapped_key: String,
}

/// The response payload for a session key exchange.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSessionKeyResponse {
    pub success: bool,
    pub message: String,
    /// The id the client must present on its flight streams.
    pub session_id: Uuid,
}

/// Hands out the service public key for session key wrapping.
pub async fn public_key(State(state): State<AppState>) -> Result<Json<PublicKeyResponse>> {
    let der = state.keypair.public_key_der()?;
    tracing::debug!("🔑 Public key requested ({} bytes DER)", der.len());
    Ok(Json(PublicKeyResponse {
        public_key: BASE64.encode(der),
    }))
}

/// Unwraps a client's session key and binds it to a fresh session id.
///
/// Key exchange failures are reported here in the response body, never
/// propagated to the transport layer as opaque errors; a failed unwrap
/// leaves the session store untouched.
pub async fn set_session_key(
    State(state): State<AppState>,
    Json(payload): Json<SetSessionKeyRequest>,
) -> Result<Json<SetSessionKeyResponse>> {
    let wrapped = BASE64
        .decode(&payload.wrapped_key)
        .map_err(|e| IngestError::KeyExchange(format!("wrappedKey is not valid base64: {}", e)))?;

    let key = state.keypair.unwrap_session_key(&wrapped)?;
    let session_id = state.sessions.publish(key).await;
    tracing::info!("🔐 Session key established, session {}", session_id);

    Ok(Json(SetSessionKeyResponse {
        success: true,
        message: "Key accepted".to_string(),
        session_id,
    }))
}
