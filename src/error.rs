use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The application's error type.
///
/// Handshake errors are reported inside the handshake response; any error
/// raised while a stream is active aborts the whole stream and rolls back
/// its transaction.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The wrapped session key could not be unwrapped.
    #[error("Key exchange failed: {0}")]
    KeyExchange(String),

    /// A decrypt was attempted before a session key was established.
    #[error("No session key established for this stream")]
    NoSessionKey,

    /// The decrypted plaintext carried malformed block-cipher padding.
    #[error("Bad packet padding: {0}")]
    Padding(String),

    /// The decrypted payload could not be decoded into a flight record.
    #[error("Malformed flight record: {0}")]
    MalformedRecord(String),

    /// The stream body violated the wire framing, timed out, or was cut short.
    #[error("Bad stream framing: {0}")]
    Frame(String),

    /// A database error.
    #[error("Database error: {0}")]
    Storage(#[from] tokio_postgres::Error),

    /// A connection pool error.
    #[error("Database pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
}

/// A `Result` type that uses `IngestError` as the error type.
pub type Result<T> = std::result::Result<T, IngestError>;

impl IngestError {
    fn status(&self) -> StatusCode {
        match self {
            IngestError::KeyExchange(_)
            | IngestError::NoSessionKey
            | IngestError::Padding(_)
            | IngestError::MalformedRecord(_)
            | IngestError::Frame(_) => StatusCode::BAD_REQUEST,
            IngestError::Storage(_) | IngestError::Pool(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            IngestError::Storage(ref e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }
            IngestError::Pool(ref e) => {
                tracing::error!("Database pool error: {}", e);
                "Database error".to_string()
            }
            ref other => {
                tracing::warn!("Request failed: {}", other);
                other.to_string()
            }
        };

        // Every endpoint answers with the same structured pair; callers check
        // `success`, not the transport status.
        let body = sonic_rs::to_string(&sonic_rs::json!({
            "success": false,
            "message": message
        }))
        .unwrap_or_else(|_| r#"{"success":false,"message":"Internal server error"}"#.to_string());

        (status, [("content-type", "application/json")], body).into_response()
    }
}
