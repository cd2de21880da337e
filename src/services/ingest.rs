use axum::body::Bytes;
use deadpool_postgres::Pool;
use futures::{Stream, StreamExt};
use std::time::Duration;
use tokio_postgres::GenericClient;

use crate::crypto::cbc;
use crate::crypto::session::SessionKey;
use crate::error::{IngestError, Result};
use crate::framing::{EncryptedPacket, FrameDecoder};
use crate::models::flight::FlightRecord;
use crate::repositories::flights;

/// Where an ingestion session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session key yet; every decrypt attempt fails.
    AwaitingKey,
    /// Key established, packets are being processed.
    Active,
    /// Stream exhausted with no failure; transaction committed once.
    Completed,
    /// Some packet failed; the whole stream's transaction is rolled back.
    Aborted,
}

/// One client stream's decrypt → decode → normalize pipeline.
///
/// Packets are handled strictly in arrival order; each record finishes (or
/// fails) before the next begins. The first failure at any stage aborts the
/// session for good: there is no retry and no partial commit.
pub struct IngestionSession {
    key: Option<SessionKey>,
    state: SessionState,
    imported: u64,
}

impl IngestionSession {
    /// Creates a session with no key established yet.
    pub fn new() -> Self {
        Self {
            key: None,
            state: SessionState::AwaitingKey,
            imported: 0,
        }
    }

    /// Binds the handshaken key and activates the session.
    pub fn activate(&mut self, key: SessionKey) {
        self.key = Some(key);
        if self.state == SessionState::AwaitingKey {
            self.state = SessionState::Active;
        }
    }

    /// Returns the session's current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns how many records this session has normalized so far.
    pub fn imported(&self) -> u64 {
        self.imported
    }

    /// Decrypts and decodes one packet; any failure aborts the session.
    pub fn accept(&mut self, packet: &EncryptedPacket) -> Result<FlightRecord> {
        match self.open_packet(packet) {
            Ok(record) => Ok(record),
            Err(e) => {
                self.state = SessionState::Aborted;
                Err(e)
            }
        }
    }

    fn open_packet(&self, packet: &EncryptedPacket) -> Result<FlightRecord> {
        if self.state != SessionState::Active {
            return Err(IngestError::NoSessionKey);
        }
        let key = self.key.as_ref().ok_or(IngestError::NoSessionKey)?;
        let plaintext = cbc::decrypt(key, &packet.iv, &packet.ciphertext)?;
        FlightRecord::decode(&plaintext)
    }

    /// Normalizes one accepted record inside the stream's transaction.
    pub async fn persist<C: GenericClient>(
        &mut self,
        tx: &C,
        record: &FlightRecord,
    ) -> Result<()> {
        match flights::normalize(tx, record).await {
            Ok(()) => {
                self.imported += 1;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Aborted;
                Err(e)
            }
        }
    }

    /// Marks the session completed after a clean end of stream and returns
    /// the total record count.
    pub fn complete(&mut self) -> Result<u64> {
        if self.state != SessionState::Active {
            return Err(IngestError::Frame(format!(
                "Stream ended in state {:?}",
                self.state
            )));
        }
        self.state = SessionState::Completed;
        Ok(self.imported)
    }
}

impl Default for IngestionSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs a whole ingestion stream: one transaction, stream-at-a-time
/// atomicity. Either every record in the stream is durably applied, or none
/// are.
pub async fn ingest_stream<S, E>(
    db: &Pool,
    key: SessionKey,
    body: S,
    read_timeout: Duration,
    max_frame_bytes: usize,
) -> Result<u64>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut client = db.get().await?;
    let tx = client.transaction().await?;

    let mut session = IngestionSession::new();
    session.activate(key);

    // Deref the pool's transaction wrapper so the driver sees the plain
    // tokio_postgres transaction, which is what GenericClient covers.
    match drive_stream(&*tx, &mut session, body, read_timeout, max_frame_bytes).await {
        Ok(count) => {
            tx.commit().await?;
            tracing::info!("✅ Stream committed: {} flights imported", count);
            Ok(count)
        }
        Err(e) => {
            // Explicit rollback: every record of the aborted stream is undone.
            if let Err(rb) = tx.rollback().await {
                tracing::error!("Rollback after stream failure also failed: {}", rb);
            }
            tracing::warn!("❌ Stream aborted after {} records: {}", session.imported(), e);
            Err(e)
        }
    }
}

async fn drive_stream<C, S, E>(
    tx: &C,
    session: &mut IngestionSession,
    mut body: S,
    read_timeout: Duration,
    max_frame_bytes: usize,
) -> Result<u64>
where
    C: GenericClient,
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    let mut decoder = FrameDecoder::new(max_frame_bytes);
    loop {
        let chunk = tokio::time::timeout(read_timeout, body.next())
            .await
            .map_err(|_| {
                IngestError::Frame(format!(
                    "Timed out after {}s waiting for the next chunk",
                    read_timeout.as_secs()
                ))
            })?;

        match chunk {
            None => break,
            // An abrupt transport disconnect is an abort, not a clean end.
            Some(Err(e)) => {
                return Err(IngestError::Frame(format!("Transport read failed: {}", e)));
            }
            Some(Ok(bytes)) => {
                decoder.extend(&bytes);
                while let Some(packet) = decoder.try_next()? {
                    let record = session.accept(&packet)?;
                    session.persist(tx, &record).await?;
                    if session.imported() % 10 == 0 {
                        tracing::debug!("Processed {} records...", session.imported());
                    }
                }
            }
        }
    }

    decoder.finish()?;
    session.complete()
}
