use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{IngestError, Result};

/// The size of a session key in bytes (AES-256).
pub const SESSION_KEY_SIZE: usize = 32;

/// A symmetric session key established by the handshake.
///
/// Wraps the raw bytes so they are zeroized on drop and never end up in
/// `Debug` output.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; SESSION_KEY_SIZE]);

impl SessionKey {
    /// Builds a `SessionKey` from unwrapped bytes.
    ///
    /// Clients always generate AES-256 keys, so anything but 32 bytes means
    /// the handshake went wrong and is rejected up front.
    pub fn from_bytes(mut bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != SESSION_KEY_SIZE {
            bytes.zeroize();
            return Err(IngestError::KeyExchange(format!(
                "Session key must be {} bytes, got {}",
                SESSION_KEY_SIZE,
                bytes.len()
            )));
        }
        let mut key = [0u8; SESSION_KEY_SIZE];
        key.copy_from_slice(&bytes);
        bytes.zeroize();
        Ok(Self(key))
    }

    /// Returns a reference to the key as a byte array.
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// The active session keys, one per handshaken client session.
///
/// Every successful handshake mints a fresh session id and binds its key to
/// it, so concurrent clients never clobber each other. Re-handshaking under
/// the same id replaces the previous key (last unwrap wins). Reads during a
/// stream take a clone so an in-flight decrypt keeps a consistent key value.
#[derive(Clone)]
pub struct SessionKeyStore {
    keys: Arc<RwLock<HashMap<Uuid, SessionKey>>>,
}

impl SessionKeyStore {
    /// Creates a new, empty `SessionKeyStore`.
    pub fn new() -> Self {
        Self {
            keys: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Publishes a freshly unwrapped key and returns its session id.
    pub async fn publish(&self, key: SessionKey) -> Uuid {
        let session_id = Uuid::new_v4();
        let mut keys = self.keys.write().await;
        keys.insert(session_id, key);
        session_id
    }

    /// Looks up the key bound to `session_id`.
    ///
    /// Fails with `NoSessionKey` when the handshake never happened, so no
    /// cipher operation is ever attempted with an absent key.
    pub async fn get(&self, session_id: &Uuid) -> Result<SessionKey> {
        let keys = self.keys.read().await;
        keys.get(session_id)
            .cloned()
            .ok_or(IngestError::NoSessionKey)
    }
}

impl Default for SessionKeyStore {
    fn default() -> Self {
        Self::new()
    }
}
