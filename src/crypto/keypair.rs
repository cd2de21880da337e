use rand::rngs::OsRng;
use rsa::pkcs8::EncodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

use crate::crypto::session::SessionKey;
use crate::error::{IngestError, Result};

/// The service's asymmetric keypair.
///
/// Generated once at startup and held for the process lifetime; the key is
/// never persisted, so every restart starts a fresh trust-on-first-use
/// identity. The private component never leaves this struct.
pub struct ServiceKeypair {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl ServiceKeypair {
    /// Generates a fresh RSA keypair with the given modulus size.
    ///
    /// Generation failure is fatal to service startup; there is no error path
    /// under normal operation.
    pub fn generate(bits: usize) -> anyhow::Result<Self> {
        let private_key = RsaPrivateKey::new(&mut OsRng, bits)?;
        let public_key = RsaPublicKey::from(&private_key);
        Ok(Self {
            private_key,
            public_key,
        })
    }

    /// Returns the public key encoded as SubjectPublicKeyInfo/DER, so any
    /// remote runtime can parse it without format-specific tooling.
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        self.public_key
            .to_public_key_der()
            .map(|der| der.as_bytes().to_vec())
            .map_err(|e| IngestError::KeyExchange(format!("Failed to encode public key: {}", e)))
    }

    /// Unwraps a client-provided session key blob.
    ///
    /// The blob is the symmetric key encrypted under our public key with
    /// PKCS#1 v1.5 padding (the de-facto default of most client crypto
    /// libraries; it has to match bit-for-bit). A malformed blob, wrong
    /// padding, or wrong key yields `KeyExchange` and leaves no side effects.
    pub fn unwrap_session_key(&self, wrapped_key: &[u8]) -> Result<SessionKey> {
        let key_bytes = self
            .private_key
            .decrypt(Pkcs1v15Encrypt, wrapped_key)
            .map_err(|e| IngestError::KeyExchange(format!("Failed to unwrap session key: {}", e)))?;
        SessionKey::from_bytes(key_bytes)
    }
}

impl std::fmt::Debug for ServiceKeypair {
    // The private component must never reach logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceKeypair").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::DecodePublicKey;

    fn test_keypair() -> ServiceKeypair {
        // 1024-bit keeps test key generation fast.
        ServiceKeypair::generate(1024).unwrap()
    }

    #[test]
    fn exported_public_key_is_valid_spki_der() {
        let keypair = test_keypair();
        let der = keypair.public_key_der().unwrap();
        let parsed = RsaPublicKey::from_public_key_der(&der).unwrap();
        assert_eq!(parsed, keypair.public_key);
    }

    #[test]
    fn unwraps_a_pkcs1v15_wrapped_key() {
        let keypair = test_keypair();
        let der = keypair.public_key_der().unwrap();
        let client_side = RsaPublicKey::from_public_key_der(&der).unwrap();

        let raw_key = [7u8; 32];
        let wrapped = client_side
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, &raw_key)
            .unwrap();

        let session_key = keypair.unwrap_session_key(&wrapped).unwrap();
        assert_eq!(session_key.as_bytes(), &raw_key);
    }

    #[test]
    fn rejects_a_garbage_blob() {
        let keypair = test_keypair();
        let err = keypair.unwrap_session_key(&[0u8; 128]).unwrap_err();
        assert!(matches!(err, IngestError::KeyExchange(_)));
    }

    #[test]
    fn rejects_a_key_wrapped_for_someone_else() {
        let keypair = test_keypair();
        let other = test_keypair();
        let wrapped = other
            .public_key
            .encrypt(&mut OsRng, Pkcs1v15Encrypt, &[7u8; 32])
            .unwrap();
        // Wrong private key: either the padding check fails or the recovered
        // bytes have the wrong length. Both must surface as KeyExchange.
        let err = keypair.unwrap_session_key(&wrapped).unwrap_err();
        assert!(matches!(err, IngestError::KeyExchange(_)));
    }
}
