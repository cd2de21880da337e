use aes::cipher::{BlockDecryptMut, KeyIvInit, block_padding::NoPadding};

use crate::crypto::session::SessionKey;
use crate::error::{IngestError, Result};

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// The AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;
/// The size of the CBC initialization vector in bytes.
pub const IV_SIZE: usize = 16;

/// Decrypts one encrypted packet into raw serialized-record bytes.
///
/// Runs AES-256-CBC with the packet's IV, then strips PKCS#7 padding. The
/// padding is validated explicitly: a pad value outside [1, BLOCK_SIZE] or
/// trailing bytes that disagree with it mean a corrupted/forged packet or a
/// key mismatch, and fail with `Padding` instead of silently truncating.
pub fn decrypt(key: &SessionKey, iv: &[u8; IV_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(IngestError::Padding(format!(
            "Ciphertext length {} is not a positive multiple of the block size",
            ciphertext.len()
        )));
    }

    let mut buf = ciphertext.to_vec();
    let decryptor = Aes256CbcDec::new(key.as_bytes().into(), iv.into());
    let padded_len = decryptor
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|e| IngestError::Padding(format!("Block decryption failed: {}", e)))?
        .len();
    buf.truncate(padded_len);

    let plain_len = validated_content_len(&buf)?;
    buf.truncate(plain_len);
    Ok(buf)
}

/// Returns the content length of a PKCS#7-padded buffer, or fails with
/// `Padding` when the trailer is inconsistent.
fn validated_content_len(padded: &[u8]) -> Result<usize> {
    // decrypt() guarantees a non-empty, block-aligned buffer.
    let pad_len = padded[padded.len() - 1] as usize;
    if pad_len == 0 || pad_len > BLOCK_SIZE {
        return Err(IngestError::Padding(format!(
            "Pad length {} outside [1, {}]",
            pad_len, BLOCK_SIZE
        )));
    }
    let content_len = padded.len() - pad_len;
    if padded[content_len..].iter().any(|&b| b as usize != pad_len) {
        return Err(IngestError::Padding(
            "Trailing bytes disagree with the declared pad length".to_string(),
        ));
    }
    Ok(content_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes::cipher::{BlockEncryptMut, block_padding::Pkcs7};

    type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;

    fn key() -> SessionKey {
        SessionKey::from_bytes(vec![0x42; 32]).unwrap()
    }

    fn encrypt_pkcs7(key: &SessionKey, iv: &[u8; IV_SIZE], plaintext: &[u8]) -> Vec<u8> {
        Aes256CbcEnc::new(key.as_bytes().into(), iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    fn encrypt_raw(key: &SessionKey, iv: &[u8; IV_SIZE], padded: &[u8]) -> Vec<u8> {
        Aes256CbcEnc::new(key.as_bytes().into(), iv.into())
            .encrypt_padded_vec_mut::<NoPadding>(padded)
    }

    #[test]
    fn round_trips_a_padded_message() {
        let key = key();
        let iv = [3u8; IV_SIZE];
        let plaintext = b"flight record payload";
        let ciphertext = encrypt_pkcs7(&key, &iv, plaintext);
        assert_eq!(decrypt(&key, &iv, &ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn round_trips_an_exact_block_message() {
        // A 16-byte plaintext forces a full extra padding block.
        let key = key();
        let iv = [0u8; IV_SIZE];
        let plaintext = [0xAB; 16];
        let ciphertext = encrypt_pkcs7(&key, &iv, &plaintext);
        assert_eq!(ciphertext.len(), 32);
        assert_eq!(decrypt(&key, &iv, &ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn rejects_unaligned_ciphertext() {
        let err = decrypt(&key(), &[0u8; IV_SIZE], &[1u8; 15]).unwrap_err();
        assert!(matches!(err, IngestError::Padding(_)));
    }

    #[test]
    fn rejects_empty_ciphertext() {
        let err = decrypt(&key(), &[0u8; IV_SIZE], &[]).unwrap_err();
        assert!(matches!(err, IngestError::Padding(_)));
    }

    #[test]
    fn rejects_zero_pad_length() {
        let key = key();
        let iv = [0u8; IV_SIZE];
        let mut padded = [7u8; 16];
        padded[15] = 0;
        let ciphertext = encrypt_raw(&key, &iv, &padded);
        let err = decrypt(&key, &iv, &ciphertext).unwrap_err();
        assert!(matches!(err, IngestError::Padding(_)));
    }

    #[test]
    fn rejects_pad_length_beyond_block_size() {
        let key = key();
        let iv = [0u8; IV_SIZE];
        let mut padded = [7u8; 16];
        padded[15] = 17;
        let ciphertext = encrypt_raw(&key, &iv, &padded);
        let err = decrypt(&key, &iv, &ciphertext).unwrap_err();
        assert!(matches!(err, IngestError::Padding(_)));
    }

    #[test]
    fn rejects_inconsistent_padding_bytes() {
        let key = key();
        let iv = [0u8; IV_SIZE];
        // Claims 4 bytes of padding but one of them is wrong.
        let mut padded = [7u8; 16];
        padded[12] = 4;
        padded[13] = 9;
        padded[14] = 4;
        padded[15] = 4;
        let ciphertext = encrypt_raw(&key, &iv, &padded);
        let err = decrypt(&key, &iv, &ciphertext).unwrap_err();
        assert!(matches!(err, IngestError::Padding(_)));
    }

    #[test]
    fn wrong_key_does_not_silently_truncate() {
        let key = key();
        let other = SessionKey::from_bytes(vec![0x43; 32]).unwrap();
        let iv = [5u8; IV_SIZE];
        let ciphertext = encrypt_pkcs7(&key, &iv, b"some payload");
        // Decrypting under the wrong key yields garbage padding almost always;
        // the strict check turns that into an error instead of a bogus record.
        if let Ok(plain) = decrypt(&other, &iv, &ciphertext) {
            assert_ne!(plain, b"some payload");
        }
    }
}
