use crate::crypto::cbc::IV_SIZE;
use crate::error::{IngestError, Result};

/// One encrypted flight record as it arrives on the stream.
///
/// Transient: consumed by the ingestion pipeline immediately, never retained.
#[derive(Debug)]
pub struct EncryptedPacket {
    /// The CBC initialization vector for this packet.
    pub iv: [u8; IV_SIZE],
    /// The AES-CBC ciphertext of the serialized record.
    pub ciphertext: Vec<u8>,
}

/// Incremental decoder for the stream body's packet framing.
///
/// Wire layout per packet: `[iv: 16 bytes][len: u32 BE][ciphertext: len]`.
/// Body chunks arrive at arbitrary boundaries, so the decoder buffers input
/// and yields packets as they complete.
pub struct FrameDecoder {
    buf: Vec<u8>,
    pos: usize,
    max_frame_bytes: usize,
}

const LEN_SIZE: usize = 4;

impl FrameDecoder {
    /// Creates a decoder that rejects ciphertexts larger than
    /// `max_frame_bytes`.
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buf: Vec::new(),
            pos: 0,
            max_frame_bytes,
        }
    }

    /// Appends a body chunk to the internal buffer.
    pub fn extend(&mut self, chunk: &[u8]) {
        // Drop consumed bytes before buffering more.
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        self.buf.extend_from_slice(chunk);
    }

    /// Takes the next complete packet off the buffer, if one is available.
    pub fn try_next(&mut self) -> Result<Option<EncryptedPacket>> {
        let pending = &self.buf[self.pos..];
        if pending.len() < IV_SIZE + LEN_SIZE {
            return Ok(None);
        }

        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&pending[..IV_SIZE]);

        let mut len_bytes = [0u8; LEN_SIZE];
        len_bytes.copy_from_slice(&pending[IV_SIZE..IV_SIZE + LEN_SIZE]);
        let len = u32::from_be_bytes(len_bytes) as usize;
        if len == 0 || len > self.max_frame_bytes {
            return Err(IngestError::Frame(format!(
                "Packet length {} outside [1, {}]",
                len, self.max_frame_bytes
            )));
        }

        let total = IV_SIZE + LEN_SIZE + len;
        if pending.len() < total {
            return Ok(None);
        }

        let ciphertext = pending[IV_SIZE + LEN_SIZE..total].to_vec();
        self.pos += total;
        Ok(Some(EncryptedPacket { iv, ciphertext }))
    }

    /// Called at end of stream: any buffered leftover means the body was cut
    /// off mid-packet.
    pub fn finish(self) -> Result<()> {
        if self.buf.len() > self.pos {
            return Err(IngestError::Frame(format!(
                "Stream ended mid-packet with {} leftover bytes",
                self.buf.len() - self.pos
            )));
        }
        Ok(())
    }
}
