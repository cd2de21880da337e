use std::env;
use std::net::SocketAddr;
use anyhow::{Context, Result};

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The socket address the server listens on.
    pub bind_addr: SocketAddr,
    /// The RSA modulus size for the service keypair, in bits.
    pub rsa_key_bits: usize,
    /// How long to wait for the next body chunk of a flight stream.
    pub stream_read_timeout_secs: u64,
    /// Upper bound on a single encrypted packet, in bytes.
    pub max_frame_bytes: usize,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8899".to_string())
                .parse()
                .context("Invalid BIND_ADDR")?,
            rsa_key_bits: env::var("RSA_KEY_BITS")
                .unwrap_or_else(|_| "2048".to_string())
                .parse()
                .context("Invalid RSA_KEY_BITS")?,
            stream_read_timeout_secs: env::var("STREAM_READ_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid STREAM_READ_TIMEOUT_SECS")?,
            max_frame_bytes: env::var("MAX_FRAME_BYTES")
                .unwrap_or_else(|_| (1024 * 1024).to_string())
                .parse()
                .context("Invalid MAX_FRAME_BYTES")?,
        })
    }
}
