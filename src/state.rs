use deadpool_postgres::Pool;
use std::sync::Arc;

use crate::config::Config;
use crate::crypto::keypair::ServiceKeypair;
use crate::crypto::session::SessionKeyStore;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The database connection pool.
    pub db: Pool,
    /// The service's process-lifetime RSA keypair.
    pub keypair: Arc<ServiceKeypair>,
    /// The per-session symmetric keys established by handshakes.
    pub sessions: SessionKeyStore,
    /// The application's configuration.
    pub config: Config,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let db = crate::db::create_pool(&config.database_url)?;
        tracing::info!("✅ PostgreSQL pool initialized with deadpool-postgres");

        // Key generation failure (entropy exhaustion, unsupported modulus)
        // is fatal to startup.
        let keypair = Arc::new(ServiceKeypair::generate(config.rsa_key_bits)?);
        tracing::info!("✅ Service RSA-{} keypair generated", config.rsa_key_bits);

        let sessions = SessionKeyStore::new();
        tracing::info!("✅ Session key store initialized");

        Ok(AppState {
            db,
            keypair,
            sessions,
            config: config.clone(),
        })
    }
}
