use crate::{
    PianoPIRError,
    client::Client,
    pir_internals::params::PianoPIRConfig,
    server::Server,
};
use rand_chacha::ChaCha8Rng;

/// Pairs one [`Client`] with one [`Server`] under a shared configuration.
///
/// The facade drives the offline phase, re-triggers it transparently when the client's per-epoch
/// query budget is spent, and reports the amortized communication and storage costs of the
/// configuration.
pub struct PianoPIR {
    client: Client,
    server: Server,
}

impl PianoPIR {
    /// Builds a client/server pair over a raw database. The offline phase has not run yet;
    /// either call [`PianoPIR::preprocessing`] explicitly or let the first [`PianoPIR::query`]
    /// trigger it.
    pub fn new(config: PianoPIRConfig, raw_db: Vec<Vec<u64>>) -> Result<PianoPIR, PianoPIRError> {
        let client = Client::new(config.clone());
        let server = Server::new(config, raw_db)?;

        Ok(PianoPIR { client, server })
    }

    /// Same as [`PianoPIR::new`], with all client randomness drawn from the given CSPRNG.
    pub fn with_rng(config: PianoPIRConfig, raw_db: Vec<Vec<u64>>, rng: ChaCha8Rng) -> Result<PianoPIR, PianoPIRError> {
        let client = Client::with_rng(config.clone(), rng);
        let server = Server::new(config, raw_db)?;

        Ok(PianoPIR { client, server })
    }

    /// Runs the offline phase for a fresh epoch.
    ///
    /// The server's database is deep-copied before the client touches it, so in-flight reads
    /// against the previous epoch are never corrupted; the padded copy then replaces the served
    /// database. A failure here is fatal to the epoch and is not retried.
    pub fn preprocessing(&mut self) -> Result<(), PianoPIRError> {
        let mut raw_db = self.server.database().to_vec();
        self.client.preprocessing(&mut raw_db)?;
        self.server.install_database(raw_db);

        Ok(())
    }

    /// Retrieves the record at `idx` without revealing `idx` to the server.
    ///
    /// If the client has not preprocessed yet, or has exhausted its per-epoch budget, one fresh
    /// preprocessing run is triggered first. Every other error, including the expected
    /// bounded-probability `NoCoveringHint` miss, surfaces to the caller untouched.
    pub fn query(&mut self, idx: usize) -> Result<Vec<u64>, PianoPIRError> {
        if self.client.is_exhausted() {
            self.preprocessing()?;
        }

        match self.client.query(idx, &self.server) {
            Err(PianoPIRError::PreprocessingRequired) => {
                self.preprocessing()?;
                self.client.query(idx, &self.server)
            }
            result => result,
        }
    }

    /// Issues a decoy private fetch whose shape is indistinguishable from a real query.
    pub fn dummy_query(&mut self) -> Result<(), PianoPIRError> {
        self.client.dummy_query(&self.server)
    }

    /// Amortized per-query communication in bytes: `set_size` 32-bit offsets uploaded and
    /// `max_entry_words` 64-bit words downloaded.
    pub fn comm_cost_per_query_bytes(&self) -> usize {
        let config = self.client.config();
        config.set_size() * 4 + config.max_entry_words() * 8
    }

    /// Client-side storage footprint in bytes.
    pub fn local_storage_bytes(&self) -> usize {
        self.client.local_storage_bytes()
    }

    #[inline(always)]
    pub const fn config(&self) -> &PianoPIRConfig {
        self.client.config()
    }
    #[inline(always)]
    pub const fn client(&self) -> &Client {
        &self.client
    }
    #[inline(always)]
    pub const fn server(&self) -> &Server {
        &self.server
    }
}
