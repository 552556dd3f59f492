use crate::{
    PianoPIRError,
    pir_internals::{branch_opt_util, entry, params::PianoPIRConfig},
};
use std::sync::atomic::{AtomicU64, Ordering};

/// Represents the server in the Piano **P**rivate **I**nformation **R**etrieval scheme.
///
/// The server owns the raw database, an ordered sequence of variable-length word vectors, one per
/// record. Records beyond the true database size up to the padded bound are implicit zero rows,
/// present only for chunk alignment. The database is treated as immutable between preprocessing
/// epochs; both fetch operations are read-only.
pub struct Server {
    config: PianoPIRConfig,
    raw_db: Vec<Vec<u64>>,
    private_fetch_count: AtomicU64,
}

impl Clone for Server {
    fn clone(&self) -> Self {
        Server {
            config: self.config.clone(),
            raw_db: self.raw_db.clone(),
            private_fetch_count: AtomicU64::new(self.private_fetch_count.load(Ordering::Relaxed)),
        }
    }
}

impl Server {
    /// Wraps a raw database under a configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - The shared client/server configuration.
    /// * `raw_db` - One variable-length word vector per record, 0-based and contiguous.
    ///
    /// # Returns
    ///
    /// * `Result<Server, PianoPIRError>` - The server, or an error if the database holds fewer
    ///   entries than the configured database size or more than the padded bound allows, or any
    ///   entry exceeds the configured maximum word count.
    pub fn new(config: PianoPIRConfig, raw_db: Vec<Vec<u64>>) -> Result<Server, PianoPIRError> {
        // Private fetches index every slot below the configured database size, so a shorter
        // database must be rejected here rather than surface as an out-of-bounds read.
        if branch_opt_util::unlikely(raw_db.len() < config.db_size()) {
            return Err(PianoPIRError::DatabaseShorterThanConfigured);
        }
        if branch_opt_util::unlikely(raw_db.len() > config.padded_db_size()) {
            return Err(PianoPIRError::DatabaseExceedsPaddedCapacity);
        }
        if let Some(idx) = raw_db.iter().position(|record| record.len() > config.max_entry_words()) {
            return Err(PianoPIRError::EntryExceedsMaxWords(idx));
        }

        Ok(Server {
            config,
            raw_db,
            private_fetch_count: AtomicU64::new(0),
        })
    }

    /// Plaintext single-record fetch, zero-padded to the maximum entry word count.
    ///
    /// Indices in the padding range (at or beyond the true database size but below the padded
    /// bound) return an all-zero entry; indices beyond the padded bound are an error.
    pub fn fetch_plain(&self, idx: usize) -> Result<Vec<u64>, PianoPIRError> {
        if branch_opt_util::unlikely(idx >= self.config.padded_db_size()) {
            return Err(PianoPIRError::IndexOutOfRange(idx));
        }

        let mut ret = vec![0u64; self.config.max_entry_words()];
        if idx < self.raw_db.len() {
            let record = &self.raw_db[idx];
            ret[..record.len()].copy_from_slice(record);
        }

        Ok(ret)
    }

    /// Batch-offset fetch: XORs one record per chunk into a single accumulator entry.
    ///
    /// For each chunk `i` the record at `i * chunk_size + offsets[i]` is folded in; chunks whose
    /// resulting absolute index reaches the true database size are skipped. The scan has a fixed
    /// shape across all chunks regardless of which record the client actually wants, which is the
    /// source of the privacy guarantee. This is the only operation whose access pattern the server
    /// observes.
    pub fn fetch_private(&self, offsets: &[u32]) -> Result<Vec<u64>, PianoPIRError> {
        if branch_opt_util::unlikely(offsets.len() != self.config.set_size()) {
            return Err(PianoPIRError::InvalidOffsetVectorLength);
        }
        if branch_opt_util::unlikely(offsets.iter().any(|&offset| offset as usize >= self.config.chunk_size())) {
            return Err(PianoPIRError::ChunkOffsetOutOfRange);
        }

        self.private_fetch_count.fetch_add(1, Ordering::Relaxed);

        let mut accumulator = vec![0u64; self.config.max_entry_words()];
        for (chunk_id, &offset) in offsets.iter().enumerate() {
            let idx = chunk_id * self.config.chunk_size() + offset as usize;

            // Slots at or beyond the true database size are zero padding.
            if branch_opt_util::likely(idx < self.config.db_size()) {
                entry::xor_into(&mut accumulator, &self.raw_db[idx]);
            }
        }

        Ok(accumulator)
    }

    /// Number of private fetches served so far; a diagnostic, not part of the protocol.
    pub fn private_fetch_count(&self) -> u64 {
        self.private_fetch_count.load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub const fn config(&self) -> &PianoPIRConfig {
        &self.config
    }

    pub(crate) fn database(&self) -> &[Vec<u64>] {
        &self.raw_db
    }

    /// Installs the padded database built by a preprocessing run. The old database is dropped,
    /// which is what keeps a new epoch isolated from the one it replaces.
    pub(crate) fn install_database(&mut self, raw_db: Vec<Vec<u64>>) {
        self.raw_db = raw_db;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pir_internals::params::DEFAULT_FAILURE_PROB_LOG2;

    fn one_word_database(num_records: usize) -> Vec<Vec<u64>> {
        (0..num_records as u64).map(|i| vec![i.wrapping_mul(0x9e3779b97f4a7c15) | 1]).collect()
    }

    #[test]
    fn plain_fetch_pads_and_bounds() {
        let config = PianoPIRConfig::new(16, 2, 8, 1, DEFAULT_FAILURE_PROB_LOG2).unwrap();
        let server = Server::new(config.clone(), one_word_database(16)).unwrap();

        let record = server.fetch_plain(3).unwrap();
        assert_eq!(record.len(), config.max_entry_words());
        assert_ne!(record[0], 0);
        assert_eq!(record[1], 0);

        // Padding range reads as all-zero, past the padded bound errors.
        assert_eq!(server.fetch_plain(config.db_size()).unwrap(), vec![0u64; 2]);
        assert_eq!(server.fetch_plain(config.padded_db_size()), Err(PianoPIRError::IndexOutOfRange(config.padded_db_size())));
    }

    #[test]
    fn private_fetch_validates_offset_vector_shape() {
        let config = PianoPIRConfig::new(16, 1, 8, 1, DEFAULT_FAILURE_PROB_LOG2).unwrap();
        let server = Server::new(config.clone(), one_word_database(16)).unwrap();

        let short = vec![0u32; config.set_size() - 1];
        assert_eq!(server.fetch_private(&short), Err(PianoPIRError::InvalidOffsetVectorLength));

        let oversized_offset = vec![config.chunk_size() as u32; config.set_size()];
        assert_eq!(server.fetch_private(&oversized_offset), Err(PianoPIRError::ChunkOffsetOutOfRange));

        assert_eq!(server.private_fetch_count(), 0);
        assert!(server.fetch_private(&vec![0u32; config.set_size()]).is_ok());
        assert_eq!(server.private_fetch_count(), 1);
    }

    #[test]
    fn private_fetch_xors_one_record_per_live_chunk() {
        let config = PianoPIRConfig::new(16, 1, 8, 1, DEFAULT_FAILURE_PROB_LOG2).unwrap();
        let db = one_word_database(16);
        let server = Server::new(config.clone(), db.clone()).unwrap();

        // Chunks 0 and 1 cover the 16 live records; chunks 2 and 3 are pure padding.
        let offsets = vec![5u32, 2, 7, 1];
        let accumulator = server.fetch_private(&offsets).unwrap();

        let expected = db[5][0] ^ db[config.chunk_size() + 2][0];
        assert_eq!(accumulator, vec![expected]);
    }

    #[test]
    fn constructor_rejects_misshapen_databases() {
        let config = PianoPIRConfig::new(16, 1, 8, 1, DEFAULT_FAILURE_PROB_LOG2).unwrap();

        // A database shorter than the configured size would leave a gap below `db_size` that a
        // private fetch (e.g. chunk 1, offset 4 under this config) would otherwise index into.
        let short_db = one_word_database(10);
        assert_eq!(Server::new(config.clone(), short_db).err(), Some(PianoPIRError::DatabaseShorterThanConfigured));

        let oversized_db = one_word_database(config.padded_db_size() + 1);
        assert_eq!(Server::new(config.clone(), oversized_db).err(), Some(PianoPIRError::DatabaseExceedsPaddedCapacity));

        let mut wide_entry_db = one_word_database(16);
        wide_entry_db[7] = vec![1, 2];
        assert_eq!(Server::new(config, wide_entry_db).err(), Some(PianoPIRError::EntryExceedsMaxWords(7)));
    }
}
