use crate::{
    PianoPIRError,
    pir_internals::{
        branch_opt_util, entry,
        params::PianoPIRConfig,
        prf::{Prf, PrfKey},
    },
    server::Server,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::collections::HashMap;

/// One primary hint: a PRF tag selecting one offset per chunk, the XOR parity of the records it
/// selects, and the absolute index this hint was last forced to cover.
///
/// `program_point` of `None` means the hint is unprogrammed and every offset comes straight from
/// the PRF; `Some(idx)` overrides the natural offset of `idx`'s chunk with `idx` itself.
struct PrimaryHint {
    short_tag: u64,
    parity: Vec<u64>,
    program_point: Option<usize>,
}

/// A backup hint waiting to replace a consumed primary hint. Its parity deliberately excludes the
/// chunk it is provisioned for, so that folding in a query response makes it whole.
struct BackupHint {
    short_tag: u64,
    parity: Vec<u64>,
}

/// A pre-chosen (index, value) pair inside one chunk, consumed in allocation order to mask the
/// true target of a real query into that chunk.
struct ReplacementSlot {
    index: usize,
    value: Vec<u64>,
}

/// Represents the stateful client in the Piano **P**rivate **I**nformation **R**etrieval scheme.
///
/// The client owns all cryptographic state of an epoch: the PRF key, the primary and backup hint
/// tables, the replacement slots, the per-chunk query histogram and the local result cache. It is
/// a single-owner state machine; independent logical clients get independent instances and never
/// share tables.
pub struct Client {
    config: PianoPIRConfig,
    prf: Prf,
    rng: ChaCha8Rng,

    preprocessed: bool,
    max_query_num: usize,
    finished_query_num: usize,
    max_query_per_chunk: usize,
    query_histogram: Vec<usize>,

    primary_hints: Vec<PrimaryHint>,
    backup_hints: Vec<Vec<BackupHint>>,
    replacements: Vec<Vec<ReplacementSlot>>,

    local_cache: HashMap<usize, Vec<u64>>,
}

impl Client {
    /// Creates a client with OS-entropy randomness.
    pub fn new(config: PianoPIRConfig) -> Client {
        Client::with_rng(config, ChaCha8Rng::from_os_rng())
    }

    /// Creates a client drawing all randomness (PRF keys, replacement offsets, dummy-query
    /// offsets) from the given CSPRNG, so tests can supply deterministic seeds.
    pub fn with_rng(config: PianoPIRConfig, mut rng: ChaCha8Rng) -> Client {
        let max_query_num = config.max_query_num();
        let max_query_per_chunk = config.max_query_per_chunk();
        let prf = Prf::new(&Prf::random_key(&mut rng));

        Client {
            config,
            prf,
            rng,

            preprocessed: false,
            max_query_num,
            finished_query_num: 0,
            max_query_per_chunk,
            query_histogram: Vec::new(),

            primary_hints: Vec::new(),
            backup_hints: Vec::new(),
            replacements: Vec::new(),

            local_cache: HashMap::new(),
        }
    }

    /// Destroys and rebuilds all epoch state: fresh PRF key, zeroed parities, sequential short
    /// tags across the primary and backup tables, cleared histogram and cache.
    fn initialize(&mut self) {
        let key: PrfKey = Prf::random_key(&mut self.rng);
        self.prf = Prf::new(&key);

        self.preprocessed = false;
        self.finished_query_num = 0;
        self.query_histogram = vec![0; self.config.set_size()];

        let max_entry_words = self.config.max_entry_words();
        let mut short_tag_count = 0u64;

        self.primary_hints = (0..self.config.primary_hint_num())
            .map(|_| {
                let hint = PrimaryHint {
                    short_tag: short_tag_count,
                    parity: vec![0u64; max_entry_words],
                    program_point: None,
                };
                short_tag_count += 1;
                hint
            })
            .collect();

        self.backup_hints = (0..self.config.set_size())
            .map(|_| {
                (0..self.max_query_per_chunk)
                    .map(|_| {
                        let hint = BackupHint {
                            short_tag: short_tag_count,
                            parity: vec![0u64; max_entry_words],
                        };
                        short_tag_count += 1;
                        hint
                    })
                    .collect()
            })
            .collect();

        self.replacements = (0..self.config.set_size())
            .map(|_| {
                (0..self.max_query_per_chunk)
                    .map(|_| ReplacementSlot {
                        index: 0,
                        value: vec![0u64; max_entry_words],
                    })
                    .collect()
            })
            .collect();

        self.local_cache = HashMap::new();
    }

    /// Runs the offline phase against a deep copy of the server's database.
    ///
    /// The database is zero-padded in place up to `chunk_size * set_size` slots, then swept one
    /// chunk at a time: every primary hint and every backup hint provisioned for a *different*
    /// chunk folds its PRF-selected record of this chunk into its parity, and this chunk's
    /// replacement slots are drawn uniformly at random. After this returns the client is
    /// queryable until its per-epoch budget runs out.
    ///
    /// # Arguments
    ///
    /// * `raw_db` - A deep copy of the server's database; padded in place and afterwards suitable
    ///   for installation back into the server.
    ///
    /// # Returns
    ///
    /// * `Result<(), PianoPIRError>` - An error if the database is shorter than the configured
    ///   database size, exceeds the padded capacity, or holds an entry longer than the configured
    ///   maximum word count; such a failure is fatal to the epoch.
    pub fn preprocessing(&mut self, raw_db: &mut Vec<Vec<u64>>) -> Result<(), PianoPIRError> {
        self.initialize();

        if branch_opt_util::unlikely(raw_db.len() < self.config.db_size()) {
            return Err(PianoPIRError::DatabaseShorterThanConfigured);
        }
        if branch_opt_util::unlikely(raw_db.len() > self.config.padded_db_size()) {
            return Err(PianoPIRError::DatabaseExceedsPaddedCapacity);
        }
        if let Some(idx) = raw_db.iter().position(|record| record.len() > self.config.max_entry_words()) {
            return Err(PianoPIRError::EntryExceedsMaxWords(idx));
        }
        raw_db.resize_with(self.config.padded_db_size(), || vec![0u64; self.config.max_entry_words()]);

        let chunk_size = self.config.chunk_size();
        let chunk_mask = (chunk_size - 1) as u64;

        for chunk_id in 0..self.config.set_size() {
            let chunk = &raw_db[chunk_id * chunk_size..(chunk_id + 1) * chunk_size];
            let prf = &self.prf;

            // Each hint's writes are confined to its own parity buffer, so the sweep over hints
            // is embarrassingly parallel.
            self.primary_hints.par_iter_mut().for_each(|hint| {
                let offset = (prf.eval(hint.short_tag, chunk_id as u64) & chunk_mask) as usize;
                entry::xor_into(&mut hint.parity, &chunk[offset]);
            });

            // A backup hint must never see its own chunk of residence; the query that later
            // promotes it supplies that contribution.
            self.backup_hints.par_iter_mut().enumerate().for_each(|(home_chunk, hints)| {
                if home_chunk == chunk_id {
                    return;
                }
                for hint in hints.iter_mut() {
                    let offset = (prf.eval(hint.short_tag, chunk_id as u64) & chunk_mask) as usize;
                    entry::xor_into(&mut hint.parity, &chunk[offset]);
                }
            });

            for slot in self.replacements[chunk_id].iter_mut() {
                let offset = (self.rng.random::<u64>() & chunk_mask) as usize;
                let record = &chunk[offset];

                slot.index = chunk_id * chunk_size + offset;
                slot.value.fill(0);
                slot.value[..record.len()].copy_from_slice(record);
            }
        }

        self.preprocessed = true;
        Ok(())
    }

    /// Runs the online protocol for the record at absolute index `idx`.
    ///
    /// Previously queried indices are served from the local cache without any server interaction.
    /// Otherwise one hit hint is consumed, masked with a replacement slot, sent to the server as
    /// a full per-chunk offset vector, and refreshed from the backup table; the decoded record is
    /// cached and returned.
    ///
    /// A `NoCoveringHint` error is an expected, bounded-probability miss (≤ 2^-failure_prob_log2
    /// per query), not a corruption; whether to retry or drop the index is the caller's call.
    pub fn query(&mut self, idx: usize, server: &Server) -> Result<Vec<u64>, PianoPIRError> {
        if branch_opt_util::unlikely(idx >= self.config.db_size()) {
            return Err(PianoPIRError::IndexOutOfRange(idx));
        }
        if branch_opt_util::unlikely(!self.preprocessed) {
            return Err(PianoPIRError::PreprocessingRequired);
        }

        if let Some(cached) = self.local_cache.get(&idx) {
            return Ok(cached.clone());
        }

        if self.finished_query_num >= self.max_query_num {
            return Err(PianoPIRError::QueryBudgetExhausted);
        }

        let chunk_size = self.config.chunk_size();
        let chunk_mask = (chunk_size - 1) as u64;
        let chunk_id = idx / chunk_size;
        let offset = idx % chunk_size;

        if self.query_histogram[chunk_id] >= self.max_query_per_chunk {
            return Err(PianoPIRError::ChunkQueryBudgetExhausted(chunk_id));
        }

        // Scan for a hit: a primary hint whose derived offset into this chunk matches, and which
        // was not already programmed into this very chunk (its derived offset would be stale).
        let hit_id = self
            .primary_hints
            .iter()
            .position(|hint| {
                (self.prf.eval(hint.short_tag, chunk_id as u64) & chunk_mask) as usize == offset
                    && match hint.program_point {
                        None => true,
                        Some(programmed_idx) => programmed_idx / chunk_size != chunk_id,
                    }
            })
            .ok_or(PianoPIRError::NoCoveringHint)?;

        // Expand the hit hint into one offset per chunk; a programmed hint must reproduce the
        // exact index it was forced to cover.
        let hit_tag = self.primary_hints[hit_id].short_tag;
        let mut offsets: Vec<u32> = (0..self.config.set_size()).map(|c| (self.prf.eval(hit_tag, c as u64) & chunk_mask) as u32).collect();
        if let Some(programmed_idx) = self.primary_hints[hit_id].program_point {
            offsets[programmed_idx / chunk_size] = (programmed_idx % chunk_size) as u32;
        }

        // Mask the true target: the next unconsumed replacement slot of this chunk stands in for
        // it, so the server sees one consistent-looking offset per chunk.
        let in_group_idx = self.query_histogram[chunk_id];
        offsets[chunk_id] = (self.replacements[chunk_id][in_group_idx].index % chunk_size) as u32;

        let mut response = server.fetch_private(&offsets)?;
        if branch_opt_util::unlikely(response.len() != self.config.max_entry_words()) {
            return Err(PianoPIRError::InvalidResponseShape);
        }

        // Undo the replacement contribution and the hint's parity; what remains is the record.
        entry::xor_into(&mut response, &self.replacements[chunk_id][in_group_idx].value);
        entry::xor_into(&mut response, &self.primary_hints[hit_id].parity);

        // Refresh: promote the next backup hint of this chunk into the consumed primary slot.
        // Folding the response into the promoted parity supplies the one chunk contribution the
        // backup was built without.
        let promoted_tag = self.backup_hints[chunk_id][in_group_idx].short_tag;
        let mut promoted_parity = std::mem::take(&mut self.backup_hints[chunk_id][in_group_idx].parity);
        entry::xor_into(&mut promoted_parity, &response);

        let hit = &mut self.primary_hints[hit_id];
        hit.short_tag = promoted_tag;
        hit.parity = promoted_parity;
        hit.program_point = Some(idx);

        self.finished_query_num += 1;
        self.query_histogram[chunk_id] += 1;
        self.local_cache.insert(idx, response.clone());

        Ok(response)
    }

    /// Issues a private fetch with independently random per-chunk offsets and discards the
    /// result. Used to pad traffic so real and decoy queries look identical to the server; no
    /// hint, histogram or budget state is touched.
    pub fn dummy_query(&mut self, server: &Server) -> Result<(), PianoPIRError> {
        let chunk_mask = (self.config.chunk_size() - 1) as u64;
        let offsets: Vec<u32> = (0..self.config.set_size()).map(|_| (self.rng.random::<u64>() & chunk_mask) as u32).collect();

        server.fetch_private(&offsets).map(|_| ())
    }

    /// Client-side storage footprint in bytes: tags, parities, program points, replacement pairs
    /// and backup hints, with parities costed at the configured average entry byte count. Pure
    /// function of the configuration, used for tuning.
    pub fn local_storage_bytes(&self) -> usize {
        let entry_bytes = self.config.avg_entry_byte_len();
        let primary_hint_num = self.config.primary_hint_num();
        let total_backup_hint_num = self.config.set_size() * self.max_query_per_chunk;

        let primary = primary_hint_num * (8 + entry_bytes + 8);
        let backups = total_backup_hint_num * (8 + entry_bytes);
        let replacements = total_backup_hint_num * (8 + entry_bytes);

        primary + backups + replacements
    }

    #[inline(always)]
    pub const fn config(&self) -> &PianoPIRConfig {
        &self.config
    }
    #[inline(always)]
    pub const fn finished_query_num(&self) -> usize {
        self.finished_query_num
    }
    #[inline(always)]
    pub const fn max_query_num(&self) -> usize {
        self.max_query_num
    }
    #[inline(always)]
    pub const fn max_query_per_chunk(&self) -> usize {
        self.max_query_per_chunk
    }

    /// Whether the per-epoch query budget is spent; preprocessing must run again before further
    /// real queries.
    #[inline(always)]
    pub const fn is_exhausted(&self) -> bool {
        self.finished_query_num >= self.max_query_num
    }
}
