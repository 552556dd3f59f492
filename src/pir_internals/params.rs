use crate::pir_internals::{branch_opt_util, error::PianoPIRError};

/// Negative log2 of the tolerated probability that a single query finds no covering hint,
/// used by callers which don't pick their own failure bound.
pub const DEFAULT_FAILURE_PROB_LOG2: u32 = 40;

/// Immutable configuration shared by one client/server pair for the lifetime of a preprocessing epoch.
///
/// The chunk and set sizing is fixed at construction time: the padded database always spans
/// `chunk_size * set_size` slots and the raw database must never be longer than that.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PianoPIRConfig {
    db_size: usize,
    max_entry_words: usize,
    avg_entry_byte_len: usize,
    chunk_size: usize,
    set_size: usize,
    thread_num: usize,
    failure_prob_log2: u32,
}

impl PianoPIRConfig {
    /// Builds a configuration for a database of `db_size` records, deriving the chunk and set sizing.
    ///
    /// The chunk size is the smallest power of two ≥ 2·⌈√N⌉ and the set size (number of chunks) is
    /// ⌈N / chunk_size⌉ rounded up to a multiple of 4, so the padded database always covers N.
    ///
    /// # Arguments
    ///
    /// * `db_size` - The number of records in the raw database.
    /// * `max_entry_words` - The size of the largest record, in 64-bit words.
    /// * `avg_entry_byte_len` - The average record byte count; only feeds storage/communication diagnostics.
    /// * `thread_num` - Tuning hint; derived table sizes are rounded up to a multiple of it.
    /// * `failure_prob_log2` - Negative log2 of the tolerated per-query hint-miss probability.
    ///
    /// # Returns
    ///
    /// * `Result<PianoPIRConfig, PianoPIRError>` - The configuration, or an error if `db_size`,
    ///   `max_entry_words` or `thread_num` is zero.
    pub fn new(db_size: usize, max_entry_words: usize, avg_entry_byte_len: usize, thread_num: usize, failure_prob_log2: u32) -> Result<PianoPIRConfig, PianoPIRError> {
        if branch_opt_util::unlikely(db_size == 0 || max_entry_words == 0 || thread_num == 0) {
            return Err(PianoPIRError::InvalidConfigurationParameter);
        }

        let ceil_sqrt = {
            let s = db_size.isqrt();
            if s * s < db_size { s + 1 } else { s }
        };
        let chunk_size = (2 * ceil_sqrt).next_power_of_two();
        let set_size = db_size.div_ceil(chunk_size).next_multiple_of(4);

        Ok(PianoPIRConfig {
            db_size,
            max_entry_words,
            avg_entry_byte_len,
            chunk_size,
            set_size,
            thread_num,
            failure_prob_log2,
        })
    }

    #[inline(always)]
    pub const fn db_size(&self) -> usize {
        self.db_size
    }
    #[inline(always)]
    pub const fn max_entry_words(&self) -> usize {
        self.max_entry_words
    }
    #[inline(always)]
    pub const fn avg_entry_byte_len(&self) -> usize {
        self.avg_entry_byte_len
    }
    #[inline(always)]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }
    #[inline(always)]
    pub const fn set_size(&self) -> usize {
        self.set_size
    }
    #[inline(always)]
    pub const fn thread_num(&self) -> usize {
        self.thread_num
    }
    #[inline(always)]
    pub const fn failure_prob_log2(&self) -> u32 {
        self.failure_prob_log2
    }

    /// Number of slots in the zero-padded database, `chunk_size * set_size` ≥ `db_size`.
    #[inline(always)]
    pub const fn padded_db_size(&self) -> usize {
        self.chunk_size * self.set_size
    }

    /// Per-epoch budget of real queries, ⌊√N · ln N⌋.
    pub fn max_query_num(&self) -> usize {
        let n = self.db_size as f64;
        (n.sqrt() * n.ln()) as usize
    }

    /// Number of primary hints, sized so a needed hint is unavailable with probability
    /// at most 2^-(failure_prob_log2 + 1) over a whole epoch of queries.
    pub fn primary_hint_num(&self) -> usize {
        let k = (std::f64::consts::LN_2 * (self.failure_prob_log2 + 1) as f64).ceil() as usize;
        (k * self.chunk_size).next_multiple_of(self.thread_num)
    }

    /// Upper bound on real queries into any single chunk within one epoch; also the number
    /// of backup hints and replacement slots provisioned per chunk.
    pub fn max_query_per_chunk(&self) -> usize {
        (3 * (self.max_query_num() / self.set_size)).next_multiple_of(self.thread_num)
    }
}
