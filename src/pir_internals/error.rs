use std::{error::Error, fmt::Display};

#[derive(Debug, PartialEq)]
pub enum PianoPIRError {
    // Configuration
    InvalidConfigurationParameter,
    DatabaseShorterThanConfigured,
    DatabaseExceedsPaddedCapacity,
    EntryExceedsMaxWords(usize),

    // Server
    IndexOutOfRange(usize),
    InvalidOffsetVectorLength,
    ChunkOffsetOutOfRange,

    // Client
    PreprocessingRequired,
    QueryBudgetExhausted,
    ChunkQueryBudgetExhausted(usize),
    NoCoveringHint,
    InvalidResponseShape,
}

impl Display for PianoPIRError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidConfigurationParameter => write!(f, "Database size, maximum entry word count and thread hint must all be non-zero."),
            Self::DatabaseShorterThanConfigured => write!(f, "The raw database has fewer entries than the configured database size."),
            Self::DatabaseExceedsPaddedCapacity => write!(f, "The raw database has more entries than the configured chunk and set sizes can hold."),
            Self::EntryExceedsMaxWords(idx) => write!(f, "Database entry at index '{}' is longer than the configured maximum entry word count.", idx),

            Self::IndexOutOfRange(idx) => write!(f, "Index '{}' lies beyond the padded database bound.", idx),
            Self::InvalidOffsetVectorLength => write!(f, "A private fetch must carry exactly one offset per chunk."),
            Self::ChunkOffsetOutOfRange => write!(f, "A per-chunk offset must be smaller than the chunk size."),

            Self::PreprocessingRequired => write!(f, "Client must run preprocessing before it can serve real queries."),
            Self::QueryBudgetExhausted => write!(f, "Client finished its per-epoch query budget, preprocessing must run again."),
            Self::ChunkQueryBudgetExhausted(chunk_id) => write!(f, "Chunk '{}' received more real queries than its per-epoch allotment.", chunk_id),
            Self::NoCoveringHint => write!(f, "No unconsumed primary hint covers the queried index in this epoch."),
            Self::InvalidResponseShape => write!(f, "Unexpected number of words in private fetch response."),
        }
    }
}

impl Error for PianoPIRError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}
